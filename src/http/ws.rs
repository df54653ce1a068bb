// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunnel entry route: resolves the path segment into an optional upstream
//! override, then upgrades to a WebSocket. A segment naming an unknown or
//! empty region answers 502 before the upgrade happens, since that is the
//! only point at which a plain HTTP status can still be returned
//! (`SPEC_FULL.md` §4.4, §7).
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use log::debug;

use super::SharedState;
use crate::tunnel::{self, RouteContext};
use crate::upstream::{self, PathSelector};

const EARLY_DATA_HEADER: &str = "sec-websocket-protocol";

pub async fn tunnel_entry(
    Path(segment): Path<String>,
    state: SharedState,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(selector) = upstream::parse_path(&segment) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let resolved_endpoint = match &selector {
        PathSelector::Direct(endpoint) => Some(endpoint.clone()),
        PathSelector::Region(_) => {
            let mut rng = rand::thread_rng();
            match upstream::resolve(&selector, &state.config.proxy_list, &mut rng) {
                Ok(endpoint) => Some(endpoint),
                Err(e) => return (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
            }
        }
    };

    debug!("tunnel entry for segment {segment:?}, resolved endpoint: {resolved_endpoint:?}");

    let early_data = headers
        .get(EARLY_DATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    ws.on_upgrade(move |socket| async move {
        let route = RouteContext {
            resolved_endpoint,
            proxy_list: &state.config.proxy_list,
        };
        tunnel::run(socket, route, early_data).await;
    })
    .into_response()
}
