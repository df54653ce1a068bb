// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static page proxying: each of the five page routes fetches its body
//! from an operator-configured URL and forwards it verbatim.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::warn;

use super::SharedState;

async fn proxy_page(state: SharedState, url: &str) -> Response {
    match state.http_client.get(url).send().await {
        Ok(resp) => {
            let status = resp.status();
            match resp.text().await {
                Ok(body) => (status, body).into_response(),
                Err(e) => {
                    warn!("reading page body from {url}: {e}");
                    (StatusCode::BAD_GATEWAY, "upstream page unreadable").into_response()
                }
            }
        }
        Err(e) => {
            warn!("fetching page from {url}: {e}");
            (StatusCode::BAD_GATEWAY, "upstream page unreachable").into_response()
        }
    }
}

pub async fn main_page(state: SharedState) -> Response {
    let url = state.config.main_page_url.clone();
    proxy_page(state, &url).await
}

pub async fn sub_page(state: SharedState) -> Response {
    let url = state.config.sub_page_url.clone();
    proxy_page(state, &url).await
}

pub async fn link_page(state: SharedState) -> Response {
    let url = state.config.link_page_url.clone();
    proxy_page(state, &url).await
}

pub async fn converter_page(state: SharedState) -> Response {
    let url = state.config.converter_page_url.clone();
    proxy_page(state, &url).await
}

pub async fn checker_page(state: SharedState) -> Response {
    let url = state.config.checker_page_url.clone();
    proxy_page(state, &url).await
}
