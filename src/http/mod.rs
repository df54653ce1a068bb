// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP surface: the five static pages proxied from the configured page
//! URLs, the single-segment tunnel entry route, and a 404 fallback for
//! everything else.
mod pages;
mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

pub struct AppState {
    pub config: AppConfig,
    pub http_client: reqwest::Client,
}

pub fn build_router(config: AppConfig) -> Router {
    let state = Arc::new(AppState {
        http_client: reqwest::Client::new(),
        config,
    });

    Router::new()
        .route("/", get(pages::main_page))
        .route("/sub", get(pages::sub_page))
        .route("/link", get(pages::link_page))
        .route("/converter", get(pages::converter_page))
        .route("/checker", get(pages::checker_page))
        .route("/:segment", get(ws::tunnel_entry))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

pub(crate) type SharedState = State<Arc<AppState>>;
