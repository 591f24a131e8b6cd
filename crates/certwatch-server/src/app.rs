use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub fn build_http_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::health_routes()
        .merge(api::hosts::host_routes())
        .merge(api::certificates::certificate_routes())
        .merge(api::schedule::schedule_routes())
        .merge(api::stats::stats_routes())
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
