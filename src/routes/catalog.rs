use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::catalog;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/catalog/{kind}/{id}", get(catalog::resolve))
        .route_layer(axum::middleware::from_fn(require_auth))
}
