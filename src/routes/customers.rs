use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::customer;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(customer::list_customers))
        .route("/customers/{id}", get(customer::get_customer))
        .route_layer(axum::middleware::from_fn(require_auth))
}
