use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::inventory;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(inventory::list_products))
        .route("/inventory/low-stock", get(inventory::list_low_stock))
        .route("/inventory/{id}", get(inventory::get_product))
        .route("/inventory/{id}/movements", get(inventory::list_movements))
        .route("/inventory/{id}/stock", post(inventory::adjust_stock_handler))
        .route_layer(axum::middleware::from_fn(require_auth))
}
