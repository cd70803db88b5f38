use axum::{
    routing::{get, patch},
    Router,
};
use crate::state::AppState;
use crate::handlers::invoice;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(invoice::list_invoices).post(invoice::create_invoice))
        .route("/invoices/{id}", get(invoice::get_invoice))
        .route("/invoices/{id}/payment", patch(invoice::update_payment))
        .route_layer(axum::middleware::from_fn(require_auth))
}
