use axum::{
    routing::{get, patch, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::payroll;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payroll", get(payroll::list_payroll))
        .route("/payroll/calculate", post(payroll::calculate_payroll))
        .route("/payroll/my-commission", get(payroll::my_commission))
        .route("/payroll/{id}/status", patch(payroll::update_status))
        .route_layer(axum::middleware::from_fn(require_auth))
}
