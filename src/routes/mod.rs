pub mod auth;
pub mod catalog;
pub mod customers;
pub mod inventory;
pub mod invoices;
pub mod payroll;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(catalog::routes())
        .merge(customers::routes())
        .merge(inventory::routes())
        .merge(invoices::routes())
        .merge(payroll::routes())
}
