use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::dtos::customer::CustomerResponse;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::customer::Customer;
use crate::state::AppState;

const CUSTOMER_COLUMNS: &str =
    "id, full_name, phone, email, address, visit_count, total_spending";

// GET /customers
pub async fn list_customers(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let customers = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY full_name"
    ))
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(customers.into_iter().map(CustomerResponse::from).collect()))
}

// GET /customers/{id}
pub async fn get_customer(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Customer not found"))?;
    Ok(Json(CustomerResponse::from(customer)))
}
