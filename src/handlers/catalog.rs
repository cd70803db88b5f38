use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::dtos::catalog::CatalogItemResponse;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

// GET /catalog/{kind}/{id}
//
// Point-of-sale lookup: current name, price and commission configuration for
// a service or product. The price is advisory; an explicit unit price on the
// invoice request always wins.
pub async fn resolve(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Json<CatalogItemResponse>, AppError> {
    match kind.as_str() {
        "service" => {
            let row: Option<(String, f64, f64, f64)> = sqlx::query_as(
                "SELECT name, price, commission_percentage, commission_fixed \
                 FROM services WHERE id = ? AND is_active = 1",
            )
            .bind(id)
            .fetch_optional(&db_pool)
            .await?;
            let (name, price, commission_percentage, commission_fixed) =
                row.ok_or_else(|| AppError::not_found("Service not found"))?;
            Ok(Json(CatalogItemResponse {
                kind,
                id,
                name,
                unit_price: Some(price),
                commission_percentage: Some(commission_percentage),
                commission_fixed: Some(commission_fixed),
            }))
        }
        "product" => {
            let name: Option<String> = sqlx::query_scalar("SELECT name FROM products WHERE id = ?")
                .bind(id)
                .fetch_optional(&db_pool)
                .await?;
            let name = name.ok_or_else(|| AppError::not_found("Product not found"))?;
            Ok(Json(CatalogItemResponse {
                kind,
                id,
                name,
                unit_price: None,
                commission_percentage: None,
                commission_fixed: None,
            }))
        }
        _ => Err(AppError::validation("kind must be 'service' or 'product'")),
    }
}
