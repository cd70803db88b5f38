use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::dtos::inventory::{
    ProductResponse, StockAdjustRequest, StockAdjustResponse, StockMovementResponse,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::state::AppState;

const PRODUCT_COLUMNS: &str = "id, name, sku, unit, current_stock, reorder_level, supplier_name, supplier_contact";

// GET /inventory
pub async fn list_products(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
    ))
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

// GET /inventory/low-stock
pub async fn list_low_stock(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE current_stock <= reorder_level AND reorder_level > 0"
    ))
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

// GET /inventory/{id}
pub async fn get_product(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok(Json(ProductResponse::from(product)))
}

// GET /inventory/{id}/movements
pub async fn list_movements(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StockMovementResponse>>, AppError> {
    let rows = sqlx::query_as::<_, StockMovementResponse>(
        "SELECT id, product_id, type, quantity, notes, created_at \
         FROM stock_movements WHERE product_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(id)
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(rows))
}

// POST /inventory/{id}/stock
pub async fn adjust_stock_handler(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<StockAdjustRequest>,
) -> Result<(StatusCode, Json<StockAdjustResponse>), AppError> {
    if auth.role != "admin" {
        return Err(AppError::forbidden("Only admins can adjust stock"));
    }
    let response = adjust_stock(&db_pool, id, &req).await?;
    info!(product_id = id, movement = %req.movement_type, quantity = req.quantity, "Stock adjusted");
    Ok((StatusCode::OK, Json(response)))
}

/// Applies one stock movement and appends a ledger row in the same
/// transaction. Deductions use a conditional UPDATE so that two concurrent
/// sales cannot race the stock level below zero.
pub(crate) async fn adjust_stock(
    db_pool: &SqlitePool,
    product_id: i64,
    req: &StockAdjustRequest,
) -> Result<StockAdjustResponse, AppError> {
    if !["purchase", "usage", "adjustment"].contains(&req.movement_type.as_str()) {
        return Err(AppError::validation("type and quantity required"));
    }
    if req.quantity <= 0 {
        return Err(AppError::validation("Quantity must be greater than 0"));
    }

    let mut tx = db_pool.begin().await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found("Product not found"));
    }

    let updated = if req.movement_type == "usage" {
        sqlx::query(
            "UPDATE products SET current_stock = current_stock - ? \
             WHERE id = ? AND current_stock >= ?",
        )
        .bind(req.quantity)
        .bind(product_id)
        .bind(req.quantity)
        .execute(&mut *tx)
        .await?
    } else {
        // purchase and adjustment both add
        sqlx::query("UPDATE products SET current_stock = current_stock + ? WHERE id = ?")
            .bind(req.quantity)
            .bind(product_id)
            .execute(&mut *tx)
            .await?
    };

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Stock cannot go negative"));
    }

    sqlx::query(
        "INSERT INTO stock_movements (product_id, type, quantity, notes, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(product_id)
    .bind(&req.movement_type)
    .bind(req.quantity)
    .bind(&req.notes)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    let current_stock: i64 = sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StockAdjustResponse {
        id: product_id,
        current_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    async fn seed_product(pool: &SqlitePool, name: &str, stock: i64) -> i64 {
        sqlx::query("INSERT INTO products (name, current_stock) VALUES (?, ?)")
            .bind(name)
            .bind(stock)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    fn adjust(movement_type: &str, quantity: i64) -> StockAdjustRequest {
        StockAdjustRequest {
            movement_type: movement_type.to_string(),
            quantity,
            notes: None,
        }
    }

    async fn movement_count(pool: &SqlitePool, product_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn purchase_adds_stock_and_appends_one_movement() {
        let pool = test_pool().await;
        let product = seed_product(&pool, "Shampoo", 10).await;

        let res = adjust_stock(&pool, product, &adjust("purchase", 5)).await.unwrap();
        assert_eq!(res.current_stock, 15);
        assert_eq!(movement_count(&pool, product).await, 1);

        let (kind, qty): (String, i64) = sqlx::query_as(
            "SELECT type, quantity FROM stock_movements WHERE product_id = ?",
        )
        .bind(product)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(kind, "purchase");
        assert_eq!(qty, 5);
    }

    #[tokio::test]
    async fn usage_subtracts_stock() {
        let pool = test_pool().await;
        let product = seed_product(&pool, "Conditioner", 10).await;

        let res = adjust_stock(&pool, product, &adjust("usage", 4)).await.unwrap();
        assert_eq!(res.current_stock, 6);
    }

    #[tokio::test]
    async fn oversized_usage_is_rejected_and_stock_untouched() {
        let pool = test_pool().await;
        let product = seed_product(&pool, "Hair oil", 10).await;

        let err = adjust_stock(&pool, product, &adjust("usage", 15)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stock: i64 = sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?")
            .bind(product)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 10);
        assert_eq!(movement_count(&pool, product).await, 0);
    }

    #[tokio::test]
    async fn invalid_type_and_unknown_product_are_rejected() {
        let pool = test_pool().await;
        let product = seed_product(&pool, "Serum", 3).await;

        let err = adjust_stock(&pool, product, &adjust("refund", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = adjust_stock(&pool, product, &adjust("usage", 0)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = adjust_stock(&pool, 9999, &adjust("purchase", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
