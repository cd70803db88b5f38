use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StockAdjustRequest {
    #[serde(rename = "type")]
    pub movement_type: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockAdjustResponse {
    pub id: i64,
    pub current_stock: i64,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub unit: String,
    pub current_stock: i64,
    pub reorder_level: i64,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
}

impl From<crate::models::product::Product> for ProductResponse {
    fn from(p: crate::models::product::Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            sku: p.sku,
            unit: p.unit,
            current_stock: p.current_stock,
            reorder_level: p.reorder_level,
            supplier_name: p.supplier_name,
            supplier_contact: p.supplier_contact,
        }
    }
}

#[derive(Serialize, sqlx::FromRow)]
pub struct StockMovementResponse {
    pub id: i64,
    pub product_id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub movement_type: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub created_at: String,
}
