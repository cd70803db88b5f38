use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub unit: String,
    pub current_stock: i64,
    pub reorder_level: i64,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
}
