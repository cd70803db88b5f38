use serde::Serialize;

/// Point-of-sale view of a catalog entry. Products carry no catalog price
/// (the seller supplies one at the register), so `unit_price` is null for
/// them.
#[derive(Serialize)]
pub struct CatalogItemResponse {
    pub kind: String,
    pub id: i64,
    pub name: String,
    pub unit_price: Option<f64>,
    pub commission_percentage: Option<f64>,
    pub commission_fixed: Option<f64>,
}
