use serde::Serialize;

#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub visit_count: i64,
    pub total_spending: f64,
}

impl From<crate::models::customer::Customer> for CustomerResponse {
    fn from(c: crate::models::customer::Customer) -> Self {
        Self {
            id: c.id,
            full_name: c.full_name,
            phone: c.phone,
            email: c.email,
            address: c.address,
            visit_count: c.visit_count,
            total_spending: c.total_spending,
        }
    }
}
