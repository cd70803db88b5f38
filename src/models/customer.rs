use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct Customer {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub visit_count: i64,
    pub total_spending: f64,
}
