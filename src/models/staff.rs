use sqlx::FromRow;

/// Compensation profile read by the payroll aggregator. Never written by it.
#[derive(Debug, FromRow)]
pub struct StaffProfile {
    pub id: i64,
    pub monthly_salary: f64,
    pub commission_type: String,
    pub commission_value: f64,
}
