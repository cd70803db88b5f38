use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePayrollRequest {
    pub month_year: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePayrollResponse {
    pub month_year: String,
    pub staff_processed: u32,
    pub staff_failed: u32,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct PayrollRow {
    pub id: i64,
    pub staff_id: i64,
    pub full_name: String,
    pub month_year: String,
    pub base_salary: f64,
    pub commission_earned: f64,
    pub deductions: f64,
    pub net_payable: f64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePayrollStatusRequest {
    pub status: String,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct CommissionInvoice {
    pub id: i64,
    pub invoice_number: String,
    pub total_amount: f64,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionConfig {
    pub commission_type: String,
    pub commission_value: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCommissionResponse {
    pub invoices: Vec<CommissionInvoice>,
    pub commission_config: Option<CommissionConfig>,
}
