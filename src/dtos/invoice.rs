use serde::{Deserialize, Serialize};

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub customer_id: i64,
    pub staff_id: Option<i64>,
    pub appointment_id: Option<i64>,
    pub items: Vec<InvoiceItemRequest>,
    pub tax_amount: Option<f64>,
    pub discount: Option<f64>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
}

/// One line of a sale. Exactly one of `service_id`/`product_id` must be set.
/// The booking UI always supplies `unit_price`; when it is omitted the
/// service's catalog price is used instead.
#[derive(Debug, Deserialize)]
pub struct InvoiceItemRequest {
    #[serde(rename = "serviceId")]
    pub service_id: Option<i64>,
    #[serde(rename = "serviceName")]
    pub service_name: Option<String>,
    #[serde(rename = "productId")]
    pub product_id: Option<i64>,
    #[serde(rename = "productName")]
    pub product_name: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub unit_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCreatedResponse {
    pub id: i64,
    pub invoice_number: String,
    pub total_amount: f64,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct InvoiceListItem {
    pub id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub customer_name: String,
    pub staff_name: Option<String>,
    pub items_summary: Option<String>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: String,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct InvoiceItemResponse {
    pub id: i64,
    pub service_id: Option<i64>,
    pub service_name: Option<String>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Serialize)]
pub struct InvoiceDetailResponse {
    pub id: i64,
    pub invoice_number: String,
    pub appointment_id: Option<i64>,
    pub customer_id: i64,
    pub customer_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub staff_id: Option<i64>,
    pub staff_name: Option<String>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: String,
    pub items: Vec<InvoiceItemResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
}
