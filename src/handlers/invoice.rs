use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;

use crate::dtos::invoice::{
    CreateInvoiceRequest, InvoiceCreatedResponse, InvoiceDetailResponse, InvoiceItemResponse,
    InvoiceListItem, UpdatePaymentRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const PAYMENT_METHODS: [&str; 4] = ["cash", "card", "bank_transfer", "mobile_payment"];

fn format_invoice_number(id: i64) -> String {
    format!("INV-{:04}", id)
}

// POST /invoices
pub async fn create_invoice(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceCreatedResponse>), AppError> {
    let created = build_invoice(&db_pool, &req).await?;
    info!(id = created.id, invoice_number = %created.invoice_number, "Invoice created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Creates the invoice header, its line items and the in-transaction side
/// effects (customer stats, appointment completion). Stock deduction is a
/// separate call, see the inventory handler.
pub(crate) async fn build_invoice(
    db_pool: &SqlitePool,
    req: &CreateInvoiceRequest,
) -> Result<InvoiceCreatedResponse, AppError> {
    if req.items.is_empty() {
        return Err(AppError::validation("customerId and items required"));
    }

    let payment_method = req.payment_method.as_deref().unwrap_or("cash");
    if !PAYMENT_METHODS.contains(&payment_method) {
        return Err(AppError::validation("Invalid payment method"));
    }
    let payment_status = req.payment_status.as_deref().unwrap_or("paid");
    if payment_status != "paid" && payment_status != "pending" {
        return Err(AppError::validation("Invalid payment status"));
    }

    let mut tx = db_pool.begin().await?;

    let customer: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?")
        .bind(req.customer_id)
        .fetch_optional(&mut *tx)
        .await?;
    if customer.is_none() {
        return Err(AppError::not_found("Customer not found"));
    }

    // An invoice completes its appointment, so a terminal appointment cannot
    // be invoiced again.
    if let Some(appointment_id) = req.appointment_id {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = ?")
                .bind(appointment_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Err(AppError::not_found("Appointment not found")),
            Some("completed") | Some("cancelled") | Some("no_show") => {
                return Err(AppError::conflict("Appointment has already been completed or cancelled"));
            }
            Some(_) => {}
        }
    }

    // Resolve each line: snapshot name and price as of now so later catalog
    // edits never touch historical invoices.
    let mut lines: Vec<ResolvedLine> = Vec::with_capacity(req.items.len());
    for item in &req.items {
        if item.quantity < 1 {
            return Err(AppError::validation("Quantity must be at least 1"));
        }
        if let Some(price) = item.unit_price {
            if price < 0.0 {
                return Err(AppError::validation("Unit price cannot be negative"));
            }
        }

        let line = match (item.service_id, item.product_id) {
            (Some(service_id), None) => {
                let catalog: Option<(String, f64)> =
                    sqlx::query_as("SELECT name, price FROM services WHERE id = ?")
                        .bind(service_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                let unit_price = match (item.unit_price, &catalog) {
                    (Some(p), _) => p,
                    (None, Some((_, price))) => *price,
                    (None, None) => {
                        return Err(AppError::not_found(format!(
                            "Service {} not found",
                            service_id
                        )))
                    }
                };
                let name = item
                    .service_name
                    .clone()
                    .or_else(|| catalog.map(|(n, _)| n));
                ResolvedLine {
                    service_id: Some(service_id),
                    service_name: name,
                    product_id: None,
                    product_name: None,
                    quantity: item.quantity,
                    unit_price,
                }
            }
            (None, Some(product_id)) => {
                // Products have no catalog price; the seller must supply one.
                let unit_price = item
                    .unit_price
                    .ok_or_else(|| AppError::validation("unit_price required for product items"))?;
                let name = match &item.product_name {
                    Some(n) => Some(n.clone()),
                    None => {
                        sqlx::query_scalar("SELECT name FROM products WHERE id = ?")
                            .bind(product_id)
                            .fetch_optional(&mut *tx)
                            .await?
                    }
                };
                ResolvedLine {
                    service_id: None,
                    service_name: None,
                    product_id: Some(product_id),
                    product_name: name,
                    quantity: item.quantity,
                    unit_price,
                }
            }
            _ => {
                return Err(AppError::validation(
                    "Each item must reference exactly one of serviceId or productId",
                ))
            }
        };
        lines.push(line);
    }

    let subtotal: f64 = lines.iter().map(|l| l.unit_price * l.quantity as f64).sum();
    let tax_amount = req.tax_amount.unwrap_or(0.0);
    let discount = req.discount.unwrap_or(0.0);
    // No floor: an over-sized discount yields a negative total, accepted as-is.
    let total = subtotal + tax_amount - discount;

    let created_at = Utc::now().to_rfc3339();

    // Two-phase write: the display number derives from the row's own id, so
    // insert with a placeholder and patch once the id is known.
    let placeholder = format!("INV-TMP-{}", Utc::now().timestamp_millis());
    let result = sqlx::query(
        "INSERT INTO invoices (invoice_number, appointment_id, customer_id, staff_id, subtotal, \
         tax_amount, discount, total_amount, payment_method, payment_status, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&placeholder)
    .bind(req.appointment_id)
    .bind(req.customer_id)
    .bind(req.staff_id)
    .bind(subtotal)
    .bind(tax_amount)
    .bind(discount)
    .bind(total)
    .bind(payment_method)
    .bind(payment_status)
    .bind(&created_at)
    .execute(&mut *tx)
    .await?;

    let invoice_id = result.last_insert_rowid();
    let invoice_number = format_invoice_number(invoice_id);
    sqlx::query("UPDATE invoices SET invoice_number = ? WHERE id = ?")
        .bind(&invoice_number)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

    for line in &lines {
        let line_total = line.unit_price * line.quantity as f64;
        sqlx::query(
            "INSERT INTO invoice_items (invoice_id, service_id, service_name, product_id, \
             product_name, quantity, unit_price, total) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(line.service_id)
        .bind(&line.service_name)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line_total)
        .execute(&mut *tx)
        .await?;
    }

    // Every recorded transaction counts as a visit, whether or not cash was
    // collected.
    sqlx::query(
        "UPDATE customers SET visit_count = visit_count + 1, total_spending = total_spending + ? \
         WHERE id = ?",
    )
    .bind(total)
    .bind(req.customer_id)
    .execute(&mut *tx)
    .await?;

    if let Some(appointment_id) = req.appointment_id {
        sqlx::query("UPDATE appointments SET status = 'completed' WHERE id = ?")
            .bind(appointment_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(InvoiceCreatedResponse {
        id: invoice_id,
        invoice_number,
        total_amount: total,
    })
}

struct ResolvedLine {
    service_id: Option<i64>,
    service_name: Option<String>,
    product_id: Option<i64>,
    product_name: Option<String>,
    quantity: i64,
    unit_price: f64,
}

// GET /invoices
pub async fn list_invoices(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<InvoiceListItem>>, AppError> {
    let mut sql = String::from(
        "SELECT i.id, i.invoice_number, i.customer_id, c.full_name AS customer_name, \
         u.full_name AS staff_name, \
         (SELECT group_concat(COALESCE(ii.service_name, ii.product_name), ', ') \
          FROM invoice_items ii WHERE ii.invoice_id = i.id) AS items_summary, \
         i.subtotal, i.tax_amount, i.discount, i.total_amount, \
         i.payment_method, i.payment_status, i.created_at \
         FROM invoices i \
         JOIN customers c ON c.id = i.customer_id \
         LEFT JOIN staff st ON st.id = i.staff_id \
         LEFT JOIN users u ON u.id = st.user_id \
         WHERE 1=1",
    );

    // created_at is RFC 3339, so its YYYY-MM-DD prefix compares as a date
    let mut binds: Vec<String> = Vec::new();
    if let Some(from) = params.get("from") {
        sql.push_str(" AND substr(i.created_at, 1, 10) >= ?");
        binds.push(from.clone());
    }
    if let Some(to) = params.get("to") {
        sql.push_str(" AND substr(i.created_at, 1, 10) <= ?");
        binds.push(to.clone());
    }
    if let Some(customer_id) = params.get("customerId") {
        sql.push_str(" AND i.customer_id = ?");
        binds.push(customer_id.clone());
    }
    if let Some(payment_status) = params.get("paymentStatus") {
        sql.push_str(" AND i.payment_status = ?");
        binds.push(payment_status.clone());
    }
    sql.push_str(" ORDER BY i.created_at DESC LIMIT 200");

    let mut query = sqlx::query_as::<_, InvoiceListItem>(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }

    let rows = query.fetch_all(&db_pool).await?;
    Ok(Json(rows))
}

// GET /invoices/{id}
pub async fn get_invoice(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceDetailResponse>, AppError> {
    fetch_invoice_by_id(&db_pool, id).await.map(Json)
}

async fn fetch_invoice_by_id(
    db_pool: &SqlitePool,
    id: i64,
) -> Result<InvoiceDetailResponse, AppError> {
    #[derive(sqlx::FromRow)]
    struct Header {
        id: i64,
        invoice_number: String,
        appointment_id: Option<i64>,
        customer_id: i64,
        customer_name: String,
        phone: Option<String>,
        email: Option<String>,
        address: Option<String>,
        staff_id: Option<i64>,
        staff_name: Option<String>,
        subtotal: f64,
        tax_amount: f64,
        discount: f64,
        total_amount: f64,
        payment_method: String,
        payment_status: String,
        created_at: String,
    }

    let header = sqlx::query_as::<_, Header>(
        "SELECT i.id, i.invoice_number, i.appointment_id, i.customer_id, \
         c.full_name AS customer_name, c.phone, c.email, c.address, \
         i.staff_id, u.full_name AS staff_name, \
         i.subtotal, i.tax_amount, i.discount, i.total_amount, \
         i.payment_method, i.payment_status, i.created_at \
         FROM invoices i \
         JOIN customers c ON c.id = i.customer_id \
         LEFT JOIN staff st ON st.id = i.staff_id \
         LEFT JOIN users u ON u.id = st.user_id \
         WHERE i.id = ?",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Invoice not found"))?;

    let items = sqlx::query_as::<_, InvoiceItemResponse>(
        "SELECT id, service_id, service_name, product_id, product_name, quantity, unit_price, total \
         FROM invoice_items WHERE invoice_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(db_pool)
    .await?;

    Ok(InvoiceDetailResponse {
        id: header.id,
        invoice_number: header.invoice_number,
        appointment_id: header.appointment_id,
        customer_id: header.customer_id,
        customer_name: header.customer_name,
        phone: header.phone,
        email: header.email,
        address: header.address,
        staff_id: header.staff_id,
        staff_name: header.staff_name,
        subtotal: header.subtotal,
        tax_amount: header.tax_amount,
        discount: header.discount,
        total_amount: header.total_amount,
        payment_method: header.payment_method,
        payment_status: header.payment_status,
        created_at: header.created_at,
        items,
    })
}

// PATCH /invoices/{id}/payment
pub async fn update_payment(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePaymentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.payment_status.is_none() && req.payment_method.is_none() {
        return Err(AppError::validation("Nothing to update"));
    }
    if let Some(status) = req.payment_status.as_deref() {
        if status != "paid" && status != "pending" {
            return Err(AppError::validation("Invalid payment status"));
        }
    }
    if let Some(method) = req.payment_method.as_deref() {
        if !PAYMENT_METHODS.contains(&method) {
            return Err(AppError::validation("Invalid payment method"));
        }
    }

    let result = sqlx::query(
        "UPDATE invoices SET payment_status = COALESCE(?, payment_status), \
         payment_method = COALESCE(?, payment_method) WHERE id = ?",
    )
    .bind(req.payment_status)
    .bind(req.payment_method)
    .bind(id)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Invoice not found"));
    }
    Ok(Json(serde_json::json!({ "id": id, "updated": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::dtos::invoice::InvoiceItemRequest;

    async fn seed_customer(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO customers (full_name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn seed_service(pool: &SqlitePool, name: &str, price: f64) -> i64 {
        sqlx::query("INSERT INTO services (name, price) VALUES (?, ?)")
            .bind(name)
            .bind(price)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn seed_appointment(pool: &SqlitePool, customer_id: i64, status: &str) -> i64 {
        sqlx::query(
            "INSERT INTO appointments (customer_id, appointment_date, status) VALUES (?, '2025-03-10', ?)",
        )
        .bind(customer_id)
        .bind(status)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    fn service_item(service_id: i64, quantity: i64, unit_price: Option<f64>) -> InvoiceItemRequest {
        InvoiceItemRequest {
            service_id: Some(service_id),
            service_name: None,
            product_id: None,
            product_name: None,
            quantity,
            unit_price,
        }
    }

    fn request(customer_id: i64, items: Vec<InvoiceItemRequest>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            customer_id,
            staff_id: None,
            appointment_id: None,
            items,
            tax_amount: None,
            discount: None,
            payment_method: None,
            payment_status: None,
        }
    }

    #[tokio::test]
    async fn invoice_numbers_are_sequential_and_padded() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Ayesha").await;
        let service = seed_service(&pool, "Haircut", 1500.0).await;

        let first = build_invoice(&pool, &request(customer, vec![service_item(service, 1, Some(1500.0))]))
            .await
            .unwrap();
        let second = build_invoice(&pool, &request(customer, vec![service_item(service, 1, Some(1500.0))]))
            .await
            .unwrap();

        assert_eq!(first.invoice_number, format!("INV-{:04}", first.id));
        assert_eq!(second.invoice_number, format!("INV-{:04}", second.id));
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn totals_follow_subtotal_plus_tax_minus_discount() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Sana").await;
        let service = seed_service(&pool, "Facial", 3000.0).await;

        let mut req = request(
            customer,
            vec![
                service_item(service, 2, Some(3000.0)),
                service_item(service, 1, Some(500.0)),
            ],
        );
        req.tax_amount = Some(200.0);
        req.discount = Some(700.0);

        let created = build_invoice(&pool, &req).await.unwrap();
        assert_eq!(created.total_amount, 6500.0 + 200.0 - 700.0);

        let (subtotal, total): (f64, f64) =
            sqlx::query_as("SELECT subtotal, total_amount FROM invoices WHERE id = ?")
                .bind(created.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(subtotal, 6500.0);
        assert_eq!(total, 6000.0);

        let item_sum: f64 = sqlx::query_scalar(
            "SELECT SUM(unit_price * quantity) FROM invoice_items WHERE invoice_id = ?",
        )
        .bind(created.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(item_sum, subtotal);
    }

    #[tokio::test]
    async fn over_discount_yields_negative_total() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Hira").await;
        let service = seed_service(&pool, "Trim", 500.0).await;

        let mut req = request(customer, vec![service_item(service, 1, Some(500.0))]);
        req.discount = Some(800.0);

        let created = build_invoice(&pool, &req).await.unwrap();
        assert_eq!(created.total_amount, -300.0);
    }

    #[tokio::test]
    async fn customer_stats_bump_regardless_of_payment_status() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Zara").await;
        let service = seed_service(&pool, "Manicure", 1200.0).await;

        let mut req = request(customer, vec![service_item(service, 1, Some(1200.0))]);
        req.payment_status = Some("pending".to_string());
        build_invoice(&pool, &req).await.unwrap();

        let (visits, spending): (i64, f64) =
            sqlx::query_as("SELECT visit_count, total_spending FROM customers WHERE id = ?")
                .bind(customer)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(visits, 1);
        assert_eq!(spending, 1200.0);
    }

    #[tokio::test]
    async fn service_price_resolved_from_catalog_when_omitted() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Mehak").await;
        let service = seed_service(&pool, "Hair color", 4500.0).await;

        let created = build_invoice(&pool, &request(customer, vec![service_item(service, 1, None)]))
            .await
            .unwrap();
        assert_eq!(created.total_amount, 4500.0);

        // Snapshot: raising the catalog price later must not change the invoice
        sqlx::query("UPDATE services SET price = 9999.0 WHERE id = ?")
            .bind(service)
            .execute(&pool)
            .await
            .unwrap();
        let stored: f64 = sqlx::query_scalar("SELECT total_amount FROM invoices WHERE id = ?")
            .bind(created.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 4500.0);
    }

    #[tokio::test]
    async fn product_item_without_price_is_rejected() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Nida").await;

        let item = InvoiceItemRequest {
            service_id: None,
            service_name: None,
            product_id: Some(1),
            product_name: Some("Argan oil".to_string()),
            quantity: 1,
            unit_price: None,
        };
        let err = build_invoice(&pool, &request(customer, vec![item])).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn empty_items_and_unknown_customer_are_rejected() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Rabia").await;
        let service = seed_service(&pool, "Waxing", 900.0).await;

        let err = build_invoice(&pool, &request(customer, vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = build_invoice(&pool, &request(9999, vec![service_item(service, 1, Some(900.0))]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Nothing partial was written
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn invoicing_completes_a_booked_appointment() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Iqra").await;
        let service = seed_service(&pool, "Spa", 5000.0).await;
        let appointment = seed_appointment(&pool, customer, "booked").await;

        let mut req = request(customer, vec![service_item(service, 1, Some(5000.0))]);
        req.appointment_id = Some(appointment);
        build_invoice(&pool, &req).await.unwrap();

        let status: String = sqlx::query_scalar("SELECT status FROM appointments WHERE id = ?")
            .bind(appointment)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "completed");
    }

    #[tokio::test]
    async fn invoicing_a_terminal_appointment_is_rejected() {
        let pool = test_pool().await;
        let customer = seed_customer(&pool, "Laiba").await;
        let service = seed_service(&pool, "Spa", 5000.0).await;

        for status in ["completed", "cancelled", "no_show"] {
            let appointment = seed_appointment(&pool, customer, status).await;
            let mut req = request(customer, vec![service_item(service, 1, Some(5000.0))]);
            req.appointment_id = Some(appointment);
            let err = build_invoice(&pool, &req).await.unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }

        // The rejected attempts must not have bumped the customer
        let visits: i64 = sqlx::query_scalar("SELECT visit_count FROM customers WHERE id = ?")
            .bind(customer)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(visits, 0);
    }
}
