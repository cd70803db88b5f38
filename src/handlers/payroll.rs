use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{error, info};

use crate::dtos::payroll::{
    CalculatePayrollRequest, CalculatePayrollResponse, CommissionConfig, CommissionInvoice,
    MyCommissionResponse, PayrollRow, UpdatePayrollStatusRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::staff::StaffProfile;
use crate::state::AppState;

/// Revenue attribution filter shared by every payroll query: paid invoices
/// for the staff member whose linked appointment (if any) was not cancelled.
const QUALIFYING: &str = "i.staff_id = ? AND i.payment_status = 'paid' \
    AND (i.appointment_id IS NULL OR a.status != 'cancelled')";

fn valid_month_year(month_year: &str) -> bool {
    let bytes = month_year.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    if !month_year[..4].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    matches!(month_year[5..].parse::<u8>(), Ok(m) if (1..=12).contains(&m))
}

// POST /payroll/calculate
pub async fn calculate_payroll(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CalculatePayrollRequest>,
) -> Result<Json<CalculatePayrollResponse>, AppError> {
    if auth.role != "admin" {
        return Err(AppError::forbidden("Only admins can calculate payroll"));
    }
    if !valid_month_year(&req.month_year) {
        return Err(AppError::validation("monthYear required (YYYY-MM)"));
    }

    let (staff_processed, staff_failed) =
        calculate_payroll_for_month(&db_pool, &req.month_year).await?;
    info!(month_year = %req.month_year, staff_processed, staff_failed, "Payroll calculated");

    Ok(Json(CalculatePayrollResponse {
        month_year: req.month_year,
        staff_processed,
        staff_failed,
    }))
}

/// Upserts one payroll row per staff member for the month. Each staff member
/// is its own unit of work: a failure is logged and counted, the rest of the
/// roster is still processed. Recomputing overwrites the three computed
/// columns and nothing else, so an already-processed month keeps its status
/// and any deductions.
pub(crate) async fn calculate_payroll_for_month(
    db_pool: &SqlitePool,
    month_year: &str,
) -> Result<(u32, u32), AppError> {
    let staff_list = sqlx::query_as::<_, StaffProfile>(
        "SELECT id, monthly_salary, commission_type, commission_value FROM staff",
    )
    .fetch_all(db_pool)
    .await?;

    let mut processed = 0u32;
    let mut failed = 0u32;
    for staff in &staff_list {
        match upsert_staff_payroll(db_pool, staff, month_year).await {
            Ok(()) => processed += 1,
            Err(e) => {
                error!(staff_id = staff.id, month_year, error = ?e, "Payroll computation failed");
                failed += 1;
            }
        }
    }
    Ok((processed, failed))
}

async fn upsert_staff_payroll(
    db_pool: &SqlitePool,
    staff: &StaffProfile,
    month_year: &str,
) -> Result<(), AppError> {
    let revenue: f64 = sqlx::query_scalar(&format!(
        "SELECT COALESCE(SUM(i.total_amount), 0.0) FROM invoices i \
         LEFT JOIN appointments a ON a.id = i.appointment_id \
         WHERE {QUALIFYING} AND substr(i.created_at, 1, 7) = ?"
    ))
    .bind(staff.id)
    .bind(month_year)
    .fetch_one(db_pool)
    .await?;

    // Percentage commission keys off revenue; fixed commission keys off the
    // number of qualifying line items, not money.
    let commission = match staff.commission_type.as_str() {
        "percentage" => revenue * staff.commission_value / 100.0,
        "fixed" => {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM invoice_items ii \
                 JOIN invoices i ON i.id = ii.invoice_id \
                 LEFT JOIN appointments a ON a.id = i.appointment_id \
                 WHERE {QUALIFYING} AND substr(i.created_at, 1, 7) = ?"
            ))
            .bind(staff.id)
            .bind(month_year)
            .fetch_one(db_pool)
            .await?;
            count as f64 * staff.commission_value
        }
        other => {
            return Err(AppError::internal(format!(
                "Unknown commission type '{other}' for staff {}",
                staff.id
            )))
        }
    };

    let net = staff.monthly_salary + commission;

    sqlx::query(
        "INSERT INTO payroll (staff_id, month_year, base_salary, commission_earned, deductions, net_payable, status) \
         VALUES (?, ?, ?, ?, 0, ?, 'draft') \
         ON CONFLICT (staff_id, month_year) DO UPDATE SET \
             base_salary = excluded.base_salary, \
             commission_earned = excluded.commission_earned, \
             net_payable = excluded.net_payable",
    )
    .bind(staff.id)
    .bind(month_year)
    .bind(staff.monthly_salary)
    .bind(commission)
    .bind(net)
    .execute(db_pool)
    .await?;

    Ok(())
}

// GET /payroll
pub async fn list_payroll(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PayrollRow>>, AppError> {
    let mut sql = String::from(
        "SELECT p.id, p.staff_id, u.full_name, p.month_year, p.base_salary, \
         p.commission_earned, p.deductions, p.net_payable, p.status \
         FROM payroll p \
         JOIN staff st ON st.id = p.staff_id \
         JOIN users u ON u.id = st.user_id \
         WHERE 1=1",
    );
    let month_year = params.get("monthYear");
    if month_year.is_some() {
        sql.push_str(" AND p.month_year = ?");
    }
    sql.push_str(" ORDER BY p.month_year DESC, u.full_name");

    let mut query = sqlx::query_as::<_, PayrollRow>(&sql);
    if let Some(month_year) = month_year {
        query = query.bind(month_year.clone());
    }

    let rows = query.fetch_all(&db_pool).await?;
    Ok(Json(rows))
}

// GET /payroll/my-commission
pub async fn my_commission(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MyCommissionResponse>, AppError> {
    let staff_id: Option<i64> = sqlx::query_scalar("SELECT id FROM staff WHERE user_id = ?")
        .bind(auth.user_id)
        .fetch_optional(&db_pool)
        .await?;
    let Some(staff_id) = staff_id else {
        return Ok(Json(MyCommissionResponse {
            invoices: vec![],
            commission_config: None,
        }));
    };

    let cutoff = (Utc::now() - Duration::days(90)).to_rfc3339();
    let invoices = sqlx::query_as::<_, CommissionInvoice>(&format!(
        "SELECT i.id, i.invoice_number, i.total_amount, i.created_at FROM invoices i \
         LEFT JOIN appointments a ON a.id = i.appointment_id \
         WHERE {QUALIFYING} AND i.created_at >= ? \
         ORDER BY i.created_at DESC"
    ))
    .bind(staff_id)
    .bind(cutoff)
    .fetch_all(&db_pool)
    .await?;

    let config: Option<(String, f64)> =
        sqlx::query_as("SELECT commission_type, commission_value FROM staff WHERE id = ?")
            .bind(staff_id)
            .fetch_optional(&db_pool)
            .await?;

    Ok(Json(MyCommissionResponse {
        invoices,
        commission_config: config.map(|(commission_type, commission_value)| CommissionConfig {
            commission_type,
            commission_value,
        }),
    }))
}

fn status_rank(status: &str) -> Option<u8> {
    match status {
        "draft" => Some(0),
        "processed" => Some(1),
        "paid" => Some(2),
        _ => None,
    }
}

// PATCH /payroll/{id}/status
pub async fn update_status(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePayrollStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if auth.role != "admin" {
        return Err(AppError::forbidden("Only admins can update payroll status"));
    }
    let Some(new_rank) = status_rank(&req.status) else {
        return Err(AppError::validation("Invalid status"));
    };

    let current: Option<String> = sqlx::query_scalar("SELECT status FROM payroll WHERE id = ?")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?;
    let current = current.ok_or_else(|| AppError::not_found("Payroll record not found"))?;

    // draft -> processed -> paid only
    if status_rank(&current).is_some_and(|cur| new_rank < cur) {
        return Err(AppError::conflict(format!(
            "Cannot move payroll status backwards from '{current}'"
        )));
    }

    sqlx::query("UPDATE payroll SET status = ? WHERE id = ?")
        .bind(&req.status)
        .bind(id)
        .execute(&db_pool)
        .await?;

    Ok(Json(serde_json::json!({ "id": id, "status": req.status })))
}
