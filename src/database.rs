// src/database.rs
//
// SQLite pool setup and schema. WAL mode for concurrent reads, foreign keys
// on (SQLite disables them by default). In-memory databases get a single
// connection so every query sees the same data.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .create_if_missing(true);
    if !in_memory {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!(in_memory, "Database pool created");
    Ok(pool)
}

/// Applies the schema. Every statement is idempotent, so this runs on every
/// startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'staff'
                  CHECK (role IN ('admin', 'receptionist', 'staff')),
    full_name     TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS staff (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL REFERENCES users(id),
    monthly_salary   REAL NOT NULL DEFAULT 0,
    commission_type  TEXT NOT NULL DEFAULT 'percentage'
                     CHECK (commission_type IN ('percentage', 'fixed')),
    commission_value REAL NOT NULL DEFAULT 0,
    join_date        TEXT,
    is_active        INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS customers (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name      TEXT NOT NULL,
    phone          TEXT,
    email          TEXT,
    address        TEXT,
    visit_count    INTEGER NOT NULL DEFAULT 0,
    total_spending REAL NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS services (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    name                  TEXT NOT NULL,
    duration_minutes      INTEGER NOT NULL DEFAULT 60,
    price                 REAL NOT NULL,
    commission_percentage REAL NOT NULL DEFAULT 0,
    commission_fixed      REAL NOT NULL DEFAULT 0,
    is_active             INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS products (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL,
    sku              TEXT,
    unit             TEXT NOT NULL DEFAULT 'pcs',
    current_stock    INTEGER NOT NULL DEFAULT 0 CHECK (current_stock >= 0),
    reorder_level    INTEGER NOT NULL DEFAULT 5,
    supplier_name    TEXT,
    supplier_contact TEXT,
    created_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS appointments (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id      INTEGER NOT NULL REFERENCES customers(id),
    staff_id         INTEGER REFERENCES staff(id),
    service_id       INTEGER REFERENCES services(id),
    appointment_date TEXT NOT NULL,
    start_time       TEXT,
    end_time         TEXT,
    status           TEXT NOT NULL DEFAULT 'booked'
                     CHECK (status IN ('booked', 'confirmed', 'completed', 'cancelled', 'no_show')),
    notes            TEXT,
    created_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS invoices (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number TEXT NOT NULL UNIQUE,
    appointment_id INTEGER REFERENCES appointments(id),
    customer_id    INTEGER NOT NULL REFERENCES customers(id),
    staff_id       INTEGER REFERENCES staff(id),
    subtotal       REAL NOT NULL,
    tax_amount     REAL NOT NULL DEFAULT 0,
    discount       REAL NOT NULL DEFAULT 0,
    total_amount   REAL NOT NULL,
    payment_method TEXT NOT NULL DEFAULT 'cash'
                   CHECK (payment_method IN ('cash', 'card', 'bank_transfer', 'mobile_payment')),
    payment_status TEXT NOT NULL DEFAULT 'paid'
                   CHECK (payment_status IN ('paid', 'pending')),
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS invoice_items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id   INTEGER NOT NULL REFERENCES invoices(id),
    service_id   INTEGER REFERENCES services(id),
    service_name TEXT,
    product_id   INTEGER REFERENCES products(id),
    product_name TEXT,
    quantity     INTEGER NOT NULL CHECK (quantity >= 1),
    unit_price   REAL NOT NULL,
    total        REAL NOT NULL,
    CHECK ((service_id IS NULL) != (product_id IS NULL))
);

CREATE TABLE IF NOT EXISTS stock_movements (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(id),
    type       TEXT NOT NULL CHECK (type IN ('purchase', 'usage', 'adjustment')),
    quantity   INTEGER NOT NULL,
    notes      TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS payroll (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    staff_id          INTEGER NOT NULL REFERENCES staff(id),
    month_year        TEXT NOT NULL,
    base_salary       REAL NOT NULL,
    commission_earned REAL NOT NULL,
    deductions        REAL NOT NULL DEFAULT 0,
    net_payable       REAL NOT NULL,
    status            TEXT NOT NULL DEFAULT 'draft'
                      CHECK (status IN ('draft', 'processed', 'paid')),
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (staff_id, month_year)
);
"#;

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_applies_twice() {
        let pool = test_pool().await;
        init_schema(&pool).await.unwrap();
        assert!(sqlx::query("SELECT 1").execute(&pool).await.is_ok());
    }
}
