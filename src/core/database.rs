use crate::core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
}

/// Create the vehicles table if it does not exist. `id` is the dense display
/// identifier (resequenced after deletes); `uid` is the immutable surrogate
/// key backing attachment namespaces and undo snapshots.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            plate_number TEXT,
            vehicle_brand TEXT,
            model_year TEXT,
            vehicle_supplier TEXT,
            vehicle_type TEXT,
            vehicle_color TEXT,
            vehicle_status TEXT,
            district TEXT,
            iqama_no TEXT,
            emp_no TEXT,
            emp_name TEXT,
            project TEXT,
            previous_user TEXT,
            compliance_status TEXT,
            remarks TEXT,
            handover_doc TEXT,
            driver_id_doc TEXT,
            last_modified TEXT,
            region TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
