use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::features::vehicles::dtos::VehicleFields;

/// In-memory store with the schema applied. A single connection keeps every
/// query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    crate::core::database::init_schema(&pool)
        .await
        .expect("schema init");
    pool
}

pub fn fields_with_plate(plate: &str) -> VehicleFields {
    VehicleFields {
        plate_number: Some(plate.to_string()),
        vehicle_brand: Some("Toyota".to_string()),
        ..Default::default()
    }
}
