use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::core::error::Result;
use crate::features::vehicles::dtos::ListFilter;
use crate::features::vehicles::models::{Vehicle, ALL_COLUMNS};
use crate::features::vehicles::services::{push_scope_filter, SELECT_COLUMNS};
use crate::shared::types::RegionScope;

/// Scoped tabular snapshot of the record store: exactly the store's columns,
/// values passed through untransformed. Not validated against the import
/// path.
pub struct ExportService {
    pool: SqlitePool,
}

impl ExportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn export_csv(&self, scope: &RegionScope) -> Result<Vec<u8>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        push_scope_filter(&mut qb, scope, &ListFilter::default());
        qb.push(" ORDER BY id ASC");
        let rows: Vec<Vehicle> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(ALL_COLUMNS)?;
        for vehicle in &rows {
            writer.write_record(record_cells(vehicle))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| crate::core::error::AppError::from(e.into_error()))?;

        info!(scope = %scope, rows = rows.len(), "export produced");
        Ok(data)
    }
}

fn record_cells(v: &Vehicle) -> Vec<String> {
    let mut cells = Vec::with_capacity(ALL_COLUMNS.len());
    cells.push(v.id.to_string());
    cells.push(v.uid.clone());
    for value in v.business_values() {
        cells.push(value.unwrap_or_default().to_string());
    }
    cells.push(v.handover_doc.clone().unwrap_or_default());
    cells.push(v.driver_id_doc.clone().unwrap_or_default());
    cells.push(
        v.last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    );
    cells.push(v.region.clone());
    cells
}
