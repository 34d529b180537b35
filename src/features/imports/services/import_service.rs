use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::imports::dtos::{ImportOutcome, ImportRow, ImportRowError};
use crate::features::vehicles::dtos::VehicleFields;
use crate::features::vehicles::models::BUSINESS_FIELDS;
use crate::shared::types::{RegionRoster, RegionScope};

/// Merges an external tabular dataset into the record store by upsert on
/// plate number. A plate found anywhere triggers an update (a deliberate
/// transfer-by-import side effect); an update rewrites only the columns the
/// dataset actually mapped, leaving the rest of the row untouched. Region
/// and the modification timestamp are always forced, attachment slots never
/// touched. Each row runs in its own transaction so one bad row cannot take
/// the batch down.
pub struct ImportService {
    pool: SqlitePool,
    regions: RegionRoster,
}

impl ImportService {
    pub fn new(pool: SqlitePool, regions: RegionRoster) -> Self {
        Self { pool, regions }
    }

    /// Parse csv bytes into rows keyed by normalized column name.
    pub fn parse_csv(data: &[u8]) -> Result<Vec<ImportRow>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(normalize_column)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = ImportRow::default();
            for (header, value) in headers.iter().zip(record.iter()) {
                if !header.is_empty() {
                    row.cells.insert(header.clone(), value.to_string());
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Reconcile rows into `target_region`. Elevated scope only; the target
    /// must be a single named region.
    pub async fn reconcile(
        &self,
        scope: &RegionScope,
        target_region: &str,
        rows: &[ImportRow],
    ) -> Result<ImportOutcome> {
        if !scope.is_all() {
            return Err(AppError::Forbidden(
                "import requires the all-regions scope".into(),
            ));
        }
        let target_region = target_region.trim();
        self.regions.check(target_region)?;

        let mut outcome = ImportOutcome::default();
        for (index, row) in rows.iter().enumerate() {
            let row_no = index + 1;

            let mut fields = VehicleFields::default();
            let mut mapped: Vec<&str> = Vec::new();
            for (column, value) in &row.cells {
                let value = value.trim();
                let value = (!value.is_empty()).then(|| value.to_string());
                if fields.set(column, value) {
                    mapped.push(column.as_str());
                }
            }

            if fields.is_blank() {
                outcome.skipped += 1;
                continue;
            }
            if fields
                .plate_number
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
            {
                outcome.errors.push(ImportRowError {
                    row: row_no,
                    message: "missing plate_number".into(),
                });
                continue;
            }
            if let Err(e) = fields.check() {
                outcome.errors.push(ImportRowError {
                    row: row_no,
                    message: e.to_string(),
                });
                continue;
            }

            match self.upsert_row(target_region, &fields, &mapped).await {
                Ok(true) => outcome.inserted += 1,
                Ok(false) => outcome.updated += 1,
                Err(e) => {
                    warn!(row = row_no, error = %e, "import row failed");
                    outcome.errors.push(ImportRowError {
                        row: row_no,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            target_region,
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            failed = outcome.errors.len(),
            "import reconciled"
        );
        Ok(outcome)
    }

    /// Returns true on insert, false on update of an existing plate. On
    /// update, only the columns in `mapped` are rewritten; schema fields the
    /// dataset never mentioned keep their stored values.
    async fn upsert_row(
        &self,
        target_region: &str,
        fields: &VehicleFields,
        mapped: &[&str],
    ) -> Result<bool> {
        let plate = fields.plate_number.as_deref().unwrap_or_default();
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM vehicles WHERE plate_number = ?")
                .bind(plate)
                .fetch_optional(&mut *tx)
                .await?;

        let v = fields.values();
        let inserted = match existing {
            Some(id) => {
                let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE vehicles SET ");
                let mut sep = qb.separated(", ");
                for (name, value) in BUSINESS_FIELDS.iter().zip(v.iter()) {
                    if !mapped.contains(name) {
                        continue;
                    }
                    sep.push(format!("{} = ", name))
                        .push_bind_unseparated(value.map(str::to_string));
                }
                sep.push("region = ").push_bind_unseparated(target_region);
                sep.push("last_modified = ").push_bind_unseparated(Utc::now());
                qb.push(" WHERE id = ").push_bind(id);
                qb.build().execute(&mut *tx).await?;
                false
            }
            None => {
                let uid = Uuid::new_v4().to_string();
                let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                    "INSERT INTO vehicles (uid, plate_number, vehicle_brand, model_year, \
                     vehicle_supplier, vehicle_type, vehicle_color, vehicle_status, district, \
                     iqama_no, emp_no, emp_name, project, previous_user, compliance_status, \
                     remarks, handover_doc, driver_id_doc, last_modified, region) ",
                );
                qb.push_values([()], |mut b, _| {
                    b.push_bind(uid.clone());
                    for value in v {
                        b.push_bind(value.map(str::to_string));
                    }
                    b.push_bind(Option::<String>::None);
                    b.push_bind(Option::<String>::None);
                    b.push_bind(Utc::now());
                    b.push_bind(target_region.to_string());
                });
                qb.build().execute(&mut *tx).await?;
                true
            }
        };

        tx.commit().await?;
        Ok(inserted)
    }
}

/// Case-fold a raw column name and collapse whitespace/punctuation runs to a
/// single `_`, so "Plate Number", "plate_number" and " PLATE.NUMBER " all
/// address the same schema field.
pub fn normalize_column(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
