use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::vehicles::dtos::{FleetStats, ListFilter, VehicleFields};
use crate::features::vehicles::models::Vehicle;
use crate::shared::types::{RegionRoster, RegionScope, StatusClass, StatusKeywords};

pub(crate) const SELECT_COLUMNS: &str = "SELECT id, uid, plate_number, vehicle_brand, model_year, \
     vehicle_supplier, vehicle_type, vehicle_color, vehicle_status, district, iqama_no, \
     emp_no, emp_name, project, previous_user, compliance_status, remarks, handover_doc, \
     driver_id_doc, last_modified, region FROM vehicles";

/// Service owning the canonical vehicle record table. Every entry point
/// takes the caller's region scope explicitly; rows outside the scope are
/// invisible, including to mutations.
pub struct VehicleService {
    pool: SqlitePool,
    regions: RegionRoster,
}

impl VehicleService {
    pub fn new(pool: SqlitePool, regions: RegionRoster) -> Self {
        Self { pool, regions }
    }

    /// Manual record creation. The region must be on the configured roster.
    /// Rejects a plate number already on file
    /// anywhere (exact, case-sensitive match), reporting the conflicting id.
    /// The new record starts with empty attachment slots and no modification
    /// timestamp.
    pub async fn create(
        &self,
        scope: &RegionScope,
        region: &str,
        fields: &VehicleFields,
    ) -> Result<i64> {
        fields.check()?;
        self.regions.check(region)?;
        if !scope.allows(region) {
            return Err(AppError::Forbidden(format!(
                "scope {} may not create records in {}",
                scope, region
            )));
        }

        let mut tx = self.pool.begin().await?;

        if let Some(plate) = fields.plate_number.as_deref().filter(|p| !p.is_empty()) {
            let existing: Option<i64> =
                sqlx::query_scalar("SELECT id FROM vehicles WHERE plate_number = ?")
                    .bind(plate)
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(existing_id) = existing {
                return Err(AppError::DuplicatePlate { existing_id });
            }
        }

        let uid = Uuid::new_v4().to_string();
        let v = fields.values();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO vehicles (uid, plate_number, vehicle_brand, model_year, \
             vehicle_supplier, vehicle_type, vehicle_color, vehicle_status, district, \
             iqama_no, emp_no, emp_name, project, previous_user, compliance_status, \
             remarks, region) ",
        );
        qb.push_values([()], |mut b, _| {
            b.push_bind(&uid);
            for value in v {
                b.push_bind(value.map(str::to_string));
            }
            b.push_bind(region);
        });
        let result = qb.build().execute(&mut *tx).await?;
        tx.commit().await?;

        let id = result.last_insert_rowid();
        tracing::info!(id, region, "vehicle record created");
        Ok(id)
    }

    /// Fetch a single record. Out-of-scope rows read as missing.
    pub async fn get(&self, scope: &RegionScope, id: i64) -> Result<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        vehicle
            .filter(|v| scope.allows(&v.region))
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", id)))
    }

    /// Field-by-field edit. Null and empty string compare equal; if nothing
    /// actually changes, the stored row (including `last_modified`) is left
    /// untouched and `false` is returned.
    pub async fn update(
        &self,
        scope: &RegionScope,
        id: i64,
        fields: &VehicleFields,
    ) -> Result<bool> {
        fields.check()?;
        let current = self.get(scope, id).await?;

        let changed = current
            .business_values()
            .iter()
            .zip(fields.values().iter())
            .any(|(old, new)| old.unwrap_or("") != new.unwrap_or(""));
        if !changed {
            tracing::debug!(id, "vehicle edit produced no net change");
            return Ok(false);
        }

        let v = fields.values();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE vehicles SET ");
        let mut sep = qb.separated(", ");
        for (name, value) in crate::features::vehicles::models::BUSINESS_FIELDS
            .iter()
            .zip(v.iter())
        {
            sep.push(format!("{} = ", name))
                .push_bind_unseparated(value.map(str::to_string));
        }
        sep.push("last_modified = ").push_bind_unseparated(Utc::now());
        qb.push(" WHERE id = ").push_bind(id);
        qb.build().execute(&self.pool).await?;

        tracing::info!(id, "vehicle record updated");
        Ok(true)
    }

    /// Delete a single record; a missing or out-of-scope id is a hard
    /// rejection here, unlike in bulk sets. Compacts the id space afterwards.
    pub async fn delete_one(&self, scope: &RegionScope, id: i64) -> Result<()> {
        // visibility check gives NotFound before any mutation
        self.get(scope, id).await?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Vehicle {} not found", id)));
        }
        Self::resequence(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(id, "vehicle record deleted");
        Ok(())
    }

    /// Scoped listing ordered by display id, with an optional
    /// case-insensitive plate-number substring filter.
    pub async fn list(&self, scope: &RegionScope, filter: &ListFilter) -> Result<Vec<Vehicle>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        push_scope_filter(&mut qb, scope, filter);
        qb.push(" ORDER BY id ASC");

        Ok(qb
            .build_query_as::<Vehicle>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// Scoped row count under the same filter semantics as `list`.
    pub async fn count(&self, scope: &RegionScope, filter: &ListFilter) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM vehicles");
        push_scope_filter(&mut qb, scope, filter);

        Ok(qb.build_query_scalar().fetch_one(&self.pool).await?)
    }

    /// Aggregate counts for a scope. Status buckets come from keyword
    /// classification of the free-text status column.
    pub async fn stats(&self, scope: &RegionScope, keywords: &StatusKeywords) -> Result<FleetStats> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT vehicle_status, project, last_modified FROM vehicles");
        push_scope_filter(&mut qb, scope, &ListFilter::default());

        let rows: Vec<(Option<String>, Option<String>, Option<chrono::DateTime<Utc>>)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        let mut stats = FleetStats {
            total: rows.len() as i64,
            active: 0,
            inactive: 0,
            maintenance: 0,
            rented: 0,
            modified: 0,
        };
        for (status, project, last_modified) in &rows {
            match keywords.classify(status.as_deref()) {
                StatusClass::Active => stats.active += 1,
                StatusClass::Inactive => stats.inactive += 1,
                StatusClass::UnderMaintenance => stats.maintenance += 1,
                StatusClass::Unclassified => {}
            }
            if project.as_deref().is_some_and(|p| !p.trim().is_empty()) {
                stats.rented += 1;
            }
            if last_modified.is_some() {
                stats.modified += 1;
            }
        }
        Ok(stats)
    }

    /// Renumber all rows to a dense ascending sequence starting at 1,
    /// preserving relative order, and reset the autoincrement counter so the
    /// next insert continues from the new high end. Must run inside the same
    /// transaction as the delete that made ids sparse; sqlite's single-writer
    /// transaction gives the exclusive id-space access this needs.
    pub(crate) async fn resequence(conn: &mut SqliteConnection) -> Result<()> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM vehicles ORDER BY id ASC")
            .fetch_all(&mut *conn)
            .await?;

        for (index, old_id) in ids.iter().enumerate() {
            let new_id = index as i64 + 1;
            if new_id != *old_id {
                sqlx::query("UPDATE vehicles SET id = ? WHERE id = ?")
                    .bind(new_id)
                    .bind(old_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }

        // sqlite_sequence only exists once an autoincrement insert happened
        let seq_table: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
        )
        .fetch_optional(&mut *conn)
        .await?;
        if seq_table.is_some() {
            sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'vehicles'")
                .execute(&mut *conn)
                .await?;
        }

        tracing::debug!(rows = ids.len(), "id space resequenced");
        Ok(())
    }
}

pub(crate) fn push_scope_filter(qb: &mut QueryBuilder<Sqlite>, scope: &RegionScope, filter: &ListFilter) {
    let mut prefix = " WHERE ";
    if let RegionScope::Region(region) = scope {
        qb.push(prefix).push("region = ").push_bind(region.clone());
        prefix = " AND ";
    }
    if let Some(plate) = filter
        .plate_contains
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        qb.push(prefix)
            .push("plate_number LIKE ")
            .push_bind(format!("%{}%", plate.trim()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{fields_with_plate, test_pool};

    #[tokio::test]
    async fn test_create_rejects_duplicate_plate_across_regions() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());

        let id = service
            .create(&RegionScope::All, "Riyadh", &fields_with_plate("ABC-123"))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let err = service
            .create(&RegionScope::All, "Jeddah", &fields_with_plate("ABC-123"))
            .await
            .unwrap_err();
        match err {
            AppError::DuplicatePlate { existing_id } => assert_eq!(existing_id, 1),
            other => panic!("expected DuplicatePlate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_forbidden_outside_scope() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());
        let scope = RegionScope::Region("Najran".to_string());

        let err = service
            .create(&scope, "Jeddah", &fields_with_plate("XYZ-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_region_outside_roster() {
        let pool = test_pool().await;
        let service = VehicleService::new(
            pool,
            RegionRoster::new(vec!["Najran".to_string()]),
        );

        let err = service
            .create(&RegionScope::All, "Atlantis", &fields_with_plate("R-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create(&RegionScope::All, "", &fields_with_plate("R-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_no_net_change_keeps_timestamp() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());
        let mut fields = fields_with_plate("ABC-1");
        fields.vehicle_color = Some("White".to_string());
        let id = service
            .create(&RegionScope::All, "Riyadh", &fields)
            .await
            .unwrap();

        // identical edit, with None where the row holds empty-equivalents
        let changed = service.update(&RegionScope::All, id, &fields).await.unwrap();
        assert!(!changed);
        let row = service.get(&RegionScope::All, id).await.unwrap();
        assert!(row.last_modified.is_none());

        // null vs empty string is not a change either
        let mut same = fields.clone();
        same.remarks = Some(String::new());
        assert!(!service.update(&RegionScope::All, id, &same).await.unwrap());

        // a real change stamps the timestamp
        let mut edited = fields.clone();
        edited.vehicle_color = Some("Black".to_string());
        assert!(service.update(&RegionScope::All, id, &edited).await.unwrap());
        let row = service.get(&RegionScope::All, id).await.unwrap();
        assert!(row.last_modified.is_some());
        assert_eq!(row.vehicle_color.as_deref(), Some("Black"));
    }

    #[tokio::test]
    async fn test_list_scoped_and_plate_filtered() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());
        service
            .create(&RegionScope::All, "Riyadh", &fields_with_plate("RUH-111"))
            .await
            .unwrap();
        service
            .create(&RegionScope::All, "Jeddah", &fields_with_plate("JED-222"))
            .await
            .unwrap();

        let all = service
            .list(&RegionScope::All, &ListFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);

        let jeddah = RegionScope::Region("Jeddah".to_string());
        let scoped = service.list(&jeddah, &ListFilter::default()).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].plate_number.as_deref(), Some("JED-222"));

        let filter = ListFilter {
            plate_contains: Some("ruh".to_string()),
        };
        let filtered = service.list(&RegionScope::All, &filter).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].plate_number.as_deref(), Some("RUH-111"));
    }

    #[tokio::test]
    async fn test_get_hides_other_regions() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());
        let id = service
            .create(&RegionScope::All, "Riyadh", &fields_with_plate("A-1"))
            .await
            .unwrap();

        let jeddah = RegionScope::Region("Jeddah".to_string());
        assert!(matches!(
            service.get(&jeddah, id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_one_resequences_and_rejects_missing() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());
        for plate in ["P-1", "P-2", "P-3"] {
            service
                .create(&RegionScope::All, "Riyadh", &fields_with_plate(plate))
                .await
                .unwrap();
        }

        service.delete_one(&RegionScope::All, 2).await.unwrap();
        let rows = service
            .list(&RegionScope::All, &ListFilter::default())
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(rows[1].plate_number.as_deref(), Some("P-3"));

        assert!(matches!(
            service.delete_one(&RegionScope::All, 99).await,
            Err(AppError::NotFound(_))
        ));

        // next insert continues the dense sequence, not the old high mark
        let id = service
            .create(&RegionScope::All, "Riyadh", &fields_with_plate("P-4"))
            .await
            .unwrap();
        assert_eq!(id, 3);
    }

    #[tokio::test]
    async fn test_stats_classify_and_count() {
        let pool = test_pool().await;
        let service = VehicleService::new(pool, RegionRoster::default());
        let seed = [
            ("S-1", Some("Active"), None),
            ("S-2", Some("نشط"), Some("Project X")),
            ("S-3", Some("Inactive"), None),
            ("S-4", Some("Under Maintenance"), None),
            ("S-5", None, None),
        ];
        for (plate, status, project) in seed {
            let mut fields = fields_with_plate(plate);
            fields.vehicle_status = status.map(String::from);
            fields.project = project.map(String::from);
            service
                .create(&RegionScope::All, "Riyadh", &fields)
                .await
                .unwrap();
        }

        let stats = service
            .stats(&RegionScope::All, &StatusKeywords::default())
            .await
            .unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.inactive, 1);
        assert_eq!(stats.maintenance, 1);
        assert_eq!(stats.rented, 1);
        assert_eq!(stats.modified, 0);
    }
}
