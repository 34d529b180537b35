use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::vehicles::VehicleService;
use crate::shared::types::{RegionRoster, RegionScope};

/// Applies one mutation across a caller-supplied id set in a single
/// transaction: every existing, in-scope id is affected or none are. Ids
/// absent from the store are silently skipped and the returned count is the
/// number of rows actually touched, never the input length.
pub struct BulkService {
    pool: SqlitePool,
    regions: RegionRoster,
}

impl BulkService {
    pub fn new(pool: SqlitePool, regions: RegionRoster) -> Self {
        Self { pool, regions }
    }

    /// Delete every existing id in the set, then compact the id space so the
    /// remaining rows are numbered 1..N in their prior order. Returns the
    /// number of rows deleted.
    pub async fn bulk_delete(&self, scope: &RegionScope, ids: &[i64]) -> Result<u64> {
        check_ids(ids)?;

        let mut tx = self.pool.begin().await?;
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM vehicles WHERE id IN ");
        push_id_set(&mut qb, ids);
        push_region_guard(&mut qb, scope);
        let deleted = qb.build().execute(&mut *tx).await?.rows_affected();

        VehicleService::resequence(&mut *tx).await?;

        tx.commit().await?;

        info!(deleted, "bulk delete committed");
        Ok(deleted)
    }

    /// Move every existing id in the set to `target_region`, which must be
    /// on the configured roster. Elevated scope only; the region field is the
    /// only thing rewritten.
    pub async fn bulk_transfer(
        &self,
        scope: &RegionScope,
        ids: &[i64],
        target_region: &str,
    ) -> Result<u64> {
        check_ids(ids)?;
        if !scope.is_all() {
            return Err(AppError::Forbidden(
                "bulk transfer requires the all-regions scope".into(),
            ));
        }
        self.regions.check(target_region)?;

        let mut tx = self.pool.begin().await?;
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE vehicles SET region = ");
        qb.push_bind(target_region);
        qb.push(" WHERE id IN ");
        push_id_set(&mut qb, ids);
        let moved = qb.build().execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;

        info!(moved, target_region, "bulk transfer committed");
        Ok(moved)
    }

    /// Write a maintenance-request marker into the remarks of every existing
    /// id in the set. Unlike the generic edit diff, annotation always counts
    /// as a change and always stamps `last_modified`.
    pub async fn bulk_annotate(
        &self,
        scope: &RegionScope,
        ids: &[i64],
        description: &str,
    ) -> Result<u64> {
        check_ids(ids)?;
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::Validation(
                "maintenance description must not be empty".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE vehicles SET remarks = ");
        qb.push_bind(format!("Maintenance Request: {}", description));
        qb.push(", last_modified = ").push_bind(Utc::now());
        qb.push(" WHERE id IN ");
        push_id_set(&mut qb, ids);
        push_region_guard(&mut qb, scope);
        let annotated = qb.build().execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;

        info!(annotated, "bulk maintenance annotation committed");
        Ok(annotated)
    }
}

fn check_ids(ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(AppError::Validation("id set must not be empty".into()));
    }
    Ok(())
}

fn push_id_set(qb: &mut QueryBuilder<Sqlite>, ids: &[i64]) {
    qb.push("(");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    qb.push(")");
}

fn push_region_guard(qb: &mut QueryBuilder<Sqlite>, scope: &RegionScope) {
    if let RegionScope::Region(region) = scope {
        qb.push(" AND region = ").push_bind(region.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::vehicles::dtos::ListFilter;
    use crate::shared::test_helpers::{fields_with_plate, test_pool};

    async fn seed(vehicles: &VehicleService, plates: &[&str]) {
        for plate in plates {
            vehicles
                .create(&RegionScope::All, "Riyadh", &fields_with_plate(plate))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_bulk_delete_leaves_dense_ids() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let bulk = BulkService::new(pool, RegionRoster::default());
        seed(&vehicles, &["B-1", "B-2", "B-3", "B-4", "B-5"]).await;

        let deleted = bulk.bulk_delete(&RegionScope::All, &[2, 4]).await.unwrap();
        assert_eq!(deleted, 2);

        let rows = vehicles
            .list(&RegionScope::All, &ListFilter::default())
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let plates: Vec<_> = rows
            .iter()
            .map(|v| v.plate_number.as_deref().unwrap())
            .collect();
        assert_eq!(plates, vec!["B-1", "B-3", "B-5"]);
    }

    #[tokio::test]
    async fn test_bulk_delete_skips_missing_ids_and_reports_actual_count() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let bulk = BulkService::new(pool, RegionRoster::default());
        seed(&vehicles, &["B-1", "B-2"]).await;

        let deleted = bulk
            .bulk_delete(&RegionScope::All, &[1, 999])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_bulk_delete_respects_scope() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let bulk = BulkService::new(pool, RegionRoster::default());
        seed(&vehicles, &["B-1"]).await;
        vehicles
            .create(&RegionScope::All, "Jeddah", &fields_with_plate("J-1"))
            .await
            .unwrap();

        let najran = RegionScope::Region("Najran".to_string());
        let deleted = bulk.bulk_delete(&najran, &[1, 2]).await.unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(
            vehicles
                .count(&RegionScope::All, &ListFilter::default())
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_bulk_transfer_elevated_only() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let bulk = BulkService::new(pool, RegionRoster::default());
        seed(&vehicles, &["T-1", "T-2"]).await;

        let najran = RegionScope::Region("Najran".to_string());
        let err = bulk.bulk_transfer(&najran, &[1], "Jeddah").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = bulk
            .bulk_transfer(&RegionScope::All, &[1], "Atlantis")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let moved = bulk
            .bulk_transfer(&RegionScope::All, &[1, 2, 999], "Jeddah")
            .await
            .unwrap();
        assert_eq!(moved, 2);
        let row = vehicles.get(&RegionScope::All, 1).await.unwrap();
        assert_eq!(row.region, "Jeddah");
        // only the region field moved
        assert!(row.last_modified.is_none());
    }

    #[tokio::test]
    async fn test_bulk_annotate_always_stamps() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let bulk = BulkService::new(pool, RegionRoster::default());
        seed(&vehicles, &["M-1"]).await;

        let annotated = bulk
            .bulk_annotate(&RegionScope::All, &[1], "oil change")
            .await
            .unwrap();
        assert_eq!(annotated, 1);
        let row = vehicles.get(&RegionScope::All, 1).await.unwrap();
        assert_eq!(
            row.remarks.as_deref(),
            Some("Maintenance Request: oil change")
        );
        let first_stamp = row.last_modified.unwrap();

        // same annotation again still counts as a change
        bulk.bulk_annotate(&RegionScope::All, &[1], "oil change")
            .await
            .unwrap();
        let row = vehicles.get(&RegionScope::All, 1).await.unwrap();
        assert!(row.last_modified.unwrap() >= first_stamp);
        assert_eq!(
            row.remarks.as_deref(),
            Some("Maintenance Request: oil change")
        );
    }

    #[tokio::test]
    async fn test_empty_id_set_rejected() {
        let pool = test_pool().await;
        let bulk = BulkService::new(pool, RegionRoster::default());
        assert!(matches!(
            bulk.bulk_delete(&RegionScope::All, &[]).await,
            Err(AppError::Validation(_))
        ));
    }
}
