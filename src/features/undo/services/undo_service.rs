use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::vehicles::models::Vehicle;
use crate::features::vehicles::VehicleService;
use crate::shared::types::RegionScope;

/// Full-row images captured at delete time, restorable for a bounded window.
/// Each caller session holds at most one outstanding snapshot; a new delete
/// replaces it and its window.
struct DeletionSnapshot {
    token: Uuid,
    rows: Vec<Vehicle>,
    captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub token: Uuid,
    pub deleted: u64,
}

#[derive(Debug, Clone)]
pub struct UndoOutcome {
    /// Rows re-inserted with their original field values and surrogate key.
    pub restored: u64,
    /// Rows skipped because their surrogate key was live again.
    pub conflicts: u64,
}

pub struct UndoService {
    pool: SqlitePool,
    window: Duration,
    snapshots: Mutex<HashMap<String, DeletionSnapshot>>,
}

impl UndoService {
    pub fn new(pool: SqlitePool, window_secs: u64) -> Self {
        Self {
            pool,
            window: Duration::seconds(window_secs as i64),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Read and retain the full row of every target id that exists in scope,
    /// delete them (compacting the id space), and remember the snapshot as
    /// the session's single undo generation. Nonexistent ids are skipped.
    pub async fn capture_and_delete(
        &self,
        scope: &RegionScope,
        session_id: &str,
        ids: &[i64],
    ) -> Result<CaptureSummary> {
        if ids.is_empty() {
            return Err(AppError::Validation("id set must not be empty".into()));
        }

        let mut tx = self.pool.begin().await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, uid, plate_number, vehicle_brand, model_year, vehicle_supplier, \
             vehicle_type, vehicle_color, vehicle_status, district, iqama_no, emp_no, \
             emp_name, project, previous_user, compliance_status, remarks, handover_doc, \
             driver_id_doc, last_modified, region FROM vehicles WHERE id IN ",
        );
        push_id_set(&mut qb, ids);
        if let RegionScope::Region(region) = scope {
            qb.push(" AND region = ").push_bind(region.clone());
        }
        qb.push(" ORDER BY id ASC");
        let rows: Vec<Vehicle> = qb.build_query_as().fetch_all(&mut *tx).await?;

        if !rows.is_empty() {
            let mut del: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM vehicles WHERE id IN ");
            let captured_ids: Vec<i64> = rows.iter().map(|v| v.id).collect();
            push_id_set(&mut del, &captured_ids);
            del.build().execute(&mut *tx).await?;
            VehicleService::resequence(&mut *tx).await?;
        }
        tx.commit().await?;

        let deleted = rows.len() as u64;
        let token = Uuid::new_v4();
        let snapshot = DeletionSnapshot {
            token,
            rows,
            captured_at: Utc::now(),
        };
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), snapshot);

        info!(session_id, deleted, %token, "deletion snapshot captured");
        Ok(CaptureSummary { token, deleted })
    }

    /// Restore the session's snapshot. Valid only while the window is open,
    /// judged against the clock at the moment of the attempt; an expired or
    /// consumed snapshot is gone for good. Restored rows keep their original
    /// field values and surrogate key but receive fresh sequential display
    /// ids, preserving their prior relative order.
    pub async fn undo(&self, session_id: &str, token: Uuid) -> Result<UndoOutcome> {
        let snapshot = {
            let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
            match snapshots.remove(session_id) {
                Some(snapshot) if snapshot.token == token => snapshot,
                Some(other) => {
                    // wrong token; the outstanding snapshot stays usable
                    snapshots.insert(session_id.to_string(), other);
                    return Err(AppError::NotFound(
                        "no matching undo snapshot for this session".into(),
                    ));
                }
                None => {
                    return Err(AppError::NotFound(
                        "no matching undo snapshot for this session".into(),
                    ));
                }
            }
        };

        if Utc::now() - snapshot.captured_at >= self.window {
            return Err(AppError::Expired("undo window has closed".into()));
        }

        let mut restored = 0u64;
        let mut conflicts = 0u64;
        let mut tx = self.pool.begin().await?;
        for row in &snapshot.rows {
            let live: Option<i64> = sqlx::query_scalar("SELECT id FROM vehicles WHERE uid = ?")
                .bind(&row.uid)
                .fetch_optional(&mut *tx)
                .await?;
            if live.is_some() {
                conflicts += 1;
                continue;
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO vehicles (uid, plate_number, vehicle_brand, model_year, \
                 vehicle_supplier, vehicle_type, vehicle_color, vehicle_status, district, \
                 iqama_no, emp_no, emp_name, project, previous_user, compliance_status, \
                 remarks, handover_doc, driver_id_doc, last_modified, region) ",
            );
            qb.push_values([row], |mut b, row| {
                b.push_bind(&row.uid);
                for value in row.business_values() {
                    b.push_bind(value.map(str::to_string));
                }
                b.push_bind(&row.handover_doc);
                b.push_bind(&row.driver_id_doc);
                b.push_bind(row.last_modified);
                b.push_bind(&row.region);
            });
            qb.build().execute(&mut *tx).await?;
            restored += 1;
        }
        tx.commit().await?;

        info!(session_id, restored, conflicts, "undo applied");
        Ok(UndoOutcome {
            restored,
            conflicts,
        })
    }
}

fn push_id_set(qb: &mut QueryBuilder<Sqlite>, ids: &[i64]) {
    qb.push("(");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::vehicles::dtos::ListFilter;
    use crate::shared::constants::DEFAULT_UNDO_WINDOW_SECS;
    use crate::shared::test_helpers::{fields_with_plate, test_pool};
    use crate::shared::types::RegionRoster;

    async fn seed(vehicles: &VehicleService, plates: &[&str]) {
        for plate in plates {
            vehicles
                .create(&RegionScope::All, "Riyadh", &fields_with_plate(plate))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_undo_within_window_restores_rows() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let undo = UndoService::new(pool, DEFAULT_UNDO_WINDOW_SECS);
        seed(&vehicles, &["U-1", "U-2", "U-3", "U-4"]).await;

        let summary = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1, 3, 4])
            .await
            .unwrap();
        assert_eq!(summary.deleted, 3);
        assert_eq!(
            vehicles
                .count(&RegionScope::All, &ListFilter::default())
                .await
                .unwrap(),
            1
        );

        let outcome = undo.undo("sess-1", summary.token).await.unwrap();
        assert_eq!(outcome.restored, 3);
        assert_eq!(outcome.conflicts, 0);

        let rows = vehicles
            .list(&RegionScope::All, &ListFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
        // dense ids, restored rows appended in prior relative order
        let ids: Vec<i64> = rows.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        let plates: Vec<_> = rows
            .iter()
            .map(|v| v.plate_number.as_deref().unwrap())
            .collect();
        assert_eq!(plates, vec!["U-2", "U-1", "U-3", "U-4"]);
    }

    #[tokio::test]
    async fn test_undo_cannot_replay() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let undo = UndoService::new(pool, DEFAULT_UNDO_WINDOW_SECS);
        seed(&vehicles, &["U-1"]).await;

        let summary = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1])
            .await
            .unwrap();
        undo.undo("sess-1", summary.token).await.unwrap();

        let err = undo.undo("sess-1", summary.token).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(
            vehicles
                .count(&RegionScope::All, &ListFilter::default())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_undo_past_window_expires_and_purges() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let undo = UndoService::new(pool, 0);
        seed(&vehicles, &["U-1"]).await;

        let summary = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1])
            .await
            .unwrap();

        let err = undo.undo("sess-1", summary.token).await.unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));
        assert_eq!(
            vehicles
                .count(&RegionScope::All, &ListFilter::default())
                .await
                .unwrap(),
            0
        );

        // the expired snapshot is gone, not retryable
        let err = undo.undo("sess-1", summary.token).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_new_delete_replaces_outstanding_snapshot() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let undo = UndoService::new(pool, DEFAULT_UNDO_WINDOW_SECS);
        seed(&vehicles, &["U-1", "U-2"]).await;

        let first = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1])
            .await
            .unwrap();
        let second = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1])
            .await
            .unwrap();

        assert!(matches!(
            undo.undo("sess-1", first.token).await,
            Err(AppError::NotFound(_))
        ));
        let outcome = undo.undo("sess-1", second.token).await.unwrap();
        assert_eq!(outcome.restored, 1);
    }

    #[tokio::test]
    async fn test_capture_skips_nonexistent_ids() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let undo = UndoService::new(pool, DEFAULT_UNDO_WINDOW_SECS);
        seed(&vehicles, &["U-1"]).await;

        let summary = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1, 50, 60])
            .await
            .unwrap();
        assert_eq!(summary.deleted, 1);
    }

    #[tokio::test]
    async fn test_surrogate_conflict_skips_row_and_reports() {
        let pool = test_pool().await;
        let vehicles = VehicleService::new(pool.clone(), RegionRoster::default());
        let undo = UndoService::new(pool.clone(), DEFAULT_UNDO_WINDOW_SECS);
        seed(&vehicles, &["U-1"]).await;
        let uid = vehicles.get(&RegionScope::All, 1).await.unwrap().uid;

        let summary = undo
            .capture_and_delete(&RegionScope::All, "sess-1", &[1])
            .await
            .unwrap();

        // something else re-occupied the surrogate key meanwhile
        sqlx::query("INSERT INTO vehicles (uid, region) VALUES (?, 'Riyadh')")
            .bind(&uid)
            .execute(&pool)
            .await
            .unwrap();

        let outcome = undo.undo("sess-1", summary.token).await.unwrap();
        assert_eq!(outcome.restored, 0);
        assert_eq!(outcome.conflicts, 1);
    }
}
