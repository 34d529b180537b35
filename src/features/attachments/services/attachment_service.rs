use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{ArchivedFile, AttachmentSlot, StoredAttachment};
use crate::modules::storage::BlobStore;
use crate::shared::constants::{
    ALLOWED_DOCUMENT_EXTENSIONS, ARCHIVE_NAME_FORMAT, ARCHIVE_PREFIX, ATTACHMENT_NAME_FORMAT,
};
use crate::shared::types::RegionScope;
use crate::shared::validation::{file_extension, sanitize_filename};

/// Append-only versioned document storage per record per slot. This service
/// is the only mutator of the attachment-slot columns: the blob operation and
/// the column update happen as one logical unit, and a prior current file is
/// always archived by rename, never overwritten or deleted.
pub struct AttachmentService {
    pool: SqlitePool,
    store: Arc<dyn BlobStore>,
    max_attachment_bytes: usize,
    /// One guard per (record, slot); archival-then-write is a critical
    /// section, two concurrent uploads must not both archive the same file.
    locks: Mutex<HashMap<(String, AttachmentSlot), Arc<tokio::sync::Mutex<()>>>>,
}

impl AttachmentService {
    pub fn new(pool: SqlitePool, store: Arc<dyn BlobStore>, max_attachment_bytes: usize) -> Self {
        Self {
            pool,
            store,
            max_attachment_bytes,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Store a new current file for a slot, archiving the previous one.
    pub async fn store(
        &self,
        scope: &RegionScope,
        record_id: i64,
        slot: AttachmentSlot,
        data: &[u8],
        filename_hint: &str,
    ) -> Result<StoredAttachment> {
        let extension = self.check_file(data, filename_hint)?;
        let uid = self.record_uid(scope, record_id).await?;

        let guard = self.slot_lock(&uid, slot);
        let result = {
            let _held = guard.lock().await;
            self.store_current(&uid, record_id, slot, data, &extension)
                .await
        };
        drop(guard);
        self.drop_idle_lock(&uid, slot);
        result
    }

    async fn store_current(
        &self,
        uid: &str,
        record_id: i64,
        slot: AttachmentSlot,
        data: &[u8],
        extension: &str,
    ) -> Result<StoredAttachment> {
        // re-read the current reference under the lock; a concurrent upload
        // may have replaced it since the caller looked
        let current = self.current_reference(record_id, slot).await?;

        let now = Utc::now();
        let archived = match current.as_deref().and_then(reference_basename) {
            Some(basename) => {
                self.archive_current(uid, slot, basename, now.format(ARCHIVE_NAME_FORMAT))
                    .await?
            }
            None => None,
        };

        let new_name = format!(
            "{}_{}.{}",
            slot.prefix(),
            now.format(ATTACHMENT_NAME_FORMAT),
            extension
        );
        if let Err(e) = self.store.write(uid, &new_name, data).await {
            self.unarchive(uid, archived).await;
            return Err(e);
        }

        let reference = format!("{}/{}", uid, new_name);
        let sql = format!("UPDATE vehicles SET {} = ? WHERE id = ?", slot.column());
        if let Err(e) = sqlx::query(&sql)
            .bind(&reference)
            .bind(record_id)
            .execute(&self.pool)
            .await
        {
            self.unarchive(uid, archived).await;
            return Err(e.into());
        }

        info!(record_id, slot = slot.prefix(), %reference, "attachment stored");
        Ok(StoredAttachment {
            reference,
            name: new_name,
        })
    }

    /// Archived prior versions for a slot, oldest first. Read-only.
    pub async fn list_archived(
        &self,
        scope: &RegionScope,
        record_id: i64,
        slot: AttachmentSlot,
    ) -> Result<Vec<ArchivedFile>> {
        let uid = self.record_uid(scope, record_id).await?;
        let prefix = format!("{}_{}_", ARCHIVE_PREFIX, slot.prefix());
        let names = self.store.list_names(&uid, &prefix).await?;

        Ok(names
            .into_iter()
            .map(|name| {
                let archived_at = name
                    .strip_prefix(&prefix)
                    .and_then(|rest| rest.split('_').next())
                    .and_then(|stamp| {
                        NaiveDateTime::parse_from_str(stamp, ARCHIVE_NAME_FORMAT).ok()
                    })
                    .map(|naive| naive.and_utc());
                ArchivedFile { name, archived_at }
            })
            .collect())
    }

    /// Contents of the current file for a slot.
    pub async fn read_current(
        &self,
        scope: &RegionScope,
        record_id: i64,
        slot: AttachmentSlot,
    ) -> Result<Vec<u8>> {
        let uid = self.record_uid(scope, record_id).await?;
        let reference = self
            .current_reference(record_id, slot)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Vehicle {} has no {} attachment",
                    record_id,
                    slot.prefix()
                ))
            })?;
        let name = reference_basename(&reference).ok_or_else(|| {
            AppError::InvalidFile(format!("malformed attachment reference '{}'", reference))
        })?;
        self.store.read(&uid, name).await
    }

    fn check_file(&self, data: &[u8], filename_hint: &str) -> Result<String> {
        if data.is_empty() {
            return Err(AppError::InvalidFile("file is empty".into()));
        }
        if data.len() > self.max_attachment_bytes {
            return Err(AppError::InvalidFile(format!(
                "file exceeds {} bytes",
                self.max_attachment_bytes
            )));
        }
        let safe_name = sanitize_filename(filename_hint);
        let extension = file_extension(&safe_name)
            .ok_or_else(|| AppError::InvalidFile("file has no extension".into()))?;
        if !ALLOWED_DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::InvalidFile(format!(
                "extension '{}' is not an accepted document format",
                extension
            )));
        }
        Ok(extension)
    }

    async fn record_uid(&self, scope: &RegionScope, record_id: i64) -> Result<String> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT uid, region FROM vehicles WHERE id = ?")
                .bind(record_id)
                .fetch_optional(&self.pool)
                .await?;

        row.filter(|(_, region)| scope.allows(region))
            .map(|(uid, _)| uid)
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", record_id)))
    }

    async fn current_reference(
        &self,
        record_id: i64,
        slot: AttachmentSlot,
    ) -> Result<Option<String>> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = ?", slot.column());
        let current: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(current.flatten())
    }

    /// Move the current file aside under an archive name that embeds the
    /// minute stamp and slot kind. A counter is appended in the rare case the
    /// same basename is archived twice within one minute.
    async fn archive_current(
        &self,
        uid: &str,
        slot: AttachmentSlot,
        basename: &str,
        stamp: impl std::fmt::Display,
    ) -> Result<Option<(String, String)>> {
        if self.store.list_names(uid, basename).await?.is_empty() {
            // reference points nowhere; nothing to archive
            warn!(uid, basename, "current attachment file missing, skipping archive");
            return Ok(None);
        }

        let base = format!("{}_{}_{}_{}", ARCHIVE_PREFIX, slot.prefix(), stamp, basename);
        let mut candidate = base.clone();
        let mut attempt = 1;
        while !self.store.list_names(uid, &candidate).await?.is_empty() {
            // suffixed after the base so same-minute archives keep their
            // lexical (oldest-first) listing order
            candidate = format!("{}_{}", base, attempt);
            attempt += 1;
        }

        self.store.rename(uid, basename, &candidate).await?;
        Ok(Some((basename.to_string(), candidate)))
    }

    /// Best-effort rollback of an archival after a later step failed.
    async fn unarchive(&self, uid: &str, archived: Option<(String, String)>) {
        if let Some((original, archive_name)) = archived {
            if let Err(e) = self.store.rename(uid, &archive_name, &original).await {
                warn!(uid, archive_name, error = %e, "failed to restore archived attachment");
            }
        }
    }

    fn slot_lock(&self, uid: &str, slot: AttachmentSlot) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry((uid.to_string(), slot))
            .or_default()
            .clone()
    }

    /// Remove the guard entry once no upload holds it, keeping the map
    /// bounded by in-flight uploads rather than every slot ever written.
    fn drop_idle_lock(&self, uid: &str, slot: AttachmentSlot) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let key = (uid.to_string(), slot);
        if locks.get(&key).is_some_and(|g| Arc::strong_count(g) == 1) {
            locks.remove(&key);
        }
    }
}

fn reference_basename(reference: &str) -> Option<&str> {
    reference.rsplit('/').next().filter(|n| !n.is_empty())
}
