use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named attachment position on a record: one current file plus an
/// archive history, stored under the record's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentSlot {
    Handover,
    DriverId,
}

impl AttachmentSlot {
    /// Short tag embedded in file names.
    pub fn prefix(&self) -> &'static str {
        match self {
            AttachmentSlot::Handover => "HO",
            AttachmentSlot::DriverId => "ID",
        }
    }

    /// Column on the vehicles table holding the current reference.
    pub fn column(&self) -> &'static str {
        match self {
            AttachmentSlot::Handover => "handover_doc",
            AttachmentSlot::DriverId => "driver_id_doc",
        }
    }
}

/// Reference to the freshly stored current file for a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAttachment {
    /// Relative path rooted at the record's namespace (`{uid}/{name}`).
    pub reference: String,
    /// Bare file name within the namespace.
    pub name: String,
}

/// Descriptor of one archived prior version of a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedFile {
    pub name: String,
    /// Archival stamp parsed back out of the name (minute resolution).
    pub archived_at: Option<DateTime<Utc>>,
}
