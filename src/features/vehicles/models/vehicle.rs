use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for a fleet vehicle record.
///
/// `id` is the dense display identifier and is reassigned when the id space
/// is compacted after deletes. `uid` never changes for the lifetime of the
/// record (including across soft-delete and restore) and is what attachment
/// namespaces and deletion snapshots key on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub uid: String,
    pub plate_number: Option<String>,
    pub vehicle_brand: Option<String>,
    pub model_year: Option<String>,
    pub vehicle_supplier: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_status: Option<String>,
    pub district: Option<String>,
    pub iqama_no: Option<String>,
    pub emp_no: Option<String>,
    pub emp_name: Option<String>,
    pub project: Option<String>,
    pub previous_user: Option<String>,
    pub compliance_status: Option<String>,
    pub remarks: Option<String>,
    pub handover_doc: Option<String>,
    pub driver_id_doc: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub region: String,
}

/// Names of the editable business columns, in table order. The identifier,
/// surrogate key, attachment slots, region, and timestamp are not part of
/// the editable set.
pub const BUSINESS_FIELDS: [&str; 15] = [
    "plate_number",
    "vehicle_brand",
    "model_year",
    "vehicle_supplier",
    "vehicle_type",
    "vehicle_color",
    "vehicle_status",
    "district",
    "iqama_no",
    "emp_no",
    "emp_name",
    "project",
    "previous_user",
    "compliance_status",
    "remarks",
];

/// All persisted columns, in table order. Export emits exactly these.
pub const ALL_COLUMNS: [&str; 21] = [
    "id",
    "uid",
    "plate_number",
    "vehicle_brand",
    "model_year",
    "vehicle_supplier",
    "vehicle_type",
    "vehicle_color",
    "vehicle_status",
    "district",
    "iqama_no",
    "emp_no",
    "emp_name",
    "project",
    "previous_user",
    "compliance_status",
    "remarks",
    "handover_doc",
    "driver_id_doc",
    "last_modified",
    "region",
];

impl Vehicle {
    /// Editable field values keyed by column name, in `BUSINESS_FIELDS` order.
    pub fn business_values(&self) -> [Option<&str>; 15] {
        [
            self.plate_number.as_deref(),
            self.vehicle_brand.as_deref(),
            self.model_year.as_deref(),
            self.vehicle_supplier.as_deref(),
            self.vehicle_type.as_deref(),
            self.vehicle_color.as_deref(),
            self.vehicle_status.as_deref(),
            self.district.as_deref(),
            self.iqama_no.as_deref(),
            self.emp_no.as_deref(),
            self.emp_name.as_deref(),
            self.project.as_deref(),
            self.previous_user.as_deref(),
            self.compliance_status.as_deref(),
            self.remarks.as_deref(),
        ]
    }
}
