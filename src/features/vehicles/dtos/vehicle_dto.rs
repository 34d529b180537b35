use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::shared::validation::{IQAMA_REGEX, MODEL_YEAR_REGEX};

/// The editable business fields of a record, as supplied by manual entry,
/// single-record edit, or a mapped import row. Attachment slots, region, and
/// the modification timestamp are managed by the engine and never appear
/// here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct VehicleFields {
    #[validate(length(max = 64, message = "Plate number must not exceed 64 characters"))]
    pub plate_number: Option<String>,
    #[validate(length(max = 128, message = "Brand must not exceed 128 characters"))]
    pub vehicle_brand: Option<String>,
    pub model_year: Option<String>,
    #[validate(length(max = 128, message = "Supplier must not exceed 128 characters"))]
    pub vehicle_supplier: Option<String>,
    #[validate(length(max = 128, message = "Type must not exceed 128 characters"))]
    pub vehicle_type: Option<String>,
    #[validate(length(max = 64, message = "Color must not exceed 64 characters"))]
    pub vehicle_color: Option<String>,
    #[validate(length(max = 128, message = "Status must not exceed 128 characters"))]
    pub vehicle_status: Option<String>,
    #[validate(length(max = 128, message = "District must not exceed 128 characters"))]
    pub district: Option<String>,
    pub iqama_no: Option<String>,
    #[validate(length(max = 64, message = "Employee number must not exceed 64 characters"))]
    pub emp_no: Option<String>,
    #[validate(length(max = 128, message = "Employee name must not exceed 128 characters"))]
    pub emp_name: Option<String>,
    #[validate(length(max = 128, message = "Project must not exceed 128 characters"))]
    pub project: Option<String>,
    #[validate(length(max = 128, message = "Previous user must not exceed 128 characters"))]
    pub previous_user: Option<String>,
    #[validate(length(max = 128, message = "Compliance status must not exceed 128 characters"))]
    pub compliance_status: Option<String>,
    #[validate(length(max = 2048, message = "Remarks must not exceed 2048 characters"))]
    pub remarks: Option<String>,
}

impl VehicleFields {
    /// Field values in `BUSINESS_FIELDS` order.
    pub fn values(&self) -> [Option<&str>; 15] {
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

    /// Assign a field by column name. Returns false for names outside the
    /// editable set, which callers treat as "ignore this column".
    pub fn set(&mut self, name: &str, value: Option<String>) -> bool {
        let slot = match name {
            "plate_number" => &mut self.plate_number,
            "vehicle_brand" => &mut self.vehicle_brand,
            "model_year" => &mut self.model_year,
            "vehicle_supplier" => &mut self.vehicle_supplier,
            "vehicle_type" => &mut self.vehicle_type,
            "vehicle_color" => &mut self.vehicle_color,
            "vehicle_status" => &mut self.vehicle_status,
            "district" => &mut self.district,
            "iqama_no" => &mut self.iqama_no,
            "emp_no" => &mut self.emp_no,
            "emp_name" => &mut self.emp_name,
            "project" => &mut self.project,
            "previous_user" => &mut self.previous_user,
            "compliance_status" => &mut self.compliance_status,
            "remarks" => &mut self.remarks,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// True when every field is null or whitespace.
    pub fn is_blank(&self) -> bool {
        self.values()
            .iter()
            .all(|v| v.map_or(true, |s| s.trim().is_empty()))
    }

    /// Structural checks beyond the derive-level length bounds: the national
    /// ID must be exactly 10 digits and the model year a 4-digit number,
    /// whenever they are present and non-blank.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(iqama) = non_blank(self.iqama_no.as_deref()) {
            if !IQAMA_REGEX.is_match(iqama) {
                return Err(AppError::Validation(format!(
                    "iqama_no '{}' must be exactly 10 digits",
                    iqama
                )));
            }
        }
        if let Some(year) = non_blank(self.model_year.as_deref()) {
            if !MODEL_YEAR_REGEX.is_match(year) {
                return Err(AppError::Validation(format!(
                    "model_year '{}' must be a 4-digit number",
                    year
                )));
            }
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Optional filters combined with the region scope on list queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    /// Case-insensitive plate-number substring.
    pub plate_contains: Option<String>,
}

/// Per-scope aggregate counts for the dashboard header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub maintenance: i64,
    /// Records carrying a non-blank project/rental tag.
    pub rented: i64,
    /// Records edited at least once.
    pub modified: i64,
}
