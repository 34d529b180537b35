use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, Result};

/// The set of regions a caller may see and act on: one named region, or the
/// elevated "all regions" sentinel that authorizes bulk transfer and import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionScope {
    All,
    Region(String),
}

impl RegionScope {
    /// Parse a stored scope value. The sentinel is matched case-insensitively
    /// ("ALL", "all"); anything else is a named region, kept verbatim.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            RegionScope::All
        } else {
            RegionScope::Region(value.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, RegionScope::All)
    }

    /// Whether a record in `region` is visible under this scope.
    pub fn allows(&self, region: &str) -> bool {
        match self {
            RegionScope::All => true,
            RegionScope::Region(name) => name == region,
        }
    }
}

impl std::fmt::Display for RegionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionScope::All => write!(f, "ALL"),
            RegionScope::Region(name) => write!(f, "{}", name),
        }
    }
}

/// The closed set of named regions records may belong to. Membership is an
/// exact match, like scope checks; region names never go through case
/// folding.
#[derive(Debug, Clone)]
pub struct RegionRoster {
    names: Vec<String>,
}

impl Default for RegionRoster {
    fn default() -> Self {
        Self::new(
            ["Najran", "Jeddah", "Asser", "Jazan", "Baha", "Riyadh", "Dammam"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

impl RegionRoster {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn contains(&self, region: &str) -> bool {
        self.names.iter().any(|name| name == region)
    }

    /// Reject a region name outside the roster before any mutation.
    pub fn check(&self, region: &str) -> Result<()> {
        if self.contains(region) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "unknown region '{}'",
                region
            )))
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Status classification boundary type. Stored status stays free text; this
/// enum is what counting and import-time classification work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    Active,
    Inactive,
    UnderMaintenance,
    Unclassified,
}

/// Keyword token sets for classifying free-text status values. The sets are
/// bilingual by convention and configurable, matched as case-sensitive
/// substrings.
#[derive(Debug, Clone)]
pub struct StatusKeywords {
    pub active: Vec<String>,
    pub inactive: Vec<String>,
    pub maintenance: Vec<String>,
}

impl Default for StatusKeywords {
    fn default() -> Self {
        Self {
            active: vec!["Active".into(), "نشط".into()],
            inactive: vec!["Inactive".into(), "متعطل".into(), "اجازة".into()],
            maintenance: vec!["Under Maintenance".into(), "صيانة".into()],
        }
    }
}

impl StatusKeywords {
    pub fn classify(&self, status: Option<&str>) -> StatusClass {
        let Some(status) = status else {
            return StatusClass::Unclassified;
        };
        let contains_any = |tokens: &[String]| tokens.iter().any(|t| status.contains(t.as_str()));
        if contains_any(&self.maintenance) {
            StatusClass::UnderMaintenance
        } else if contains_any(&self.inactive) {
            StatusClass::Inactive
        } else if contains_any(&self.active) {
            StatusClass::Active
        } else {
            StatusClass::Unclassified
        }
    }
}
