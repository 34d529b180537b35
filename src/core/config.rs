use std::env;

use crate::shared::constants::{DEFAULT_UNDO_WINDOW_SECS, MAX_ATTACHMENT_BYTES};
use crate::shared::types::{RegionRoster, StatusKeywords};

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub undo: UndoConfig,
    /// Closed set of named regions records may belong to; services reject
    /// region names outside it.
    pub regions: RegionRoster,
    /// Token sets for free-text status classification.
    pub status_keywords: StatusKeywords,
    /// Caller directory entries, resolved to region scopes at login.
    pub directory: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory of the attachment blob store.
    pub root: String,
    pub max_attachment_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct UndoConfig {
    pub window_secs: u64,
}

/// One caller identity: employee number, password, entitled region scope
/// (a region name or "ALL").
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub emp_no: String,
    pub password: String,
    pub region: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            database: DatabaseConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            undo: UndoConfig::from_env()?,
            regions: parse_list_var("FLEET_REGIONS")
                .map(RegionRoster::new)
                .unwrap_or_default(),
            status_keywords: status_keywords_from_env(),
            directory: directory_from_env()?,
        })
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

    pub fn from_env() -> Result<Self, String> {
        let url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://database/fleet.db".to_string());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
        })
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let root = env::var("UPLOAD_ROOT").unwrap_or_else(|_| "uploads".to_string());

        let max_attachment_bytes = env::var("MAX_ATTACHMENT_BYTES")
            .unwrap_or_else(|_| MAX_ATTACHMENT_BYTES.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_ATTACHMENT_BYTES must be a valid number".to_string())?;

        Ok(Self {
            root,
            max_attachment_bytes,
        })
    }
}

impl UndoConfig {
    pub fn from_env() -> Result<Self, String> {
        let window_secs = env::var("UNDO_WINDOW_SECS")
            .unwrap_or_else(|_| DEFAULT_UNDO_WINDOW_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "UNDO_WINDOW_SECS must be a valid number".to_string())?;

        Ok(Self { window_secs })
    }
}

fn parse_list_var(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn status_keywords_from_env() -> StatusKeywords {
    let defaults = StatusKeywords::default();
    StatusKeywords {
        active: parse_list_var("STATUS_ACTIVE_KEYWORDS").unwrap_or(defaults.active),
        inactive: parse_list_var("STATUS_INACTIVE_KEYWORDS").unwrap_or(defaults.inactive),
        maintenance: parse_list_var("STATUS_MAINTENANCE_KEYWORDS").unwrap_or(defaults.maintenance),
    }
}

/// Directory entries come as `emp_no:password:region` triples, comma
/// separated, e.g. `FLEET_ADMINS=E001:secret:Najran,E000:secret:ALL`.
fn directory_from_env() -> Result<Vec<DirectoryEntry>, String> {
    let raw = match env::var("FLEET_ADMINS") {
        Ok(raw) => raw,
        Err(_) => return Ok(Vec::new()),
    };

    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(emp_no), Some(password), Some(region))
                    if !emp_no.is_empty() && !password.is_empty() && !region.is_empty() =>
                {
                    Ok(DirectoryEntry {
                        emp_no: emp_no.to_string(),
                        password: password.to_string(),
                        region: region.to_string(),
                    })
                }
                _ => Err(format!(
                    "FLEET_ADMINS entry '{}' must be emp_no:password:region",
                    entry
                )),
            }
        })
        .collect()
}
