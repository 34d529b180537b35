mod export_service;
mod import_service;

pub use export_service::ExportService;
pub use import_service::{normalize_column, ImportService};
