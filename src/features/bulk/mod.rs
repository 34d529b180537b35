pub mod services;

pub use services::BulkService;
