mod bulk_service;

pub use bulk_service::BulkService;
