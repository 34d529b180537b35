mod vehicle_service;

pub use vehicle_service::VehicleService;
pub(crate) use vehicle_service::{push_scope_filter, SELECT_COLUMNS};
