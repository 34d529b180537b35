mod vehicle_dto;

pub use vehicle_dto::{FleetStats, ListFilter, VehicleFields};
