mod vehicle;

pub use vehicle::{Vehicle, ALL_COLUMNS, BUSINESS_FIELDS};
