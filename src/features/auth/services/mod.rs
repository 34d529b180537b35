mod directory_service;

pub use directory_service::{ScopeDirectory, StaticScopeDirectory};
