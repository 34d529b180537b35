//! Region-scoped fleet record engine: vehicle records with dense per-store
//! ids, versioned document attachments, an undoable delete window, atomic
//! bulk operations, and spreadsheet reconciliation.
//!
//! This crate is the engine only. Callers authenticate against a
//! [`features::auth::ScopeDirectory`], obtain a
//! [`shared::types::RegionScope`], and pass it into every service call;
//! there is no ambient session state.

pub mod core;
pub mod features;
pub mod modules;
pub mod shared;
