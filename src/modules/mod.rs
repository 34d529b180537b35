//! Modules layer - infrastructure components for external collaborators.

pub mod storage;
