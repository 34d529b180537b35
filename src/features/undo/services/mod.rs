mod undo_service;

pub use undo_service::{CaptureSummary, UndoOutcome, UndoService};
