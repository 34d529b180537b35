pub mod services;

pub use services::UndoService;
