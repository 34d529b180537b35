pub mod attachments;
pub mod auth;
pub mod bulk;
pub mod imports;
pub mod undo;
pub mod vehicles;
