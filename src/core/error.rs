use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate plate number, already on record {existing_id}")]
    DuplicatePlate { existing_id: i64 },

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Validation(format!("tabular data error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
