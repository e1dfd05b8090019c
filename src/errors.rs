use sea_orm::error::DbErr;
use serde::Serialize;

/// Unified error type for the stock ledger services.
///
/// Expansion-time failures (`NotFound`, `IncompleteRecipe`, `AmbiguousName`)
/// are returned before anything is appended to the movement log. Storage
/// failures are transient and the caller retries the whole operation; batch
/// appends are transactional, so there is never a partially landed sale to
/// clean up.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A recipe references an ingredient the catalog cannot resolve. The
    /// expansion that hit this has appended nothing.
    #[error("Incomplete recipe: {0}")]
    IncompleteRecipe(String),

    /// Legacy name-based lookup matched more than one live record. Never
    /// silently resolved to the first match.
    #[error("Ambiguous name: {0}")]
    AmbiguousName(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Whether the caller should retry the whole operation.
    ///
    /// Only storage unavailability is transient; every other variant is a
    /// local validation failure that will not go away on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::DatabaseError(_))
    }
}
