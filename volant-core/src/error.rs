use thiserror::Error;

/// The control plane's error taxonomy. Variants are kinds, not call sites —
/// every component (store, network, device, launcher, engine) returns one of
/// these, and the HTTP layer maps kinds to status codes in `volant-api`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("host os error: {0}")]
    HostOs(String),

    #[error("hypervisor error: {0}")]
    Hypervisor(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Error::NotFound(entity.into())
    }

    pub fn already_exists(entity: impl Into<String>) -> Self {
        Error::AlreadyExists(entity.into())
    }

    /// Short name of the error kind, used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not-found",
            Error::AlreadyExists(_) => "already-exists",
            Error::ResourceExhausted(_) => "resource-exhausted",
            Error::PreconditionFailed(_) => "precondition-failed",
            Error::Integrity(_) => "integrity",
            Error::HostOs(_) => "host-os",
            Error::Hypervisor(_) => "hypervisor",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal",
            Error::Anyhow(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::AlreadyExists(db_err.message().to_string())
            }
            other => Error::Internal(format!("database error: {other}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
