#[derive(Debug, thiserror::Error)]
pub enum PgxError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("patient record schema mismatch at {path}: {message}")]
    PatientSchema { path: String, message: String },

    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize analysis: {0}")]
    Serialization(serde_json::Error),

    #[error("knowledge base error: {0}")]
    KnowledgeBase(#[from] pgx_kb::KbError),
}

/// Type alias for Results that can fail with a [`PgxError`].
pub type PgxResult<T> = std::result::Result<T, PgxError>;
