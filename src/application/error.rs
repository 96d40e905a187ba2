use crate::domain::error::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("export I/O error: {0}")]
    ExportIo(#[source] std::io::Error),

    #[error("export encode error: {0}")]
    ExportEncode(#[source] serde_json::Error),
}
