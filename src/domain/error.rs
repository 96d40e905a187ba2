#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("unknown search field: '{0}' (use: title, author, genre)")]
    UnknownSearchField(String),

    #[error("unknown read filter: '{0}' (use: all, read, unread)")]
    UnknownReadFilter(String),
}
