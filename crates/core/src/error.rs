use crate::types::DbId;

/// Domain failures that handlers surface to clients.
///
/// Token, session, CSRF and one-time-token failures have their own error
/// types next to the code that raises them.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Input rejected by [`crate::validation`].
    #[error("Validation failed: {0}")]
    Validation(String),

    /// E.g. registering an email that is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credentials or session rejected. The message is shown to the client
    /// as-is, so it must not say which check failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}
