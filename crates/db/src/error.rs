use tollgate_core::one_time::OneTimeTokenError;

/// Failure while redeeming a one-time token.
#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error(transparent)]
    Token(#[from] OneTimeTokenError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
