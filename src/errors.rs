use thiserror::Error;

/// Error taxonomy for the notification core.
///
/// `InvalidArgument` and `NotFound` are terminal and reported to the caller
/// with no retry. `Unauthorized` is enforced by filtering, not post-hoc
/// checks. `StoreUnavailable` covers collaborator-store connectivity and
/// per-call timeout budgets; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("notification not found")]
    NotFound,

    #[error("caller lacks scope for this operation")]
    Unauthorized,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl NotifyError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        NotifyError::InvalidArgument(msg.into())
    }
}
