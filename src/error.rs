use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Token or user id missing. Raised before any request is made.
    #[error("not authenticated")]
    Unauthenticated,

    #[error("failed to {operation}: server returned {status}")]
    FetchFailed {
        operation: &'static str,
        status: StatusCode,
    },

    #[error("invalid task: {0}")]
    ValidationFailed(String),

    /// Signup or signin rejected; carries the server's `detail` when present.
    #[error("{0}")]
    AuthFailed(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::Unauthenticated)
    }

    /// No credentials, or the server refused the ones we sent.
    pub fn requires_sign_in(&self) -> bool {
        match self {
            ClientError::Unauthenticated => true,
            ClientError::FetchFailed { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}
