use shared::{CodecError, FailureKind, IllegalArgument, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("illegal argument: {0}")]
    IllegalArgument(#[from] IllegalArgument),

    /// The server answered with a failure response.
    #[error("server rejected request ({kind:?}): {reason}")]
    Rejected { kind: FailureKind, reason: String },

    #[error("unexpected response to {request}: {response:?}")]
    UnexpectedResponse {
        request: &'static str,
        response: Response,
    },

    #[error("connection closed by server")]
    Closed,
}

impl ClientError {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ClientError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.failure_kind() == Some(FailureKind::NotFound)
    }
}
