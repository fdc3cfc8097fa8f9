use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`crate::MemoryClient`].
#[derive(Debug, Error)]
pub enum Mem0Error {
    /// The client was built without a usable API key.
    #[error("Mem0 API key is required")]
    MissingApiKey,

    /// The configured host is not an absolute http(s) base URL.
    #[error("invalid Mem0 host '{0}'")]
    InvalidHost(String),

    /// The service answered with a non-success status.
    #[error("API request failed: {status} - {body}")]
    Api { status: StatusCode, body: String },

    /// The service answered with a body this client cannot use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Caller-supplied arguments failed a precondition; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// One step of a bulk entity deletion failed.
    #[error("Failed to delete {entity_type} {name}: {source}")]
    EntityDelete {
        entity_type: String,
        name: String,
        #[source]
        source: Box<Self>,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Mem0Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::EntityDelete { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub type Result<T, E = Mem0Error> = std::result::Result<T, E>;
