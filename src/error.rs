use thiserror::Error;

use crate::ai::Mode;

/// Rejections raised before a document ever reaches the network.
#[derive(Debug, Error)]
pub enum FileValidationError {
    #[error("{name} is empty")]
    Empty { name: String },

    #[error("{name} is {size} bytes, the limit is {limit} bytes")]
    TooLarge { name: String, size: usize, limit: usize },

    #[error("{name} is not a JPEG, PNG, HEIC or PDF file")]
    UnsupportedType { name: String },

    #[error("could not read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request was aborted")]
    Aborted,

    #[error("no response from model endpoint: {0}")]
    Network(String),

    #[error("model endpoint returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("unreadable response from model endpoint: {0}")]
    InvalidResponse(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizationError {
    /// The completion holds no JSON object at all, usually a refusal or prose.
    #[error("the model did not return structured data")]
    NoStructuredData { raw: String },

    #[error("structured data could not be recovered: {reason}")]
    UnparsableStructuredData { reason: String },

    #[error("response does not look like {mode} data: {detail}")]
    SchemaMismatch { mode: Mode, detail: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    File(#[from] FileValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}

impl AnalysisError {
    /// Aborted calls were superseded or cancelled by the user and are never shown.
    pub fn is_silent(&self) -> bool {
        matches!(self, AnalysisError::Client(ClientError::Aborted))
    }

    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::File(e) => e.to_string(),
            AnalysisError::Client(ClientError::Network(_)) => {
                "Could not reach the analysis service. Check your connection and try again."
                    .to_string()
            }
            AnalysisError::Client(e) => e.to_string(),
            AnalysisError::Normalization(NormalizationError::NoStructuredData { raw }) => {
                raw.trim().to_string()
            }
            AnalysisError::Normalization(e) => e.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("no document selected")]
    NoDocument,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}
