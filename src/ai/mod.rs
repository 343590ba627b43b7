pub mod abort;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use abort::{AbortController, AbortSignal};
pub use llm::{client_for, request_completion, VisionModel};

/// Which extraction schema is requested from the model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Expense,
    Receipt,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Expense => "expense",
            Mode::Receipt => "receipt",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" | "expenses" => Ok(Mode::Expense),
            "receipt" | "receipts" => Ok(Mode::Receipt),
            other => Err(format!("unknown mode '{}', expected expense or receipt", other)),
        }
    }
}

/// Raw completion returned by a provider, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIResponse {
    pub content: String,
    pub model: String,
    pub provider: String,
    pub timestamp: String,
}

/// Application-level envelope handed to the presentation side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> AnalysisResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self
                .error
                .unwrap_or_else(|| "Failed to analyze image".to_string())),
        }
    }
}
