use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::llm::{error_excerpt, VisionModel};
use super::AIResponse;
use crate::config::AppConfig;
use crate::document::Document;
use crate::error::ClientError;

const USER_INSTRUCTION: &str = "Extract the data from this document.";

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessageResponse>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

/// Local Llama vision models served by Ollama.
pub struct OllamaClient {
    http: Client,
    url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl OllamaClient {
    pub fn new(config: &AppConfig, http: Client) -> Self {
        Self {
            http,
            url: format!("{}/api/chat", config.ollama_url.trim_end_matches('/')),
            model: config.ollama_model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl VisionModel for OllamaClient {
    async fn complete(&self, prompt: &str, document: &Document) -> Result<AIResponse, ClientError> {
        let request = OllamaRequest {
            model: &self.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: prompt.to_string(),
                    images: Vec::new(),
                },
                OllamaMessage {
                    role: "user",
                    content: USER_INSTRUCTION.to_string(),
                    images: vec![document.to_base64()],
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                top_p: self.top_p,
                num_predict: self.max_tokens,
            },
        };

        let response = self.http.post(&self.url).json(&request).send().await.map_err(|e| {
            ClientError::Network(format!("Ollama request failed: {}. Is Ollama running?", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Provider {
                status: status.as_u16(),
                message: error_excerpt(&body),
            });
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let content = body
            .message
            .map(|m| m.content)
            .ok_or_else(|| ClientError::InvalidResponse("no message from Ollama".to_string()))?;

        Ok(AIResponse {
            content,
            provider: "Ollama".to_string(),
            model: body.model.unwrap_or_else(|| self.model.clone()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "Ollama"
    }
}
