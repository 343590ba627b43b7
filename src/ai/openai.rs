use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::llm::{error_excerpt, VisionModel};
use super::AIResponse;
use crate::config::AppConfig;
use crate::document::Document;
use crate::error::ClientError;

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessageResponse>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
enum Auth {
    /// api.openai.com
    Bearer(String),
    /// Azure deployments
    ApiKey(String),
}

/// Chat-completions client for OpenAI and Azure OpenAI deployments.
pub struct OpenAIClient {
    http: Client,
    endpoint: String,
    auth: Auth,
    model: Option<String>,
    provider: &'static str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

impl OpenAIClient {
    pub fn openai(config: &AppConfig, http: Client) -> Result<Self, ClientError> {
        if config.openai_api_key.is_empty() {
            return Err(ClientError::NotConfigured("OpenAI API key"));
        }
        Ok(Self {
            http,
            endpoint: config.openai_endpoint.clone(),
            auth: Auth::Bearer(config.openai_api_key.clone()),
            model: Some(config.openai_model.clone()),
            provider: "OpenAI",
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    pub fn azure(config: &AppConfig, http: Client) -> Result<Self, ClientError> {
        if config.azure_endpoint.is_empty() {
            return Err(ClientError::NotConfigured("Azure OpenAI endpoint"));
        }
        if config.azure_api_key.is_empty() {
            return Err(ClientError::NotConfigured("Azure OpenAI API key"));
        }
        Ok(Self {
            http,
            endpoint: config.azure_endpoint.clone(),
            auth: Auth::ApiKey(config.azure_api_key.clone()),
            // the deployment in the URL picks the model
            model: None,
            provider: "AzureOpenAI",
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    fn build_request(&self, prompt: &str, document: &Document) -> OpenAIRequest<'_> {
        OpenAIRequest {
            model: self.model.as_deref(),
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: serde_json::json!([
                        {
                            "type": "text",
                            "text": prompt
                        }
                    ]),
                },
                OpenAIMessage {
                    role: "user",
                    content: serde_json::json!([
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": document.data_url()
                            }
                        }
                    ]),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: false,
        }
    }
}

#[async_trait]
impl VisionModel for OpenAIClient {
    async fn complete(&self, prompt: &str, document: &Document) -> Result<AIResponse, ClientError> {
        let request = self.build_request(prompt, document);

        let builder = self.http.post(&self.endpoint).json(&request);
        let builder = match &self.auth {
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::ApiKey(key) => builder.header("api-key", key),
        };

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAIErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| error_excerpt(&body));
            return Err(ClientError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!("no data received from {}", self.provider))
            })?;

        Ok(AIResponse {
            content,
            provider: self.provider.to_string(),
            model: body
                .model
                .or_else(|| self.model.clone())
                .unwrap_or_else(|| "deployment".to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }
}
