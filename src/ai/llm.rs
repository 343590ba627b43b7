use async_trait::async_trait;
use std::time::Duration;

use super::{AIResponse, AbortSignal};
use crate::config::{AppConfig, LLMProvider};
use crate::document::Document;
use crate::error::ClientError;

/// A vision-capable completion endpoint.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// One attempt, no retry: `prompt` goes in as the system message, `document` as an image.
    async fn complete(&self, prompt: &str, document: &Document) -> Result<AIResponse, ClientError>;

    fn provider_name(&self) -> &'static str;
}

pub fn client_for(config: &AppConfig) -> Result<Box<dyn VisionModel>, ClientError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;

    let client: Box<dyn VisionModel> = match config.llm_provider {
        LLMProvider::OpenAI => Box::new(super::openai::OpenAIClient::openai(config, http)?),
        LLMProvider::AzureOpenAI => Box::new(super::openai::OpenAIClient::azure(config, http)?),
        LLMProvider::Ollama => Box::new(super::ollama::OllamaClient::new(config, http)),
    };
    Ok(client)
}

/// Runs `model.complete` unless `signal` fires first.
pub async fn request_completion(
    model: &dyn VisionModel,
    prompt: &str,
    document: &Document,
    signal: &AbortSignal,
) -> Result<AIResponse, ClientError> {
    if signal.is_aborted() {
        return Err(ClientError::Aborted);
    }

    log::info!(
        "Sending {} ({}, {} bytes) to {}",
        document.name,
        document.kind.mime(),
        document.len(),
        model.provider_name()
    );

    tokio::select! {
        biased;
        _ = signal.aborted() => {
            log::debug!("Request for {} aborted", document.name);
            Err(ClientError::Aborted)
        }
        result = model.complete(prompt, document) => {
            if let Err(ref e) = result {
                log::error!("{} request failed: {}", model.provider_name(), e);
            }
            result
        }
    }
}

/// First chars of an error body, enough to identify the failure.
pub(crate) fn error_excerpt(body: &str) -> String {
    const LIMIT: usize = 500;
    let body = body.trim();
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AbortController;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SlowModel {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VisionModel for SlowModel {
        async fn complete(&self, _: &str, _: &Document) -> Result<AIResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(AIResponse {
                content: "{}".into(),
                model: "slow".into(),
                provider: "Test".into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "Test"
        }
    }

    fn document() -> Document {
        Document::from_bytes("r.pdf", b"%PDF-1.4".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn aborted_before_call_never_reaches_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = SlowModel { calls: calls.clone() };
        let controller = AbortController::new();
        controller.abort();

        let result = request_completion(&model, "p", &document(), &controller.signal()).await;
        assert!(matches!(result, Err(ClientError::Aborted)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abort_during_call_resolves_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = SlowModel { calls: calls.clone() };
        let controller = AbortController::new();
        let signal = controller.signal();

        let aborter = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            controller.abort();
        };
        let doc = document();
        let (result, _) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(request_completion(&model, "p", &doc, &signal), aborter) },
        )
        .await
        .expect("abort should win over the slow model");

        assert!(matches!(result, Err(ClientError::Aborted)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn excerpt_is_bounded() {
        assert_eq!(error_excerpt("  short "), "short");
        let long = "x".repeat(600);
        assert_eq!(error_excerpt(&long).chars().count(), 501);
    }
}
