pub mod agents;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::LlmSettings;
use crate::error::{Error, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One single-turn completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub prompt: String,
}

/// A text-generation service.
///
/// Implementations return `Error::LlmUnavailable` when the service cannot be
/// reached and `Error::Llm` for any other failure.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Client for an Anthropic-style Messages endpoint.
pub struct MessagesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl MessagesClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;
        if settings.api_key.is_none() {
            log::warn!("ANTHROPIC_API_KEY is not set; LLM requests will be unauthenticated");
        }
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
        })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for MessagesClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let mut builder = self
            .http
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        log::debug!(
            "POST {url} model={} max_tokens={} prompt_chars={}",
            request.model,
            request.max_tokens,
            request.prompt.len()
        );
        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| Error::LlmUnavailable(format!("no response from {url} within {:?}", self.timeout)))??;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Llm(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("Failed to parse LLM response: {e}")))?;
        Ok(parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

/// Extract the body of the first fenced block, dropping its language tag.
/// Text without a fence is returned trimmed.
pub fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();
    let Some(open) = s.find("```") else {
        return s;
    };
    let rest = &s[open + 3..];
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str, timeout: Duration) -> LlmSettings {
        LlmSettings {
            api_key: Some("test-key".into()),
            base_url: base_url.to_string(),
            model: "claude-test".into(),
            timeout,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "claude-test".into(),
            max_tokens: 100,
            temperature: 0.2,
            prompt: "Summarize {}".into(),
        }
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 100,
                "temperature": 0.2,
                "messages": [{"role": "user", "content": "Summarize {}"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "content": [{"type": "text", "text": "# Report\nAll good."}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = MessagesClient::new(&settings(&server.uri(), Duration::from_secs(5))).unwrap();
        let text = client.generate(&request()).await.unwrap();
        assert_eq!(text, "# Report\nAll good.");
    }

    #[tokio::test]
    async fn test_http_error_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let client = MessagesClient::new(&settings(&server.uri(), Duration::from_secs(5))).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Llm(ref m) if m.contains("400")), "got {err:?}");
        assert!(!err.is_connectivity());
    }

    #[tokio::test]
    async fn test_slow_service_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            MessagesClient::new(&settings(&server.uri(), Duration::from_millis(200))).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.is_connectivity(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_refused_connection_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = MessagesClient::new(&settings(
            &format!("http://127.0.0.1:{port}"),
            Duration::from_secs(2),
        ))
        .unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.is_connectivity(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_malformed_body_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = MessagesClient::new(&settings(&server.uri(), Duration::from_secs(5))).unwrap();
        assert!(matches!(
            client.generate(&request()).await,
            Err(Error::Llm(_))
        ));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(
            strip_code_fences("Here you go:\n```python\nfig1 = 1\n```\nEnjoy"),
            "fig1 = 1"
        );
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }
}
