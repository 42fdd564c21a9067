// src/analysis/openai.rs
use crate::analysis::narrative::{NarrativePrompt, NarrativeService};
use crate::config::OpenAiSettings;
use crate::utils::error::SummaryError;
use crate::utils::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completions client for OpenAI or any compatible endpoint.
pub struct OpenAiService {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl OpenAiService {
    pub fn new(settings: &OpenAiSettings) -> Result<Self, SummaryError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| SummaryError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
            temperature: settings.temperature,
            retry: settings.retry,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a NarrativePrompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        }
    }

    async fn complete_once(&self, prompt: &NarrativePrompt) -> Result<String, SummaryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SummaryError::Http { status, body });
        }
        reply_content(&body)
    }
}

impl NarrativeService for OpenAiService {
    async fn complete(&self, prompt: &NarrativePrompt) -> Result<String, SummaryError> {
        tracing::debug!(
            "Sending {} prompt chars to {} ({})",
            prompt.system.len() + prompt.user.len(),
            self.base_url,
            self.model
        );
        self.retry
            .run("chat completion", SummaryError::is_transient, || self.complete_once(prompt))
            .await
    }
}

/// Message content of the first choice of a chat-completions response body.
fn reply_content(body: &str) -> Result<String, SummaryError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| SummaryError::MalformedResponse(format!("unexpected completion payload: {}", e)))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(SummaryError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: Option<&str>) -> OpenAiSettings {
        OpenAiSettings {
            api_key: api_key.map(str::to_string),
            model: "gpt-test".to_string(),
            base_url: "http://localhost:9/v1".to_string(),
            temperature: 0.2,
            max_input_chars: 100,
            retry: RetryPolicy::new(1, Duration::from_millis(1)),
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(OpenAiService::new(&settings(None)), Err(SummaryError::NotConfigured(_))));
        assert!(OpenAiService::new(&settings(Some("sk-test"))).is_ok());
    }

    #[test]
    fn test_request_body_shape() {
        let service = OpenAiService::new(&settings(Some("sk-test"))).unwrap();
        let prompt = NarrativePrompt {
            system: "sys".to_string(),
            user: "compare these".to_string(),
        };
        let json = serde_json::to_value(service.request_body(&prompt)).unwrap();
        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "compare these");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_reply_content() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"ok\":true}"}}]}"#;
        assert_eq!(reply_content(body).unwrap(), "{\"ok\":true}");

        assert!(matches!(reply_content(r#"{"choices":[]}"#), Err(SummaryError::EmptyResponse)));
        assert!(matches!(
            reply_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(SummaryError::EmptyResponse)
        ));
        assert!(matches!(reply_content("<html>"), Err(SummaryError::MalformedResponse(_))));
    }
}
