//! API-based grouper using OpenAI-compatible or Anthropic endpoints.
//!
//! Makes exactly one request per call; retry and backoff belong to the
//! caller so attempts can be counted and cancelled per source.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use trend_types::{GrouperProvider, GrouperSettings};

use crate::{GroupingError, ThematicGrouper, TitleGroup};

/// Wire protocol spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {base}/chat/completions` with bearer auth
    OpenAi,
    /// `POST {base}/messages` with `x-api-key`
    Anthropic,
}

/// Configuration for API-based grouper.
#[derive(Debug, Clone)]
pub struct ApiGrouperConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    pub flavor: ApiFlavor,

    /// Model to use (e.g., "gpt-4o", "claude-3-5-haiku-latest")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token cap (Anthropic requires one)
    pub max_tokens: u32,
}

impl ApiGrouperConfig {
    /// Create config for OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            flavor: ApiFlavor::OpenAi,
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    /// Create config for Claude API.
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            flavor: ApiFlavor::Anthropic,
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from loaded settings.
    ///
    /// Fails for the keyword provider and when no API key is configured.
    pub fn from_settings(settings: &GrouperSettings) -> Result<Self, GroupingError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GroupingError::Config("no API key configured".to_string()))?;

        let config = match settings.provider {
            GrouperProvider::OpenAi => Self::openai(api_key, settings.model.clone()),
            GrouperProvider::Anthropic => Self::claude(api_key, settings.model.clone()),
            GrouperProvider::Keyword => {
                return Err(GroupingError::Config(
                    "keyword provider has no API endpoint".to_string(),
                ));
            }
        };

        let config = config.with_timeout(Duration::from_secs(settings.timeout_secs));
        Ok(match &settings.api_base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        })
    }
}

/// Expected response body.
#[derive(Debug, Deserialize)]
struct GroupingResponse {
    clusters: Vec<TitleGroup>,
}

/// API-based grouper implementation.
pub struct ApiGrouper {
    client: Client,
    config: ApiGrouperConfig,
}

impl ApiGrouper {
    /// Create a new API grouper.
    pub fn new(config: ApiGrouperConfig) -> Result<Self, GroupingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GroupingError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build the grouping prompt for one batch of titles.
    fn build_prompt(&self, source: &str, titles: &[String]) -> Result<String, GroupingError> {
        let titles_json = serde_json::to_string_pretty(titles)
            .map_err(|e| GroupingError::Parse(e.to_string()))?;

        Ok(format!(
            r#"You are a research assistant specializing in thematic analysis of social media content.

Task: Analyze these post titles from {source} and group them into meaningful topic clusters.

Instructions:
1. Identify common themes, technologies, concepts, or discussion topics
2. Group similar titles together into clusters
3. Create specific, descriptive cluster names that name the concrete models, companies, technologies or events discussed
4. Assign every title to exactly one cluster and copy each title exactly as given
5. Aim for 5-15 clusters depending on content diversity

Titles to analyze:
{titles_json}

Provide your response in JSON format:
{{
  "clusters": [
    {{"cluster_name": "Specific cluster name", "titles": ["title 1", "title 2"]}}
  ]
}}"#
        ))
    }

    /// Make a single API request.
    async fn make_request(&self, prompt: &str) -> Result<String, GroupingError> {
        match self.config.flavor {
            ApiFlavor::Anthropic => self.make_anthropic_request(prompt).await,
            ApiFlavor::OpenAi => self.make_openai_request(prompt).await,
        }
    }

    /// Make OpenAI-compatible API request.
    async fn make_openai_request(&self, prompt: &str) -> Result<String, GroupingError> {
        #[derive(Serialize)]
        struct OpenAIRequest {
            model: String,
            messages: Vec<OpenAIMessage>,
            temperature: f32,
            response_format: OpenAIResponseFormat,
        }

        #[derive(Serialize)]
        struct OpenAIMessage {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct OpenAIResponseFormat {
            #[serde(rename = "type")]
            format_type: String,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: String,
        }

        let request = OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            response_format: OpenAIResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;

        let response_body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| GroupingError::Parse(e.to_string()))?;

        response_body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| GroupingError::Parse("No choices in response".to_string()))
    }

    /// Make Anthropic API request.
    async fn make_anthropic_request(&self, prompt: &str) -> Result<String, GroupingError> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            temperature: f32,
            messages: Vec<AnthropicMessage>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GroupingError::Parse(e.to_string()))?;

        response_body
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| GroupingError::Parse("No content in response".to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> GroupingError {
    if e.is_timeout() {
        GroupingError::Timeout
    } else {
        GroupingError::Api(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GroupingError> {
    if response.status() == 429 {
        return Err(GroupingError::RateLimitExceeded);
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GroupingError::Api(format!("HTTP {}: {}", status, body)));
    }

    Ok(response)
}

/// Parse the model's text into title groups.
///
/// Accepts the `{"clusters": [...]}` object or a bare array of groups.
fn parse_groups(response: &str) -> Result<Vec<TitleGroup>, GroupingError> {
    let object = extract_json(response);
    if let Ok(parsed) = serde_json::from_str::<GroupingResponse>(&object) {
        return Ok(parsed.clusters);
    }

    let array = extract_array(response);
    serde_json::from_str::<Vec<TitleGroup>>(&array)
        .map_err(|e| GroupingError::Parse(format!("Failed to parse clusters JSON: {}", e)))
}

/// Strip a markdown code fence if present.
fn strip_fence(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim();
        }
    }

    text
}

/// Extract JSON object from text (handles markdown code blocks).
fn extract_json(text: &str) -> String {
    let text = strip_fence(text);

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

/// Extract JSON array from text.
fn extract_array(text: &str) -> String {
    let text = strip_fence(text);

    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

#[async_trait]
impl ThematicGrouper for ApiGrouper {
    async fn group(
        &self,
        source: &str,
        titles: &[String],
    ) -> Result<Vec<TitleGroup>, GroupingError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = self.build_prompt(source, titles)?;
        debug!(
            source,
            titles = titles.len(),
            model = %self.config.model,
            "Calling grouping API"
        );

        let response = self.make_request(&prompt).await?;
        parse_groups(&response)
    }
}
