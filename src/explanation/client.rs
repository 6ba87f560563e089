use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use url::Url;

use super::ExplanationError;

/// Generated text plus how long the call took
#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
    pub response_time_ms: u64,
}

/// Produces natural-language text for a prompt
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Generated, ExplanationError>>;
}

#[derive(Serialize, Debug)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Serialize, Debug)]
struct InferencePayload<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

/// Client for a Hugging Face style text-generation inference endpoint
pub struct HuggingFaceClient {
    url: Url,
    api_key: String,
    model_name: String,
    client: reqwest::Client,
}

impl HuggingFaceClient {
    pub fn new(
        url: Url,
        api_key: String,
        model_name: String,
        timeout: Duration,
    ) -> Result<Self, ExplanationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            api_key,
            model_name,
            client,
        })
    }

    async fn call(&self, prompt: &str) -> Result<Generated, ExplanationError> {
        let started = Instant::now();

        let payload = InferencePayload {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: 600,
                temperature: 0.7,
                top_p: 0.9,
                do_sample: true,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let response_time_ms = started.elapsed().as_millis() as u64;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            error!("Text generation API error {}: {}", status, body);
            return Err(ExplanationError::Api { status, body });
        }

        let data: Value = response.json().await?;
        let text = extract_generated_text(&data).ok_or(ExplanationError::EmptyResponse)?;

        info!(
            "Generated explanation with {} in {} ms",
            self.model_name, response_time_ms
        );

        Ok(Generated {
            text,
            response_time_ms,
        })
    }
}

impl TextGenerator for HuggingFaceClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Generated, ExplanationError>> {
        self.call(prompt).boxed()
    }
}

/// The endpoint answers with either `[{generated_text}]` or `{generated_text}`
fn extract_generated_text(data: &Value) -> Option<String> {
    let item = match data {
        Value::Array(items) => items.first()?,
        other => other,
    };

    item.get("generated_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
