//! Text generation through the Ollama HTTP API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::{ModelError, ModelResult};
use crate::GeneratorModel;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Blocking client for `POST {endpoint}/api/generate`.
#[derive(Debug)]
pub struct OllamaGenerator {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GeneratorConfig) -> ModelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::ProviderNotAvailable {
                provider: "ollama".to_string(),
                reason: e.to_string(),
            })?;

        let url = format!("{}/api/generate", config.endpoint.trim_end_matches('/'));
        info!("Generator '{}' via {}", config.model, url);

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl GeneratorModel for OllamaGenerator {
    fn generate(&self, prompt: &str) -> ModelResult<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!("Sending {} prompt chars to {}", prompt.chars().count(), self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ModelError::generation_failed(&self.model, e.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .map_err(|e| ModelError::generation_failed(&self.model, e.to_string()))?;

        Ok(body.response.trim().to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
