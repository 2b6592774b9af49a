use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use crate::providers::traits::ModelClient;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini client speaking the generateContent REST API. Images are
/// sent inline as base64 blobs alongside the prompt text.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    async fn generate(&self, parts: Value, generation_config: Value) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": parts
                }],
                "generationConfig": generation_config
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API returned {}: {}", status, body));
        }

        let response_json: Value = response.json().await?;
        debug!("Gemini raw response: {}", response_json);

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid response format"))
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        let parts = json!([
            { "text": prompt },
            {
                "inline_data": {
                    "mime_type": mime_type,
                    "data": STANDARD.encode(image)
                }
            }
        ]);
        // Vision call runs at default temperature, matching the dish
        // identification contract.
        let config = json!({
            "topK": 32,
            "topP": 1.0,
            "maxOutputTokens": 2048
        });

        self.generate(parts, config).await
    }

    async fn generate_from_text(&self, prompt: &str) -> Result<String> {
        let parts = json!([{ "text": prompt }]);
        // Low temperature keeps ingredient quantities deterministic.
        let config = json!({
            "temperature": 0.3,
            "topK": 32,
            "topP": 1.0,
            "maxOutputTokens": 1024
        });

        self.generate(parts, config).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        Box::new(self.clone())
    }
}
