//! Canned-response model client used by pipeline tests.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::traits::ModelClient;

/// Test double for [`ModelClient`] that replays fixed responses. Text calls
/// can be keyed on a prompt substring (usually the dish name) so individual
/// dishes can succeed, fail or stall independently.
#[derive(Clone)]
pub struct CannedModelClient {
    image: Result<String, String>,
    image_delay: Option<Duration>,
    text_default: Result<String, String>,
    text_rules: Vec<(String, Result<String, String>)>,
    text_delays: Vec<(String, Duration)>,
}

impl CannedModelClient {
    /// Every call returns `response`.
    pub fn returning(response: &str) -> Self {
        Self {
            image: Ok(response.to_string()),
            image_delay: None,
            text_default: Ok(response.to_string()),
            text_rules: Vec::new(),
            text_delays: Vec::new(),
        }
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            image: Err(message.to_string()),
            image_delay: None,
            text_default: Err(message.to_string()),
            text_rules: Vec::new(),
            text_delays: Vec::new(),
        }
    }

    pub fn with_image_response(mut self, response: &str) -> Self {
        self.image = Ok(response.to_string());
        self
    }

    /// The image call sleeps for `delay` before responding.
    pub fn with_image_delay(mut self, delay: Duration) -> Self {
        self.image_delay = Some(delay);
        self
    }

    /// Text calls whose prompt contains `substring` return `response`.
    pub fn with_text_rule(mut self, substring: &str, response: Result<&str, &str>) -> Self {
        self.text_rules.push((
            substring.to_string(),
            response.map(str::to_string).map_err(str::to_string),
        ));
        self
    }

    /// Text calls whose prompt contains `substring` sleep for `delay` before
    /// responding.
    pub fn with_text_delay(mut self, substring: &str, delay: Duration) -> Self {
        self.text_delays.push((substring.to_string(), delay));
        self
    }

    pub fn boxed(self) -> Box<dyn ModelClient> {
        Box::new(self)
    }

    fn materialize(outcome: &Result<String, String>) -> Result<String> {
        outcome.clone().map_err(|message| anyhow!(message))
    }
}

#[async_trait]
impl ModelClient for CannedModelClient {
    async fn generate_from_image(
        &self,
        _prompt: &str,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<String> {
        if let Some(delay) = self.image_delay {
            tokio::time::sleep(delay).await;
        }
        Self::materialize(&self.image)
    }

    async fn generate_from_text(&self, prompt: &str) -> Result<String> {
        for (substring, delay) in &self.text_delays {
            if prompt.contains(substring.as_str()) {
                tokio::time::sleep(*delay).await;
                break;
            }
        }
        for (substring, outcome) in &self.text_rules {
            if prompt.contains(substring.as_str()) {
                return Self::materialize(outcome);
            }
        }
        Self::materialize(&self.text_default)
    }

    fn model_name(&self) -> &str {
        "canned"
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        Box::new(self.clone())
    }
}
