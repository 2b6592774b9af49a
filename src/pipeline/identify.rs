use std::time::Duration;

use log::{debug, info};
use tokio::time::timeout;

use super::types::DetectedDish;
use super::{prompts, strip_code_fences, StageError};
use crate::providers::ModelClient;

const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Stage 1: one image-understanding call per meal photo, parsed into the
/// detected dish list. Any call or parse failure here fails the whole run.
pub struct DishIdentificationStage {
    client: Box<dyn ModelClient>,
    timeout: Duration,
}

impl DishIdentificationStage {
    pub fn new(client: Box<dyn ModelClient>) -> Self {
        Self {
            client,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn identify(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Vec<DetectedDish>, StageError> {
        let call = self
            .client
            .generate_from_image(prompts::stage1_prompt(), image, mime_type);
        let raw = timeout(self.timeout, call)
            .await
            .map_err(|_| StageError::Timeout(self.timeout.as_secs()))?
            .map_err(StageError::ModelCall)?;

        let cleaned = strip_code_fences(&raw);
        debug!("Stage 1 response: {}", cleaned);
        if cleaned.is_empty() {
            return Err(StageError::EmptyResponse);
        }

        let dishes: Vec<DetectedDish> = serde_json::from_str(&cleaned)?;
        info!("Stage 1 complete: Detected {} dishes", dishes.len());
        Ok(dishes)
    }
}
