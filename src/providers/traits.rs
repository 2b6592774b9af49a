use anyhow::Result;
use async_trait::async_trait;

/// Seam to the external generative model. One method per call shape the
/// pipeline makes: image-plus-prompt for dish identification, text-only for
/// dish breakdown. Both return the raw response text; parsing and validation
/// happen at the calling stage.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String>;

    async fn generate_from_text(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn ModelClient>;
}

impl Clone for Box<dyn ModelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
