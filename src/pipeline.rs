//! Two-stage story generation: the story text, then a best-effort illustration.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::{
    error::StoryError,
    models::{DraftStory, Illustration, StoryRequest, StoryResult},
    photo::DataUrl,
    prompts,
};

/// The provider calls the pipeline depends on.
#[async_trait]
pub trait StoryModel: Send + Sync {
    /// Chat completion constrained to a JSON object; returns the raw message content.
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, StoryError>;
    /// Vision chat call over an inline photo; returns free-form text.
    async fn describe_photo(&self, instruction: &str, photo: &DataUrl) -> Result<String, StoryError>;
    /// One square image; returns its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, StoryError>;
}

#[derive(Debug, Deserialize)]
struct StoryPayload {
    #[serde(default)]
    story: Option<String>,
    #[serde(default, rename = "imagePrompt")]
    image_prompt: Option<String>,
}

/// Parses the Stage 1 reply into a draft, rejecting anything but a JSON object
/// with both fields filled.
pub fn parse_story_reply(raw: &str) -> Result<DraftStory, StoryError> {
    let payload: StoryPayload = serde_json::from_str(raw.trim())
        .map_err(|e| StoryError::MalformedResponse(e.to_string()))?;

    let filled = |field: Option<String>, name: &'static str| {
        field
            .filter(|v| !v.trim().is_empty())
            .ok_or(StoryError::MissingContent(name))
    };

    Ok(DraftStory {
        story: filled(payload.story, "story")?,
        image_prompt: filled(payload.image_prompt, "imagePrompt")?,
    })
}

/// Stage 1.
pub async fn write_story(model: &dyn StoryModel, req: &StoryRequest) -> Result<DraftStory, StoryError> {
    let system = prompts::story_system_instruction(req);
    let user = prompts::story_user_instruction(req);
    let raw = model.complete_json(&system, &user).await?;
    parse_story_reply(&raw).map_err(|e| {
        error!("❌ Story reply rejected: {}", e);
        e
    })
}

/// Stage 2. Never fails: any provider error leaves the story without a picture.
pub async fn illustrate(model: &dyn StoryModel, photo: &DataUrl) -> Option<Illustration> {
    let attempt = async {
        let cartoon_description = model.describe_photo(prompts::VISION_INSTRUCTION, photo).await?;
        let url = model.generate_image(&prompts::illustration_prompt(&cartoon_description)).await?;
        Ok::<_, StoryError>(Illustration { cartoon_description, url })
    };

    match attempt.await {
        Ok(illustration) => {
            info!("✅ Illustration generated: {}", illustration.url);
            Some(illustration)
        }
        Err(e) => {
            error!("❌ Illustration failed, showing placeholder: {}", e);
            None
        }
    }
}

/// Runs both stages. `model` is `None` when no API key is configured.
pub async fn generate(model: Option<&dyn StoryModel>, req: &StoryRequest) -> Result<StoryResult, StoryError> {
    let model = model.ok_or(StoryError::MissingApiKey)?;
    info!("🚀 Generating story for {} ({})", req.child_name, req.child_gender);

    let draft = write_story(model, req).await?;
    info!("✅ Story drafted ({} chars)", draft.story.len());

    let illustration = illustrate(model, &req.child_photo).await;
    let result = StoryResult::assemble(draft, illustration);
    debug!(
        image_prompt = %result.image_prompt,
        cartoon_description = ?result.cartoon_description,
        "Story assembled"
    );
    Ok(result)
}
