use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::skip_serializing_none;
use tracing::{error, info};

use crate::{config::Config, error::StoryError, photo::DataUrl, pipeline::StoryModel};

const STORY_TEMPERATURE: f32 = 0.7;
const VISION_MAX_TOKENS: u32 = 300;
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

// Inline photos are megabytes of base64; shorten them before they hit the log.
fn truncate_data_urls_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                match val {
                    Value::String(s) if key == "url" && s.starts_with("data:") && s.len() > 100 => {
                        let cut = s.char_indices().nth(50).map_or(s.len(), |(i, _)| i);
                        *val = Value::String(format!("{}...[truncated {} chars]", &s[..cut], s.len() - cut));
                    }
                    _ => truncate_data_urls_in_json(val),
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_data_urls_in_json(val);
            }
        }
        _ => {}
    }
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    vision_model: String,
    image_model: String,
}

impl OpenAiClient {
    /// `None` when no key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            client: Client::new(),
            api_key,
            base_url: config.api_base.clone(),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T, StoryError> {
        let url = format!("{}/{}", self.base_url, path);
        info!("🔗 Making request to: {}", url);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let mut logged = serde_json::to_value(body).unwrap_or_default();
            truncate_data_urls_in_json(&mut logged);
            tracing::debug!("📤 Request body: {}", logged);
        }

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(StoryError::Provider {
                status: status.as_u16(),
                message: provider_error_message(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| StoryError::Provider {
            status: status.as_u16(),
            message: format!("unexpected response shape: {e}"),
        })
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, StoryError> {
        let parsed: ChatResponse = self.post("chat/completions", request).await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StoryError::Provider { status: 200, message: "no choices in response".into() })
    }
}

#[async_trait]
impl StoryModel for OpenAiClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, StoryError> {
        info!("Generating story text with {}...", self.text_model);
        let request = ChatRequest {
            model: &self.text_model,
            messages: vec![
                ChatMessage { role: "system", content: json!(system) },
                ChatMessage { role: "user", content: json!(user) },
            ],
            temperature: Some(STORY_TEMPERATURE),
            max_tokens: None,
            response_format: Some(json!({ "type": "json_object" })),
        };
        let content = self.chat(&request).await?;
        info!("✅ Story text received ({} chars)", content.len());
        Ok(content)
    }

    async fn describe_photo(&self, instruction: &str, photo: &DataUrl) -> Result<String, StoryError> {
        info!("Describing {} photo ({} bytes) with {}...", photo.media_type(), photo.bytes().len(), self.vision_model);
        let request = ChatRequest {
            model: &self.vision_model,
            messages: vec![ChatMessage {
                role: "user",
                content: json!([
                    { "type": "text", "text": instruction },
                    { "type": "image_url", "image_url": { "url": photo.to_string() } },
                ]),
            }],
            temperature: None,
            max_tokens: Some(VISION_MAX_TOKENS),
            response_format: None,
        };
        self.chat(&request).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, StoryError> {
        info!("Generating illustration with {}...", self.image_model);
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
        };
        let parsed: ImageResponse = self.post("images/generations", &request).await?;
        parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| StoryError::Provider { status: 200, message: "no image url in response".into() })
    }
}

fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_default()
}

// --- Wire types ---

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}
