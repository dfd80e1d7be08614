use std::time::Duration;

use data_encoding::BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::acquire::AcquiredImage;
use crate::config::Config;
use crate::error::{Result, VisionError};

/// Prompt used when the caller does not supply one: a detailed description
/// request with attention to UI layout, colors, and text.
const DEFAULT_PROMPT: &str = "请详细描述这张图片的内容,特别关注UI设计、布局、颜色、文字等细节";

/// Vision engine backed by the Moonshot Kimi chat-completions API.
///
/// The image travels inline as a base64 data URL inside an OpenAI-style
/// multimodal message; the reply is the plain-text description from
/// `choices[0].message.content`.
pub struct KimiEngine {
    client: Client,
    api_key: String,
    api_url: String,
    default_model: String,
}

// -- OpenAI-compatible request/response types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl KimiEngine {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| VisionError::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            api_url = %config.api_url,
            model = %config.default_model,
            "Kimi engine initialized"
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            default_model: config.default_model.clone(),
        })
    }

    /// Describe an image.  `prompt` and `model` fall back to the defaults
    /// when not supplied.
    pub async fn describe_image(
        &self,
        image: &AcquiredImage,
        prompt: Option<&str>,
        model: Option<&str>,
    ) -> Result<String> {
        let model = model.unwrap_or(&self.default_model);
        let prompt = prompt.unwrap_or(DEFAULT_PROMPT);

        let body = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(image),
                        },
                    },
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            temperature: 1.0,
        };

        debug!(
            model,
            mime_type = image.mime_type,
            image_bytes = image.bytes.len(),
            "invoking Kimi API"
        );

        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::RemoteApi(format!("request failed: {e}")))?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Kimi API error");
            return Err(VisionError::RemoteApi(format!("{status} - {error_text}")));
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| VisionError::RemoteApi(format!("failed to parse response: {e}")))?;

        let content = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| VisionError::RemoteApi("API returned unexpected shape".into()))?;

        info!(response_len = content.len(), model, "image described");
        Ok(content)
    }
}

/// Base64 data URL for inline transport of the image bytes.
fn data_url(image: &AcquiredImage) -> String {
    format!(
        "data:{};base64,{}",
        image.mime_type,
        BASE64.encode(&image.bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_shape() {
        let image = AcquiredImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg",
        };
        assert_eq!(data_url(&image), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn request_serializes_to_wire_shape() {
        let body = ChatRequest {
            model: "kimi-k2.5".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA".to_string(),
                        },
                    },
                    ContentPart::Text {
                        text: "describe".to_string(),
                    },
                ],
            }],
            temperature: 1.0,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "kimi-k2.5");
        assert_eq!(json["temperature"], 1.0);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(json["messages"][0]["content"][1]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["text"], "describe");
    }

    #[test]
    fn response_content_extracted() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"a red square"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        let content = resp.choices.into_iter().next().unwrap().message.content;
        assert_eq!(content.as_deref(), Some("a red square"));
    }

    #[test]
    fn response_without_content_is_none() {
        let json = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices[0].message.content.is_none());

        let json = r#"{"id":"x"}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices.is_empty());
    }
}
