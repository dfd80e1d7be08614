use async_trait::async_trait;
use tracing::{error, info};

use super::{Tool, ToolOutput};
use crate::acquire;
use crate::config::Limits;
use crate::error::{Result, VisionError};
use crate::llm::KimiEngine;

/// The `analyze_image` tool: acquires an image from a path or URL and asks
/// the Kimi vision model to describe it.
pub struct AnalyzeImageTool {
    engine: KimiEngine,
    client: reqwest::Client,
    limits: Limits,
}

impl AnalyzeImageTool {
    pub fn new(engine: KimiEngine, client: reqwest::Client, limits: Limits) -> Self {
        Self {
            engine,
            client,
            limits,
        }
    }

    async fn run(&self, params: &serde_json::Value) -> Result<String> {
        let image_path = params
            .get("image_path")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VisionError::Validation("image_path 参数不能为空".into()))?;
        let prompt = params.get("prompt").and_then(|v| v.as_str());
        let model = params.get("model").and_then(|v| v.as_str());

        let image = acquire::acquire(image_path, &self.limits, &self.client).await?;
        info!(
            mime_type = image.mime_type,
            bytes = image.bytes.len(),
            "image acquired"
        );

        self.engine.describe_image(&image, prompt, model).await
    }
}

#[async_trait]
impl Tool for AnalyzeImageTool {
    fn name(&self) -> &str {
        "analyze_image"
    }

    fn description(&self) -> &str {
        "使用 Kimi K2.5 分析图片内容,支持本地文件路径或图片 URL。支持格式: JPG, PNG, GIF, WebP。最大文件大小: 10MB。"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "image_path": {
                    "type": "string",
                    "description": "图片文件路径或 URL"
                },
                "prompt": {
                    "type": "string",
                    "description": "对图片的具体问题或要求(可选)"
                },
                "model": {
                    "type": "string",
                    "description": "使用的模型名称(可选,默认: kimi-k2.5)",
                    "default": "kimi-k2.5"
                }
            },
            "required": ["image_path"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> ToolOutput {
        match self.run(&params).await {
            Ok(description) => ToolOutput::ok(description),
            Err(e) => {
                error!(error = %e, "image analysis failed");
                ToolOutput::error(format!("分析图片时出错: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::download;
    use crate::config::Config;

    fn test_tool() -> AnalyzeImageTool {
        let config = Config {
            api_key: "test-key".to_string(),
            api_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            default_model: "kimi-k2.5".to_string(),
            limits: Limits::default(),
        };
        AnalyzeImageTool::new(
            KimiEngine::new(&config).unwrap(),
            download::http_client().unwrap(),
            config.limits,
        )
    }

    #[test]
    fn schema_requires_image_path() {
        let tool = test_tool();
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"][0], "image_path");
        assert!(schema["properties"]["prompt"].is_object());
        assert!(schema["properties"]["model"].is_object());
    }

    #[tokio::test]
    async fn missing_image_path_is_caught() {
        let tool = test_tool();
        let out = tool.execute(serde_json::json!({})).await;
        assert!(!out.success);
        assert!(out.output.starts_with("分析图片时出错: "), "{}", out.output);
    }

    #[tokio::test]
    async fn unsafe_url_is_caught() {
        let tool = test_tool();
        let out = tool
            .execute(serde_json::json!({"image_path": "http://localhost/x.png"}))
            .await;
        assert!(!out.success);
        assert!(out.output.starts_with("分析图片时出错: "), "{}", out.output);
    }

    #[tokio::test]
    async fn missing_file_is_caught() {
        let tool = test_tool();
        let out = tool
            .execute(serde_json::json!({"image_path": "/tmp/kimi-vision-nope.jpg"}))
            .await;
        assert!(!out.success);
        assert!(out.output.contains("分析图片时出错"), "{}", out.output);
    }
}
