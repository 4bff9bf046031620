use std::time::Instant;

use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_bedrockruntime::{config::Region, Client};
use aws_smithy_types::{error::display::DisplayErrorContext, Blob};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{GenerationConfig, TextGenerator};
use crate::config::BedrockConfig;
use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Nova,
    Titan,
    Anthropic,
}

impl ModelFamily {
    pub fn from_model_id(model_id: &str) -> Self {
        let id = model_id.to_ascii_lowercase();
        if id.contains("anthropic") {
            ModelFamily::Anthropic
        } else if id.contains("titan") {
            ModelFamily::Titan
        } else {
            ModelFamily::Nova
        }
    }
}

#[derive(Clone)]
pub struct BedrockGenerator {
    client: Client,
    model_id: String,
    family: ModelFamily,
}

impl BedrockGenerator {
    pub async fn new(cfg: &BedrockConfig) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        Ok(Self {
            client: Client::new(&shared),
            model_id: cfg.model_id.clone(),
            family: ModelFamily::from_model_id(&cfg.model_id),
        })
    }
}

#[async_trait]
impl TextGenerator for BedrockGenerator {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        let body = request_body(self.family, prompt, config);
        let bytes = serde_json::to_vec(&body).map_err(GenerationError::Encode)?;

        let started = Instant::now();
        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(bytes))
            .send()
            .await
            .map_err(|e| GenerationError::Invoke(DisplayErrorContext(&e).to_string()))?;
        debug!(
            model_id = %self.model_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bedrock invoke_model returned"
        );

        let value: Value =
            serde_json::from_slice(output.body().as_ref()).map_err(GenerationError::Body)?;
        extract_output_text(&value).ok_or_else(|| {
            warn!(model_id = %self.model_id, "unknown bedrock response structure");
            GenerationError::UnknownResponseShape
        })
    }
}

/// Request body in the shape the model family expects.
pub fn request_body(family: ModelFamily, prompt: &str, config: &GenerationConfig) -> Value {
    match family {
        ModelFamily::Nova => json!({
            "messages": [{ "role": "user", "content": [{ "text": prompt }] }],
            "inferenceConfig": {
                "maxTokens": config.max_tokens,
                "temperature": config.temperature,
                "topP": config.top_p,
            }
        }),
        ModelFamily::Titan => json!({
            "inputText": prompt,
            "textGenerationConfig": {
                "maxTokenCount": config.max_tokens,
                "temperature": config.temperature,
                "topP": config.top_p,
                "stopSequences": [],
            }
        }),
        ModelFamily::Anthropic => json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "messages": [{ "role": "user", "content": prompt }],
        }),
    }
}

/// Pulls the generated text out of any of the known response layouts.
pub fn extract_output_text(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/output/message/content/0/text"),
        body.pointer("/content/0/text"),
        body.pointer("/results/0/outputText"),
        body.get("outputText"),
        body.get("completion"),
        body.get("generated_text"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod bedrock_tests {
    use super::*;

    #[test]
    fn family_from_model_id() {
        assert_eq!(
            ModelFamily::from_model_id("us.amazon.nova-micro-v1:0"),
            ModelFamily::Nova
        );
        assert_eq!(
            ModelFamily::from_model_id("amazon.titan-text-express-v1"),
            ModelFamily::Titan
        );
        assert_eq!(
            ModelFamily::from_model_id("apac.anthropic.claude-3-sonnet-20240229-v1:0"),
            ModelFamily::Anthropic
        );
    }

    #[test]
    fn nova_body_carries_inference_config() {
        let body = request_body(ModelFamily::Nova, "献立", &GenerationConfig::default());
        assert_eq!(body["messages"][0]["content"][0]["text"], "献立");
        assert_eq!(body["inferenceConfig"]["maxTokens"], 2048);
    }

    #[test]
    fn titan_body_uses_input_text() {
        let body = request_body(ModelFamily::Titan, "p", &GenerationConfig::default());
        assert_eq!(body["inputText"], "p");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 2048);
    }

    #[test]
    fn extracts_text_from_each_layout() {
        let nova = json!({ "output": { "message": { "content": [{ "text": "nova" }] } } });
        let claude = json!({ "content": [{ "type": "text", "text": "claude" }] });
        let titan = json!({ "results": [{ "outputText": "titan" }] });
        let flat = json!({ "completion": "flat" });
        assert_eq!(extract_output_text(&nova).as_deref(), Some("nova"));
        assert_eq!(extract_output_text(&claude).as_deref(), Some("claude"));
        assert_eq!(extract_output_text(&titan).as_deref(), Some("titan"));
        assert_eq!(extract_output_text(&flat).as_deref(), Some("flat"));
        assert_eq!(extract_output_text(&json!({ "foo": 1 })), None);
    }
}
