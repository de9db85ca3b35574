use anyhow::anyhow;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

use crate::configuration::ExtractionSettings;

/// Best-effort text completion.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete_text(&self, instructions: &str, input: &str) -> anyhow::Result<String>;
}

pub struct OpenaiClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenaiClient {
    pub fn new(api_key: String, settings: &ExtractionSettings) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        OpenaiClient {
            client: Client::with_config(config),
            model: settings.openai_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

#[async_trait]
impl TextCompleter for OpenaiClient {
    async fn complete_text(&self, instructions: &str, input: &str) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(instructions)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(input)
                    .build()?
                    .into(),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;
        log::debug!("Completion usage: {:?}", response.usage);

        response
            .choices
            .first()
            .ok_or_else(|| anyhow!("No choices in Openai response"))?
            .message
            .content
            .clone()
            .ok_or_else(|| anyhow!("No content in Openai response"))
    }
}
