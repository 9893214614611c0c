//! Thin wrapper around async-openai for generation and embeddings.
//!
//! The generation call is a single attempt under an explicit deadline;
//! expiry and transport errors look identical to the caller, which maps
//! both to the configured fallback answer.

use std::{sync::Arc, time::Duration};

use crate::base::{
    config::Config,
    prompts::ComposedPrompt,
    types::Res,
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, EmbeddingInput,
    },
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, instrument};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(skip_all)]
    async fn generate(&self, prompt: &ComposedPrompt) -> Res<String> {
        debug!("Generating answer with composed instructions and input");

        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(prompt.instructions.clone()),
                name: Some("System".to_string()),
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(prompt.input.clone()),
                name: Some("User".to_string()),
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_model)
            .messages(messages)
            .temperature(self.config.openai_temperature)
            .max_completion_tokens(self.config.openai_max_tokens)
            .build()?;

        // Single attempt under the configured deadline; a stalled call must
        // never leave a placeholder unresolved.
        let deadline = Duration::from_secs(self.config.generation_timeout_secs);
        let response = timeout(deadline, self.client.chat().create(request))
            .await
            .map_err(|_| anyhow::anyhow!("Generation call exceeded the {}s deadline", self.config.generation_timeout_secs))??;

        let content = response.choices.first().and_then(|choice| choice.message.content.clone()).unwrap_or_default();

        if content.trim().is_empty() {
            return Err(anyhow::anyhow!("Generation returned an empty completion"));
        }

        Ok(content)
    }

    #[instrument(skip_all)]
    async fn embed(&self, text: &str) -> Res<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.config.openai_embedding_model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Embedding response contained no vectors"))?;

        Ok(embedding.embedding)
    }
}

// Tests.
