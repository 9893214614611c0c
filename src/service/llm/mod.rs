pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{prompts::ComposedPrompt, types::Res};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large
/// language models. Implementing this trait allows different providers to
/// be used with the guide-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Generate a grounded answer for a composed request.
    ///
    /// One attempt, bounded by the configured deadline. Any failure —
    /// transport, timeout, or an empty completion — surfaces as an error
    /// that the caller converts into the fallback answer; there is no retry.
    async fn generate(&self, prompt: &ComposedPrompt) -> Res<String>;

    /// Embed a text into a fixed-dimension vector.
    ///
    /// Used by the chunk-retrieval strategy for corpus chunks at startup and
    /// for queries at lookup time.
    async fn embed(&self, text: &str) -> Res<Vec<f32>>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
