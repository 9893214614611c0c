//! Runtime services and shared state for the guide-bot.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        prompts,
        types::{Res, Void},
    },
    interaction::{
        direct_answer::DirectAnswerTable,
        session::{EventLedger, SessionTracker},
    },
    service::{chat::ChatClient, knowledge::KnowledgeStore, llm::LlmClient, workflow::WorkflowClient},
};

/// Application context handed to every event handler.
///
/// Constructed once at startup; everything inside is immutable or does its
/// own per-key locking, so the whole struct is trivially cloneable and can
/// be passed around without further `Arc` or `Mutex` wrapping.
#[derive(Clone)]
pub struct AppContext {
    /// The configuration for the application.
    pub config: Config,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The knowledge store, immutable after startup.
    pub knowledge: Arc<KnowledgeStore>,
    /// The ordered canned-answer table.
    pub rules: Arc<DirectAnswerTable>,
    /// Per-(author, conversation) greeting bookkeeping.
    pub sessions: Arc<SessionTracker>,
    /// Event-redelivery ledger.
    pub ledger: Arc<EventLedger>,
    /// The book-request workflow collaborator.
    pub workflow: WorkflowClient,
    /// The static help document.
    pub help_text: Arc<String>,
}

/// Runtime service context for the application.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// Shared application context.
    pub ctx: AppContext,
    /// The slack client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Load and index the knowledge corpus.
        let knowledge = Arc::new(KnowledgeStore::load(&config, llm.clone()).await?);

        // Load the help document.
        let help_text = Arc::new(load_help_text(&config));

        let ctx = AppContext {
            config: config.clone(),
            llm,
            knowledge,
            rules: Arc::new(DirectAnswerTable::new(config.direct_answers.clone())),
            sessions: Arc::new(SessionTracker::new(config.session_capacity, &config.greeting_text)),
            ledger: Arc::new(EventLedger::new(config.dedup_capacity)),
            workflow: WorkflowClient::receipt_logger(),
            help_text,
        };

        // Initialize the slack client.
        let chat = ChatClient::slack(&config, ctx.clone()).await?;

        Ok(Self { config, ctx, chat })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}

/// Read the configured help file, falling back to the built-in document.
fn load_help_text(config: &Config) -> String {
    let Some(path) = &config.help_path else {
        return prompts::DEFAULT_HELP_TEXT.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            info!("Help file at {} not readable ({}); using the built-in document.", path, err);
            prompts::DEFAULT_HELP_TEXT.to_string()
        }
    }
}
