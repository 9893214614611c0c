//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::interaction::direct_answer::{self, DirectAnswerRule};

use super::types::Res;

/// Default OpenAI answer model to use.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default OpenAI embedding model to use.
fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default sampling temperature for answer generation.
fn default_openai_temperature() -> f32 {
    0.2
}

/// Default max output tokens for answer generation.
fn default_openai_max_tokens() -> u32 {
    2048
}

/// Default deadline for a single generation call, in seconds.
fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_retrieval_mode() -> RetrievalMode {
    RetrievalMode::Chunked
}

/// Default maximum chunk length, in characters.
fn default_chunk_max_len() -> usize {
    1200
}

/// Default minimum chunk length; shorter chunks are discarded as noise.
fn default_chunk_min_len() -> usize {
    40
}

/// Default trailing overlap carried into the next chunk, in characters.
fn default_chunk_overlap() -> usize {
    120
}

/// Default number of chunks retrieved per query.
fn default_retrieval_top_n() -> usize {
    4
}

/// Default cosine-similarity floor below which retrieval returns nothing.
fn default_retrieval_score_floor() -> f32 {
    0.25
}

/// Default minimum cleaned-query length, in characters.
fn default_min_query_len() -> usize {
    2
}

fn default_help_command() -> String {
    "help".to_string()
}

fn default_book_request_trigger() -> String {
    "book request".to_string()
}

fn default_greeting_text() -> String {
    "Hi, I'm the workplace guide bot. 👋".to_string()
}

fn default_searching_texts() -> Vec<String> {
    vec!["One moment, looking that up... 🕵️".to_string(), "Thinking... 🤔".to_string()]
}

fn default_fallback_text() -> String {
    "⚠️ Something went wrong while writing the answer. Please try again shortly.".to_string()
}

fn default_no_information_text() -> String {
    "I couldn't find that in the workplace guide. Try the people team for details.".to_string()
}

fn default_direct_answers() -> Vec<DirectAnswerRule> {
    direct_answer::default_rules()
}

/// Default capacity of the per-(author, conversation) greeting cache.
fn default_session_capacity() -> usize {
    4096
}

/// Default capacity of the event-redelivery ledger.
fn default_dedup_capacity() -> usize {
    8192
}

/// How the knowledge store turns a query into grounding context.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMode {
    /// The whole corpus is the context for every query. Simple and correct
    /// for small corpora; context size grows with corpus size.
    WholeCorpus,
    /// Chunk the corpus at load, embed once, rank by cosine similarity.
    #[default]
    Chunked,
}

/// Configuration for the guide-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI answer model to use (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// OpenAI embedding model to use (`OPENAI_EMBEDDING_MODEL`).
    #[serde(default = "default_openai_embedding_model")]
    pub openai_embedding_model: String,
    /// Sampling temperature for answer generation (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for answer generation (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Deadline for a single generation call (`GENERATION_TIMEOUT_SECS`).
    /// Expiry is treated like any other generation failure.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Slack signing secret (`SLACK_SIGNING_SECRET`).
    pub slack_signing_secret: String,
    /// Path to the flat knowledge corpus file (`CORPUS_PATH`).
    pub corpus_path: String,
    /// Optional path to the help document; a built-in document is used when
    /// absent (`HELP_PATH`).
    #[serde(default)]
    pub help_path: Option<String>,
    /// Optional path for the persisted vector index (`INDEX_PATH`). The index
    /// is reused across restarts and rebuilt when missing, empty, or stale.
    #[serde(default)]
    pub index_path: Option<String>,
    /// Retrieval strategy (`RETRIEVAL_MODE`): `whole-corpus` or `chunked`.
    #[serde(default = "default_retrieval_mode")]
    pub retrieval_mode: RetrievalMode,
    #[serde(default = "default_chunk_max_len")]
    pub chunk_max_len: usize,
    #[serde(default = "default_chunk_min_len")]
    pub chunk_min_len: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_retrieval_top_n")]
    pub retrieval_top_n: usize,
    #[serde(default = "default_retrieval_score_floor")]
    pub retrieval_score_floor: f32,
    /// Cleaned queries shorter than this are ignored (`MIN_QUERY_LEN`).
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// Whether top-level channel messages require an explicit @-mention
    /// before the bot answers (`REQUIRE_MENTION_IN_CHANNELS`). Thread
    /// replies always require one; direct messages never do.
    #[serde(default)]
    pub require_mention_in_channels: bool,
    /// Literal that short-circuits to the help document (`HELP_COMMAND`).
    #[serde(default = "default_help_command")]
    pub help_command: String,
    /// Trigger phrase routed to the book-request workflow
    /// (`BOOK_REQUEST_TRIGGER`).
    #[serde(default = "default_book_request_trigger")]
    pub book_request_trigger: String,
    /// One-time greeting prepended to the first answer per (author,
    /// conversation) (`GREETING_TEXT`). Empty disables greetings.
    #[serde(default = "default_greeting_text")]
    pub greeting_text: String,
    /// Transient acknowledgment texts, rotated per event (`SEARCHING_TEXTS`).
    #[serde(default = "default_searching_texts")]
    pub searching_texts: Vec<String>,
    /// Answer used when generation fails (`FALLBACK_TEXT`).
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
    /// Phrase the model must use when the context does not answer the query
    /// (`NO_INFORMATION_TEXT`).
    #[serde(default = "default_no_information_text")]
    pub no_information_text: String,
    /// Ordered canned-answer rules, first match wins (`DIRECT_ANSWERS`).
    #[serde(default = "default_direct_answers")]
    pub direct_answers: Vec<DirectAnswerRule>,
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("GUIDE_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.retrieval_top_n == 0 {
            return Err(anyhow::anyhow!("Retrieval top-n must be at least 1."));
        }

        if self.chunk_min_len >= self.chunk_max_len {
            return Err(anyhow::anyhow!("Minimum chunk length must be smaller than the maximum."));
        }

        if self.chunk_overlap >= self.chunk_max_len {
            return Err(anyhow::anyhow!("Chunk overlap must be smaller than the maximum chunk length."));
        }

        if self.corpus_path.is_empty() {
            return Err(anyhow::anyhow!("Corpus path must be set."));
        }

        Ok(())
    }
}

// Tests.
