//! Library root for `guide-bot`.
//!
//! Guide-bot is an OpenAI-powered workplace assistant for Slack designed to:
//! - Answer employee questions grounded in a bounded knowledge corpus
//! - Short-circuit operationally sensitive topics with canned answers
//! - Acknowledge every question immediately, then edit in the real answer
//! - Route book requests to the library workflow
//!
//! The bot integrates with Slack for chat and OpenAI for generation and
//! embeddings. The architecture is built around extensible traits that
//! allow for different implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the guide-bot runtime:
/// - Initializes the crypto provider
/// - Loads and indexes the knowledge corpus
/// - Creates the runtime context with LLM and chat clients
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting guide-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().unwrap();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
