//! Book-request workflow collaborator.
//!
//! The answer pipeline only routes matching events here; the workflow
//! itself (catalog lookup, record keeping) lives outside this crate behind
//! this narrow interface.

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::base::types::{ConversationEvent, Res};

// Traits.

/// Generic book-request workflow trait that collaborators must implement.
#[async_trait]
pub trait GenericWorkflowClient: Send + Sync + 'static {
    /// Hand an event to the workflow and return the user-facing receipt
    /// text for the placeholder message.
    async fn submit(&self, event: &ConversationEvent) -> Res<String>;
}

// Structs.

/// Workflow client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct WorkflowClient {
    inner: Arc<dyn GenericWorkflowClient>,
}

impl Deref for WorkflowClient {
    type Target = dyn GenericWorkflowClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl WorkflowClient {
    pub fn new(inner: Arc<dyn GenericWorkflowClient>) -> Self {
        Self { inner }
    }

    /// The built-in collaborator: log the request and acknowledge it.
    pub fn receipt_logger() -> Self {
        Self::new(Arc::new(ReceiptLoggerWorkflowClient))
    }
}

/// Default collaborator that records the request in the process log and
/// returns a static receipt.
pub struct ReceiptLoggerWorkflowClient;

#[async_trait]
impl GenericWorkflowClient for ReceiptLoggerWorkflowClient {
    async fn submit(&self, event: &ConversationEvent) -> Res<String> {
        info!("Book request from {} in {}: {}", event.author_id, event.conversation_id, event.text);

        Ok("✅ Got your book request.\nThe library team will pick it up from here.".to_string())
    }
}
