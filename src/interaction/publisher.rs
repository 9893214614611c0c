//! Acknowledge-then-replace delivery protocol.
//!
//! `acknowledge` posts the transient "searching" message before any
//! retrieval or generation work starts; `resolve` edits that message in
//! place with the final answer. `Placeholder` is consumed by `resolve`, so
//! each acknowledged event transitions pending → resolved exactly once.

use tracing::{error, instrument};

use crate::{
    base::types::{MessageHandle, ReplyTarget, Res},
    service::chat::ChatClient,
};

/// A pending acknowledgment message awaiting its final text.
#[derive(Debug)]
pub struct Placeholder {
    conversation_id: String,
    handle: MessageHandle,
}

/// Post the transient acknowledgment into the reply target and record its
/// handle.
#[instrument(skip(chat, text))]
pub async fn acknowledge(chat: &ChatClient, conversation_id: &str, target: &ReplyTarget, text: &str) -> Res<Placeholder> {
    let handle = chat.post_message(conversation_id, &target.0, text).await?;

    Ok(Placeholder {
        conversation_id: conversation_id.to_string(),
        handle,
    })
}

impl Placeholder {
    /// Replace the acknowledgment with the final answer.
    ///
    /// A failed edit is logged and the user keeps the acknowledgment text;
    /// this degraded outcome never propagates past the event.
    #[instrument(skip(self, chat, text))]
    pub async fn resolve(self, chat: &ChatClient, text: &str) {
        if let Err(err) = chat.update_message(&self.conversation_id, &self.handle, text).await {
            error!("Failed to resolve placeholder message: {}", err);
        }
    }
}
