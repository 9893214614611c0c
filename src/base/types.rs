use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Whether a conversation is a direct message or a shared channel.
///
/// Direct messages are always answered; channel messages are subject to the
/// mention policy (see `interaction::classifier`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationKind {
    Direct,
    Channel,
}

/// A normalized inbound chat event.
///
/// Built once per platform push event and discarded after handling. Events
/// that originate from the bot itself or carry a system subtype are dropped
/// during normalization and never become a `ConversationEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEvent {
    /// Platform user ID of the author.
    pub author_id: String,
    /// Raw message text, mention tokens included.
    pub text: String,
    /// Channel or DM conversation ID.
    pub conversation_id: String,
    /// Platform-unique event ID (the message timestamp on Slack).
    pub event_id: String,
    /// Thread root the event replies to, if any.
    pub parent_event_id: Option<String>,
    pub kind: ConversationKind,
}

impl ConversationEvent {
    /// The thread all replies for this event should land in: the existing
    /// thread root, or a new thread rooted at the event itself.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget(self.parent_event_id.clone().unwrap_or_else(|| self.event_id.clone()))
    }

    /// True when the event is a reply inside an existing thread.
    pub fn is_thread_reply(&self) -> bool {
        self.parent_event_id.is_some()
    }
}

/// Thread root a response should be posted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget(pub String);

/// Handle of a message previously posted to the chat platform, usable to
/// edit that message in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(pub String);

/// Why the classifier decided to do nothing for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Cleaned text is below the minimum query length.
    TooShort,
    /// Reply inside a thread without an explicit bot mention.
    UnmentionedThreadReply,
    /// Top-level channel message while the mention policy requires one.
    MentionRequired,
}

/// Handling path for an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Normal "do nothing" outcome, not an error.
    Ignore(SkipReason),
    /// Short-circuit with the static help document.
    Help,
    /// Route to the book-request workflow collaborator.
    BookRequest,
    /// Run the retrieval-then-generate pipeline.
    Answer { query: String, reply_target: ReplyTarget },
}
