//! Decides the handling path for a normalized conversational event.
//!
//! Classification is a pure function of the event and a small context
//! (bot user ID, policy flags, command literals); it performs no I/O.

use crate::base::{
    config::Config,
    types::{Classification, ConversationEvent, ConversationKind, SkipReason},
};

/// Everything the classifier needs beyond the event itself.
#[derive(Debug, Clone)]
pub struct ClassifyContext {
    pub bot_user_id: String,
    pub min_query_len: usize,
    pub require_mention_in_channels: bool,
    pub help_command: String,
    pub book_request_trigger: String,
}

impl ClassifyContext {
    pub fn new(config: &Config, bot_user_id: &str) -> Self {
        Self {
            bot_user_id: bot_user_id.to_string(),
            min_query_len: config.min_query_len,
            require_mention_in_channels: config.require_mention_in_channels,
            help_command: config.help_command.clone(),
            book_request_trigger: config.book_request_trigger.clone(),
        }
    }
}

/// Remove every `<@bot>` mention token from the text and trim the remainder.
pub fn strip_bot_mention(text: &str, bot_user_id: &str) -> String {
    let token = format!("<@{bot_user_id}>");
    text.replace(&token, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify an inbound event.
///
/// Rules, applied in order:
/// 1. Ignore when the mention-stripped text is below the minimum length.
/// 2. Thread replies require an explicit bot mention; direct messages are
///    exempt.
/// 3. Top-level channel messages require a mention only when the configured
///    policy says so.
/// 4. Cleaned text equal to the help literal short-circuits to help.
/// 5. Top-level text containing the book-request trigger routes to the
///    workflow collaborator, never to generation.
/// 6. Everything else is answered with the cleaned text as the query.
pub fn classify(event: &ConversationEvent, ctx: &ClassifyContext) -> Classification {
    let query = strip_bot_mention(&event.text, &ctx.bot_user_id);

    if query.chars().count() < ctx.min_query_len {
        return Classification::Ignore(SkipReason::TooShort);
    }

    let mentioned = event.text.contains(&format!("<@{}>", ctx.bot_user_id));
    let in_channel = event.kind == ConversationKind::Channel;

    if in_channel && event.is_thread_reply() && !mentioned {
        return Classification::Ignore(SkipReason::UnmentionedThreadReply);
    }

    if in_channel && !event.is_thread_reply() && ctx.require_mention_in_channels && !mentioned {
        return Classification::Ignore(SkipReason::MentionRequired);
    }

    if query == ctx.help_command {
        return Classification::Help;
    }

    if !event.is_thread_reply() && query.contains(&ctx.book_request_trigger) {
        return Classification::BookRequest;
    }

    Classification::Answer {
        query,
        reply_target: event.reply_target(),
    }
}

// Tests.
