//! The per-event answer pipeline.
//!
//! classify → dedup → acknowledge → (canned | retrieve → compose →
//! generate) → resolve. Each inbound event runs on its own spawned task;
//! a failure inside one event is logged and never reaches another event.

use tracing::{Instrument, debug, error, instrument, warn};

use crate::{
    base::{
        prompts,
        types::{Classification, ConversationEvent, Void},
    },
    interaction::{classifier, publisher},
    runtime::AppContext,
    service::chat::ChatClient,
};

/// Spawn a task that runs the answer pipeline for one event.
#[instrument(skip_all)]
pub fn handle_chat_event(event: ConversationEvent, ctx: AppContext, chat: ChatClient) {
    tokio::spawn(async move {
        // Process the event.
        let result = process_event(event, &ctx, &chat).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling: {}", err);
        }
    });
}

/// Run the full pipeline for one event. Public so tests can drive it
/// without the spawning wrapper.
#[instrument(skip_all)]
pub async fn process_event(event: ConversationEvent, ctx: &AppContext, chat: &ChatClient) -> Void {
    let classify_ctx = classifier::ClassifyContext::new(&ctx.config, chat.bot_user_id());
    let classification = classifier::classify(&event, &classify_ctx);

    let reply_target = match &classification {
        Classification::Ignore(reason) => {
            debug!("Skipping event {}: {:?}", event.event_id, reason);
            return Ok(());
        }
        Classification::Answer { reply_target, .. } => reply_target.clone(),
        _ => event.reply_target(),
    };

    // Redelivered events must not produce a second placeholder.
    if !ctx.ledger.first_delivery(&event.event_id) {
        debug!("Skipping redelivered event {}", event.event_id);
        return Ok(());
    }

    // Acknowledge before any retrieval or generation work starts.
    let searching = pick_searching_text(&ctx.config.searching_texts, &event.event_id);
    let placeholder = publisher::acknowledge(chat, &event.conversation_id, &reply_target, searching).await?;

    let final_text = match classification {
        Classification::Help => ctx.help_text.as_ref().clone(),
        Classification::BookRequest => match ctx.workflow.submit(&event).await {
            Ok(receipt) => receipt,
            Err(err) => {
                error!("Book-request workflow failed: {}", err);
                ctx.config.fallback_text.clone()
            }
        },
        Classification::Answer { query, .. } => {
            let greeting = ctx.sessions.greeting_prefix(&event.author_id, &event.conversation_id);
            let answer = answer_query(ctx, &query).await;
            format!("{greeting}{answer}")
        }
        Classification::Ignore(_) => unreachable!("ignored events return before acknowledgment"),
    };

    placeholder.resolve(chat, &final_text).await;

    Ok(())
}

/// Canned answer if a rule matches, otherwise retrieve → compose → generate.
/// Generation failures of any shape collapse into the configured fallback
/// answer so the placeholder always resolves.
async fn answer_query(ctx: &AppContext, query: &str) -> String {
    if let Some(canned) = ctx.rules.lookup(query) {
        return canned.to_string();
    }

    let retrieval = ctx.knowledge.retrieve(query).await;
    let prompt = prompts::compose_from_config(&ctx.config, &retrieval.context_text(), query);

    match ctx.llm.generate(&prompt).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Generation returned an empty answer");
            ctx.config.fallback_text.clone()
        }
        Err(err) => {
            error!("Generation failed: {}", err);
            ctx.config.fallback_text.clone()
        }
    }
}

/// Rotate through the configured acknowledgment texts, keyed by the event ID
/// so the choice is stable per event.
fn pick_searching_text<'a>(texts: &'a [String], event_id: &str) -> &'a str {
    if texts.is_empty() {
        return "...";
    }

    let sum: usize = event_id.bytes().map(usize::from).sum();
    &texts[sum % texts.len()]
}

// Tests.
