//! Slack integration for guide-bot.
//!
//! This module connects the socket-mode event stream to the answer
//! pipeline:
//! - Receiving and normalizing push events
//! - Posting the acknowledgment message and editing it in place
//!
//! Bot-originated and subtyped (system) events are dropped during
//! normalization and never reach the classifier. A mentioned message can be
//! delivered both as a message event and as an app-mention event; the
//! pipeline's redelivery ledger collapses the pair into one answer.

use crate::{
    base::{
        config::Config,
        types::{ConversationEvent, ConversationKind, MessageHandle, Res, Void},
    },
    interaction,
    runtime::AppContext,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config, ctx: AppContext) -> Res<Self> {
        let client = SlackChatClient::new(config, ctx).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    ctx: AppContext,
    chat: ChatClient,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub bot_user_id: String,
    pub client: Arc<FullClient>,
    pub ctx: AppContext,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config, ctx: AppContext) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            ctx,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            ctx: self.ctx.clone(),
            chat: ChatClient::from(self.clone()),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn post_message(&self, conversation_id: &str, reply_target: &str, text: &str) -> Res<MessageHandle> {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(conversation_id.to_string()), message)
            .with_as_user(true)
            .with_thread_ts(SlackTs(reply_target.to_string()))
            .with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let response = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to post message: {}", e))?;

        Ok(MessageHandle(response.ts.0))
    }

    #[instrument(skip(self, text))]
    async fn update_message(&self, conversation_id: &str, handle: &MessageHandle, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatUpdateRequest::new(SlackChannelId(conversation_id.to_string()), message, SlackTs(handle.0.clone()));

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_update(&request).await.map_err(|e| anyhow::anyhow!("Failed to update message: {}", e))?;

        Ok(())
    }
}

// Event normalization.

/// Normalize a message push event, dropping bot-originated, subtyped, and
/// textless events.
fn normalize_message_event(event: SlackMessageEvent, bot_user_id: &str) -> Option<ConversationEvent> {
    if event.subtype.is_some() || event.sender.bot_id.is_some() {
        return None;
    }

    let author_id = event.sender.user?.0;
    if author_id == bot_user_id {
        return None;
    }

    let conversation_id = event.origin.channel?.0;
    let text = event.content.and_then(|c| c.text)?;
    if text.is_empty() {
        return None;
    }

    let kind = match &event.origin.channel_type {
        Some(channel_type) if channel_type.0 == "im" => ConversationKind::Direct,
        _ => ConversationKind::Channel,
    };

    Some(ConversationEvent {
        author_id,
        text,
        conversation_id,
        event_id: event.origin.ts.0,
        parent_event_id: event.origin.thread_ts.map(|ts| ts.0),
        kind,
    })
}

/// Normalize an app-mention push event. Mentions only fire in channels.
fn normalize_app_mention_event(event: SlackAppMentionEvent, bot_user_id: &str) -> Option<ConversationEvent> {
    let author_id = event.user.0;
    if author_id == bot_user_id {
        return None;
    }

    let text = event.content.text?;
    if text.is_empty() {
        return None;
    }

    Some(ConversationEvent {
        author_id,
        text,
        conversation_id: event.channel.0,
        event_id: event.origin.ts.0,
        parent_event_id: event.origin.thread_ts.map(|ts| ts.0),
        kind: ConversationKind::Channel,
    })
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            info!("Received message event ...");

            if let Some(event) = normalize_message_event(slack_message_event, user_state.chat.bot_user_id()) {
                interaction::chat_event::handle_chat_event(event, user_state.ctx.clone(), user_state.chat.clone());
            }
        }
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            if let Some(event) = normalize_app_mention_event(slack_app_mention_event, user_state.chat.bot_user_id()) {
                interaction::chat_event::handle_chat_event(event, user_state.ctx.clone(), user_state.chat.clone());
            }
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.

#[cfg(test)]
mod tests {
    // Normalization is exercised indirectly through the pipeline tests in
    // `tests/integration.rs`; the socket client itself needs live Slack
    // credentials and is not unit tested.
}
