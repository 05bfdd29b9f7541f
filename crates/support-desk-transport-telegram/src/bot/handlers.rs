use crate::bot::resilient::{deliver_replies, send_message_resilient};
use crate::bot::DenialCache;
use anyhow::Result;
use std::sync::Arc;
use support_desk_core::conversation::views::REGISTRATION_DENIED;
use support_desk_core::conversation::{ConversationController, Inbound};
use support_desk_core::error::DeskError;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the menu for the sender's role
    #[command(description = "Start the bot.")]
    Start,
    /// Register the sender as a manager
    #[command(description = "Register as a manager.")]
    Menejinbot,
    /// Show request counters (managers only)
    #[command(description = "Show request statistics.")]
    Stats,
    /// Check bot health
    #[command(description = "Check bot health.")]
    Healthcheck,
}

fn report_undelivered(failed: usize, user_id: i64) {
    if failed > 0 {
        warn!("{failed} replies for user {user_id} were not delivered.");
    }
}

/// Start handler
///
/// # Errors
///
/// Never fails; delivery problems are logged.
pub async fn start(bot: Bot, msg: Message, controller: Arc<ConversationController>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!(
        "User {user_id} ({}) initiated /start command.",
        get_user_name(&msg)
    );

    let replies = controller.start(user_id, msg.chat.id.0).await;
    report_undelivered(deliver_replies(&bot, replies).await, user_id);
    Ok(())
}

/// Manager registration handler
///
/// Denial notices are throttled per user through `cache`.
///
/// # Errors
///
/// Returns an error if the denial notice cannot be sent.
pub async fn register_manager(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
    cache: Arc<DenialCache>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);
    info!("User {user_id} ({user_name}) requested manager registration.");

    let replies = match controller.register_manager(user_id, msg.chat.id.0).await {
        Ok(replies) => replies,
        Err(DeskError::Forbidden(_)) => {
            if cache.should_send(user_id, &user_name).await {
                info!("⛔️ Registration refused for user {user_id} ({user_name}). Sending notice.");
                send_message_resilient(&bot, msg.chat.id, REGISTRATION_DENIED, None).await?;
                cache.mark_sent(user_id).await;
            }
            return Ok(());
        }
        Err(e) => vec![controller.error_reply(msg.chat.id.0, &e)],
    };

    report_undelivered(deliver_replies(&bot, replies).await, user_id);
    Ok(())
}

/// Stats handler
///
/// # Errors
///
/// Never fails; delivery problems are logged.
pub async fn stats(bot: Bot, msg: Message, controller: Arc<ConversationController>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Stats command received from user {user_id}.");

    let replies = controller.stats(user_id, msg.chat.id.0).await;
    report_undelivered(deliver_replies(&bot, replies).await, user_id);
    Ok(())
}

/// Healthcheck handler
///
/// # Errors
///
/// Never fails; delivery problems are logged.
pub async fn healthcheck(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Healthcheck command received from user {user_id}.");

    let replies = controller.healthcheck(msg.chat.id.0).await;
    report_undelivered(deliver_replies(&bot, replies).await, user_id);
    Ok(())
}

/// Text message handler
///
/// # Errors
///
/// Never fails; delivery problems are logged.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(text) = msg.text() else {
        return handle_unsupported(bot, msg, controller).await;
    };

    let inbound = Inbound::new(user_id, msg.chat.id.0, text);
    let replies = controller.handle_text(&inbound).await;
    report_undelivered(deliver_replies(&bot, replies).await, user_id);
    Ok(())
}

/// Handler for messages without text
///
/// # Errors
///
/// Never fails; delivery problems are logged.
pub async fn handle_unsupported(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Non-text message from user {user_id} ignored.");

    let replies = controller.handle_unsupported(user_id, msg.chat.id.0).await;
    report_undelivered(deliver_replies(&bot, replies).await, user_id);
    Ok(())
}
