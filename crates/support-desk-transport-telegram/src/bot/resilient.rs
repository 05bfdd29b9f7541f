//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Sends are retried on failure using exponential backoff with jitter. A reply
//! that still fails is logged and dropped; the remaining replies are delivered.

use crate::bot::keyboards::reply_markup;
use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};
use anyhow::Result;
use std::time::Duration;
use support_desk_core::conversation::Reply;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, ReplyMarkup};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, error, warn};

/// Retry an async Telegram operation with exponential backoff.
///
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max retries: 3
///
/// # Errors
///
/// Returns the last error if every attempt fails.
pub async fn retry_transport_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} retries: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

/// Send a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    markup: Option<ReplyMarkup>,
) -> Result<Message> {
    let text = text.into();
    retry_transport_operation(|| async {
        let mut req = bot.send_message(chat_id, text.clone());
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Deliver controller replies in order.
///
/// Returns the number of replies that could not be delivered.
pub async fn deliver_replies(bot: &Bot, replies: Vec<Reply>) -> usize {
    let mut failed = 0;
    for reply in replies {
        let markup = reply_markup(&reply.keyboard);
        match send_message_resilient(bot, ChatId(reply.chat_id), reply.text, markup).await {
            Ok(_) => debug!("Reply delivered to chat {}", reply.chat_id),
            Err(e) => {
                failed += 1;
                error!("Failed to deliver reply to chat {}: {}", reply.chat_id, e);
            }
        }
    }
    failed
}
