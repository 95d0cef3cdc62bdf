//! Outbound transport helpers.
//!
//! All user-visible sends go through these wrappers so rate-limit handling
//! lives in one place: a "retry after" signal from the transport triggers
//! exactly one wait-then-retry of the same send, never a loop. Photo
//! downloads are capped; an oversized or failed download degrades to
//! keeping the file reference only.

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, PhotoSize, ReplyMarkup};
use teloxide::RequestError;
use tracing::{debug, warn};

/// Photo payloads above this size are kept as a file reference only.
pub const MAX_DOWNLOAD_SIZE: u32 = 10 * 1024 * 1024;

/// Send an HTML-formatted text message with the single bounded retry.
pub async fn send_html(bot: &Bot, chat_id: ChatId, text: &str) -> Result<Message> {
    match bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await
    {
        Err(RequestError::RetryAfter(delay)) => {
            warn!(chat_id = %chat_id, "Rate limited, retrying send once");
            tokio::time::sleep(delay.duration()).await;
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .await
                .context("Send failed after retry")
        }
        result => result.context("Send failed"),
    }
}

/// Same as [`send_html`] with a reply or inline keyboard attached.
pub async fn send_html_with_markup<M>(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    markup: M,
) -> Result<Message>
where
    M: Into<ReplyMarkup> + Clone,
{
    match bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup.clone())
        .await
    {
        Err(RequestError::RetryAfter(delay)) => {
            warn!(chat_id = %chat_id, "Rate limited, retrying send once");
            tokio::time::sleep(delay.duration()).await;
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await
                .context("Send failed after retry")
        }
        result => result.context("Send failed"),
    }
}

/// Send a photo with an HTML caption; same bounded retry policy.
pub async fn send_photo_with_caption<M>(
    bot: &Bot,
    chat_id: ChatId,
    photo: InputFile,
    caption: &str,
    markup: M,
) -> Result<Message>
where
    M: Into<ReplyMarkup> + Clone,
{
    match bot
        .send_photo(chat_id, photo.clone())
        .caption(caption)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup.clone())
        .await
    {
        Err(RequestError::RetryAfter(delay)) => {
            warn!(chat_id = %chat_id, "Rate limited, retrying photo send once");
            tokio::time::sleep(delay.duration()).await;
            bot.send_photo(chat_id, photo)
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await
                .context("Photo send failed after retry")
        }
        result => result.context("Photo send failed"),
    }
}

/// Send an in-memory document (export payloads).
pub async fn send_document(
    bot: &Bot,
    chat_id: ChatId,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Message> {
    let file = InputFile::memory(bytes).file_name(file_name.to_string());
    match bot.send_document(chat_id, file.clone()).await {
        Err(RequestError::RetryAfter(delay)) => {
            warn!(chat_id = %chat_id, "Rate limited, retrying document send once");
            tokio::time::sleep(delay.duration()).await;
            bot.send_document(chat_id, file)
                .await
                .context("Document send failed after retry")
        }
        result => result.context("Document send failed"),
    }
}

/// Download a photo's bytes when it is within the size cap.
///
/// Returns `None` above the cap or on any download failure; the flow
/// keeps the file reference and carries on either way.
pub async fn download_photo_if_small(bot: &Bot, photo: &PhotoSize) -> Option<Vec<u8>> {
    if photo.file.size > MAX_DOWNLOAD_SIZE {
        debug!(
            file_size = photo.file.size,
            "Photo above download cap, keeping file reference only"
        );
        return None;
    }

    match fetch_file(bot, photo).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(error = %e, "Photo download failed, keeping file reference only");
            None
        }
    }
}

async fn fetch_file(bot: &Bot, photo: &PhotoSize) -> Result<Vec<u8>> {
    let file = bot
        .get_file(photo.file.id.clone())
        .await
        .context("get_file failed")?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );
    let response = reqwest::get(&url).await.context("File download failed")?;
    let bytes = response.bytes().await.context("File read failed")?;
    Ok(bytes.to_vec())
}
