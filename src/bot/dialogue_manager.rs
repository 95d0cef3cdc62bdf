//! Flow step handlers: map pure state-machine outcomes onto sends, dialogue
//! updates and the single store mutation per commit.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use tracing::error;

use crate::dialogue::{AddStep, EditField, FlowState, WishDialogue, advance_add_flow, apply_edit_value};
use crate::format::build_wish_card;
use crate::storage::Store;
use crate::transport::{download_photo_if_small, send_html, send_html_with_markup, send_photo_with_caption};
use crate::wish::{Wish, WishDraft, WishPhoto, WishUpdate};

use super::ui_builder::edit_menu_keyboard;

pub const MSG_GENERIC_FAILURE: &str = "Sorry, something went wrong. Please try again.";
pub const MSG_WISH_NOT_FOUND: &str = "⚠️ Wish not found. It may have already been deleted.";
pub const MSG_FLOW_CANCELLED: &str = "Cancelled. Nothing was saved.";
pub const MSG_WISH_SAVED: &str = "🎉 Wish saved! Use /list to see your wishlist.";

/// Render the edit card for a wish: photo by file reference when we have
/// one, downloaded bytes as fallback, plain text otherwise.
pub async fn show_edit_card(bot: &Bot, chat_id: ChatId, wish: &Wish) -> Result<()> {
    let caption = build_wish_card(wish);
    let markup = edit_menu_keyboard(wish.id, wish.has_photo());

    if let Some(file_id) = &wish.photo_file_id {
        let photo = InputFile::file_id(FileId(file_id.clone()));
        if send_photo_with_caption(bot, chat_id, photo, &caption, markup.clone())
            .await
            .is_ok()
        {
            return Ok(());
        }
        // A stale file reference must not hide the card itself.
    }
    if let Some(bytes) = &wish.photo {
        let photo = InputFile::memory(bytes.clone()).file_name(format!("wish-{}.jpg", wish.id));
        if send_photo_with_caption(bot, chat_id, photo, &caption, markup.clone())
            .await
            .is_ok()
        {
            return Ok(());
        }
    }

    send_html_with_markup(bot, chat_id, &caption, markup).await?;
    Ok(())
}

/// Persist a completed draft and confirm. The create is the only store
/// mutation of the whole Add-Wish flow.
pub async fn commit_draft(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    store: &Arc<Store>,
    draft: WishDraft,
) -> Result<()> {
    match store.create_wish(user_id, draft).await {
        Ok(wish) => {
            send_html(bot, chat_id, MSG_WISH_SAVED).await?;
            send_html(bot, chat_id, &build_wish_card(&wish)).await?;
        }
        Err(e) => {
            error!(user_id, error = %e, "Failed to create wish");
            send_html(bot, chat_id, MSG_GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

/// Feed one text input into the Add-Wish flow.
pub async fn handle_add_flow_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &WishDialogue,
    store: &Arc<Store>,
    user_id: i64,
    state: &FlowState,
    text: &str,
) -> Result<()> {
    match advance_add_flow(state, text) {
        AddStep::Prompt { next, prompt } => {
            dialogue.update(next).await?;
            send_html(bot, msg.chat.id, prompt).await?;
        }
        AddStep::Reprompt { error } => {
            send_html(bot, msg.chat.id, error).await?;
        }
        AddStep::Commit { draft } => {
            dialogue.exit().await?;
            commit_draft(bot, msg.chat.id, user_id, store, draft).await?;
        }
        AddStep::Cancelled => {
            dialogue.exit().await?;
            send_html(bot, msg.chat.id, MSG_FLOW_CANCELLED).await?;
        }
        AddStep::NotInFlow => {}
    }
    Ok(())
}

/// Feed one text input into the Edit-Wish value-collection step.
pub async fn handle_edit_value_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &WishDialogue,
    store: &Arc<Store>,
    user_id: i64,
    wish_id: i64,
    field: EditField,
    text: &str,
) -> Result<()> {
    if crate::dialogue::is_cancel(text) {
        dialogue.exit().await?;
        send_html(bot, msg.chat.id, MSG_FLOW_CANCELLED).await?;
        if let Ok(Some(wish)) = store.get_wish(user_id, wish_id).await {
            show_edit_card(bot, msg.chat.id, &wish).await?;
        }
        return Ok(());
    }

    let update = match apply_edit_value(field, text) {
        Ok(update) => update,
        Err(error) => {
            // Invalid value: stay on this step and re-prompt.
            send_html(bot, msg.chat.id, error).await?;
            return Ok(());
        }
    };

    dialogue.exit().await?;
    apply_update_and_show(bot, msg.chat.id, store, user_id, wish_id, &update).await
}

/// Apply a single-field update, confirm, and re-render the card so edits
/// can be chained.
pub async fn apply_update_and_show(
    bot: &Bot,
    chat_id: ChatId,
    store: &Arc<Store>,
    user_id: i64,
    wish_id: i64,
    update: &WishUpdate,
) -> Result<()> {
    match store.update_wish(user_id, wish_id, update).await {
        Ok(Some(updated)) => {
            send_html(
                bot,
                chat_id,
                &format!("✅ The {} was updated.", update.field_name()),
            )
            .await?;
            show_edit_card(bot, chat_id, &updated).await?;
        }
        Ok(None) => {
            send_html(bot, chat_id, MSG_WISH_NOT_FOUND).await?;
        }
        Err(e) => {
            error!(
                user_id,
                wish_id,
                field = update.field_name(),
                error = %e,
                "Failed to update wish"
            );
            send_html(bot, chat_id, MSG_GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

/// A photo arrived while we were waiting for a replacement photo.
pub async fn handle_edit_photo_message(
    bot: &Bot,
    msg: &Message,
    dialogue: &WishDialogue,
    store: &Arc<Store>,
    user_id: i64,
    wish_id: i64,
) -> Result<()> {
    let Some(largest) = msg.photo().and_then(|photos| photos.last()) else {
        send_html(bot, msg.chat.id, "Expected a photo. Try again, or send /cancel.").await?;
        return Ok(());
    };

    let bytes = download_photo_if_small(bot, largest).await;
    let update = WishUpdate::Photo(Some(WishPhoto {
        file_id: largest.file.id.0.clone(),
        bytes,
    }));

    dialogue.exit().await?;
    apply_update_and_show(bot, msg.chat.id, store, user_id, wish_id, &update).await
}

/// Text arrived while we were waiting for a photo: allow cancel, otherwise
/// keep waiting.
pub async fn handle_edit_photo_text(
    bot: &Bot,
    msg: &Message,
    dialogue: &WishDialogue,
    store: &Arc<Store>,
    user_id: i64,
    wish_id: i64,
    text: &str,
) -> Result<()> {
    if crate::dialogue::is_cancel(text) {
        dialogue.exit().await?;
        send_html(bot, msg.chat.id, MSG_FLOW_CANCELLED).await?;
        if let Ok(Some(wish)) = store.get_wish(user_id, wish_id).await {
            show_edit_card(bot, msg.chat.id, &wish).await?;
        }
        return Ok(());
    }
    send_html(bot, msg.chat.id, "Expected a photo. Try again, or send /cancel.").await?;
    Ok(())
}
