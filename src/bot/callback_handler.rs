//! Inline keyboard callback routing.
//!
//! Payloads are colon-delimited `action:id[:sub[:value]]` tokens. Parsing
//! is defensive: anything malformed answers with an alert instead of
//! touching state, and the wish id must be numeric before the store is
//! consulted.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::dialogue::{EditField, FlowState, WishDialogue};
use crate::format::{build_wish_card, compose_export_csv, compose_export_txt};
use crate::session::{Gate, SessionManager};
use crate::storage::Store;
use crate::transport::{send_document, send_html, send_html_with_markup};
use crate::wish::{Wish, WishUpdate};

use super::dialogue_manager::{
    apply_update_and_show, show_edit_card, MSG_GENERIC_FAILURE, MSG_WISH_NOT_FOUND,
};
use super::ui_builder::{delete_confirm_keyboard, priority_menu_keyboard};

/// Parsed callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `edit:<id>`: open the edit card.
    EditCard { wish_id: i64 },
    /// `edit:<id>:back`: return to the card without mutating.
    EditBack { wish_id: i64 },
    /// `edit:<id>:<field>`: start value collection for a text field.
    EditField { wish_id: i64, field: EditField },
    /// `edit:<id>:link:clear`
    EditLinkClear { wish_id: i64 },
    /// `edit:<id>:photo`
    EditPhotoPrompt { wish_id: i64 },
    /// `edit:<id>:photo:clear`
    EditPhotoClear { wish_id: i64 },
    /// `edit:<id>:priority`
    EditPriorityMenu { wish_id: i64 },
    /// `edit:<id>:priority:<1-5>`
    EditPrioritySet { wish_id: i64, priority: u8 },
    /// `delete:<id>`: ask for confirmation.
    DeletePrompt { wish_id: i64 },
    /// `delete:<id>:confirm`
    DeleteConfirm { wish_id: i64 },
    /// `delete:<id>:cancel`
    DeleteCancel,
    /// `export:txt` / `export:csv`
    Export { format: ExportFormat },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Csv,
}

/// Why a payload was rejected. Both cases answer an alert; neither is an
/// error in the handler sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackParseError {
    UnknownAction,
    InvalidId,
}

impl CallbackParseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CallbackParseError::UnknownAction => "⚠️ Unrecognized action",
            CallbackParseError::InvalidId => "⚠️ Invalid identifier",
        }
    }
}

/// Parse an `action:id[:sub[:value]]` payload.
pub fn parse_callback(data: &str) -> Result<CallbackAction, CallbackParseError> {
    let mut parts = data.split(':');
    let action = parts.next().unwrap_or("");

    match action {
        "export" => match parts.next() {
            Some("txt") => Ok(CallbackAction::Export {
                format: ExportFormat::Txt,
            }),
            Some("csv") => Ok(CallbackAction::Export {
                format: ExportFormat::Csv,
            }),
            _ => Err(CallbackParseError::UnknownAction),
        },
        "edit" | "delete" => {
            let wish_id: i64 = parts
                .next()
                .and_then(|raw| raw.parse().ok())
                .ok_or(CallbackParseError::InvalidId)?;
            let sub = parts.next();
            let value = parts.next();
            if parts.next().is_some() {
                return Err(CallbackParseError::UnknownAction);
            }

            if action == "delete" {
                return match (sub, value) {
                    (None, None) => Ok(CallbackAction::DeletePrompt { wish_id }),
                    (Some("confirm"), None) => Ok(CallbackAction::DeleteConfirm { wish_id }),
                    (Some("cancel"), None) => Ok(CallbackAction::DeleteCancel),
                    _ => Err(CallbackParseError::UnknownAction),
                };
            }

            match (sub, value) {
                (None, None) => Ok(CallbackAction::EditCard { wish_id }),
                (Some("back"), None) => Ok(CallbackAction::EditBack { wish_id }),
                (Some("title"), None) => Ok(CallbackAction::EditField {
                    wish_id,
                    field: EditField::Title,
                }),
                (Some("link"), None) => Ok(CallbackAction::EditField {
                    wish_id,
                    field: EditField::Link,
                }),
                (Some("link"), Some("clear")) => Ok(CallbackAction::EditLinkClear { wish_id }),
                (Some("category"), None) => Ok(CallbackAction::EditField {
                    wish_id,
                    field: EditField::Category,
                }),
                (Some("description"), None) => Ok(CallbackAction::EditField {
                    wish_id,
                    field: EditField::Description,
                }),
                (Some("photo"), None) => Ok(CallbackAction::EditPhotoPrompt { wish_id }),
                (Some("photo"), Some("clear")) => Ok(CallbackAction::EditPhotoClear { wish_id }),
                (Some("priority"), None) => Ok(CallbackAction::EditPriorityMenu { wish_id }),
                (Some("priority"), Some(raw)) => match raw.parse::<u8>() {
                    Ok(priority) if (1..=5).contains(&priority) => {
                        Ok(CallbackAction::EditPrioritySet { wish_id, priority })
                    }
                    _ => Err(CallbackParseError::UnknownAction),
                },
                _ => Err(CallbackParseError::UnknownAction),
            }
        }
        _ => Err(CallbackParseError::UnknownAction),
    }
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<Store>,
    sessions: Arc<SessionManager>,
    dialogue: WishDialogue,
) -> Result<()> {
    let identity =
        crate::config::Identity::new(q.from.id.0 as i64, q.from.username.clone());
    let user_id = identity.user_id;
    debug!(user_id, data = ?q.data, "Callback received");

    // Button presses are privileged operations like everything else.
    let gate = match sessions.authorize_and_continue(&identity).await {
        Ok(gate) => gate,
        Err(e) => {
            error!(user_id, error = %e, "Gate check failed");
            answer_alert(&bot, &q, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    };
    if let Gate::Denied(denial) = gate {
        dialogue.exit().await?;
        answer_alert(&bot, &q, denial.user_message()).await?;
        return Ok(());
    }

    let action = match parse_callback(q.data.as_deref().unwrap_or("")) {
        Ok(action) => action,
        Err(e) => {
            debug!(user_id, data = ?q.data, "Malformed callback payload");
            answer_alert(&bot, &q, e.user_message()).await?;
            return Ok(());
        }
    };

    let Some(message) = &q.message else {
        answer_alert(&bot, &q, "⚠️ This button has expired").await?;
        return Ok(());
    };
    let chat_id = message.chat().id;

    match action {
        CallbackAction::EditCard { wish_id } | CallbackAction::EditBack { wish_id } => {
            if let Some(wish) = load_wish_or_warn(&bot, &q, &store, user_id, wish_id).await? {
                show_edit_card(&bot, chat_id, &wish).await?;
            } else {
                return Ok(());
            }
        }
        CallbackAction::EditField { wish_id, field } => {
            if load_wish_or_warn(&bot, &q, &store, user_id, wish_id).await?.is_none() {
                return Ok(());
            }
            dialogue
                .update(FlowState::EditValue { wish_id, field })
                .await?;
            send_html(&bot, chat_id, field.prompt()).await?;
        }
        CallbackAction::EditLinkClear { wish_id } => {
            apply_update_and_show(
                &bot,
                chat_id,
                &store,
                user_id,
                wish_id,
                &WishUpdate::Link(String::new()),
            )
            .await?;
        }
        CallbackAction::EditPhotoPrompt { wish_id } => {
            if load_wish_or_warn(&bot, &q, &store, user_id, wish_id).await?.is_none() {
                return Ok(());
            }
            dialogue.update(FlowState::EditPhoto { wish_id }).await?;
            send_html(
                &bot,
                chat_id,
                "🖼️ Send the new photo (or /cancel to keep the old one):",
            )
            .await?;
        }
        CallbackAction::EditPhotoClear { wish_id } => {
            apply_update_and_show(
                &bot,
                chat_id,
                &store,
                user_id,
                wish_id,
                &WishUpdate::Photo(None),
            )
            .await?;
        }
        CallbackAction::EditPriorityMenu { wish_id } => {
            if load_wish_or_warn(&bot, &q, &store, user_id, wish_id).await?.is_none() {
                return Ok(());
            }
            send_html_with_markup(
                &bot,
                chat_id,
                "⭐ Pick a priority:",
                priority_menu_keyboard(wish_id),
            )
            .await?;
        }
        CallbackAction::EditPrioritySet { wish_id, priority } => {
            apply_update_and_show(
                &bot,
                chat_id,
                &store,
                user_id,
                wish_id,
                &WishUpdate::Priority(priority),
            )
            .await?;
        }
        CallbackAction::DeletePrompt { wish_id } => {
            let Some(wish) = load_wish_or_warn(&bot, &q, &store, user_id, wish_id).await? else {
                return Ok(());
            };
            send_html_with_markup(
                &bot,
                chat_id,
                &format!("Delete this wish?\n\n{}", build_wish_card(&wish)),
                delete_confirm_keyboard(wish_id),
            )
            .await?;
        }
        CallbackAction::DeleteConfirm { wish_id } => {
            match store.delete_wish(user_id, wish_id).await {
                Ok(true) => {
                    send_html(&bot, chat_id, "Wish deleted.").await?;
                }
                Ok(false) => {
                    answer_alert(&bot, &q, MSG_WISH_NOT_FOUND).await?;
                    return Ok(());
                }
                Err(e) => {
                    error!(user_id, wish_id, error = %e, "Failed to delete wish");
                    answer_alert(&bot, &q, MSG_GENERIC_FAILURE).await?;
                    return Ok(());
                }
            }
        }
        CallbackAction::DeleteCancel => {
            bot.answer_callback_query(q.id.clone()).text("Cancelled.").await?;
            return Ok(());
        }
        CallbackAction::Export { format } => {
            let wishes = match store.list_wishes(user_id).await {
                Ok(wishes) => wishes,
                Err(e) => {
                    error!(user_id, error = %e, "Failed to list wishes for export");
                    answer_alert(&bot, &q, MSG_GENERIC_FAILURE).await?;
                    return Ok(());
                }
            };
            let (content, file_name) = match format {
                ExportFormat::Txt => (compose_export_txt(&wishes), "wishlist.txt"),
                ExportFormat::Csv => (compose_export_csv(&wishes), "wishlist.csv"),
            };
            send_document(&bot, chat_id, content.into_bytes(), file_name).await?;
            bot.answer_callback_query(q.id.clone())
                .text("Export ready!")
                .await?;
            return Ok(());
        }
    }

    // Plain acknowledgement clears the button's loading state.
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

async fn load_wish_or_warn(
    bot: &Bot,
    q: &CallbackQuery,
    store: &Arc<Store>,
    user_id: i64,
    wish_id: i64,
) -> Result<Option<Wish>> {
    match store.get_wish(user_id, wish_id).await {
        Ok(Some(wish)) => Ok(Some(wish)),
        Ok(None) => {
            answer_alert(bot, q, MSG_WISH_NOT_FOUND).await?;
            Ok(None)
        }
        Err(e) => {
            error!(user_id, wish_id, error = %e, "Failed to load wish");
            answer_alert(bot, q, MSG_GENERIC_FAILURE).await?;
            Ok(None)
        }
    }
}

async fn answer_alert(bot: &Bot, q: &CallbackQuery, text: &str) -> Result<()> {
    bot.answer_callback_query(q.id.clone())
        .text(text)
        .show_alert(true)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_payloads() {
        assert_eq!(
            parse_callback("edit:12").unwrap(),
            CallbackAction::EditCard { wish_id: 12 }
        );
        assert_eq!(
            parse_callback("edit:12:title").unwrap(),
            CallbackAction::EditField {
                wish_id: 12,
                field: EditField::Title
            }
        );
        assert_eq!(
            parse_callback("edit:12:link:clear").unwrap(),
            CallbackAction::EditLinkClear { wish_id: 12 }
        );
        assert_eq!(
            parse_callback("edit:12:priority:4").unwrap(),
            CallbackAction::EditPrioritySet {
                wish_id: 12,
                priority: 4
            }
        );
    }

    #[test]
    fn test_parse_delete_and_export_payloads() {
        assert_eq!(
            parse_callback("delete:3").unwrap(),
            CallbackAction::DeletePrompt { wish_id: 3 }
        );
        assert_eq!(
            parse_callback("delete:3:confirm").unwrap(),
            CallbackAction::DeleteConfirm { wish_id: 3 }
        );
        assert_eq!(
            parse_callback("export:csv").unwrap(),
            CallbackAction::Export {
                format: ExportFormat::Csv
            }
        );
    }

    #[test]
    fn test_parse_missing_id_is_invalid() {
        assert_eq!(parse_callback("edit"), Err(CallbackParseError::InvalidId));
        assert_eq!(parse_callback("edit:"), Err(CallbackParseError::InvalidId));
        assert_eq!(
            parse_callback("edit:abc"),
            Err(CallbackParseError::InvalidId)
        );
        assert_eq!(parse_callback("delete:"), Err(CallbackParseError::InvalidId));
    }

    #[test]
    fn test_parse_unknown_payloads() {
        assert_eq!(parse_callback(""), Err(CallbackParseError::UnknownAction));
        assert_eq!(
            parse_callback("boom:1"),
            Err(CallbackParseError::UnknownAction)
        );
        assert_eq!(
            parse_callback("edit:1:unknown"),
            Err(CallbackParseError::UnknownAction)
        );
        assert_eq!(
            parse_callback("edit:1:priority:9"),
            Err(CallbackParseError::UnknownAction)
        );
        assert_eq!(
            parse_callback("edit:1:title:extra"),
            Err(CallbackParseError::UnknownAction)
        );
        assert_eq!(
            parse_callback("export:pdf"),
            Err(CallbackParseError::UnknownAction)
        );
    }
}
