//! Inbound message routing.
//!
//! Every update passes the identity + session gate before anything
//! privileged runs; /start, /login and /logout are the only handlers
//! reachable while logged out. Once the gate opens, the message is routed
//! either to the in-flight flow or to a stateless command handler.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::config::Identity;
use crate::dialogue::{FlowState, WishDialogue, PROMPT_TITLE};
use crate::format::{
    build_wish_block, category_to_emoji, escape_html, DEFAULT_CATEGORY_EMOJI,
    DEFAULT_CATEGORY_TITLE, sort_wishes_for_display,
};
use crate::quick_add::{contains_url, parse_quick_add};
use crate::session::{Gate, SessionManager};
use crate::storage::Store;
use crate::transport::{download_photo_if_small, send_html, send_html_with_markup};
use crate::wish::Wish;

use super::dialogue_manager::{
    commit_draft, handle_add_flow_input, handle_edit_photo_message, handle_edit_photo_text,
    handle_edit_value_input, MSG_GENERIC_FAILURE,
};
use super::ui_builder::{
    active_reply_keyboard, export_menu_keyboard, list_actions_keyboard,
    logged_out_reply_keyboard,
};

pub const EMPTY_LIST_TEXT: &str = "📭 Your wishlist is empty. Add something with /add.";
const EMPTY_PARTNER_LIST_TEXT: &str = "📭 Nothing on their list yet.";

const HELP_TEXT: &str = "Available commands:\n\
    /add — add a wish step by step.\n\
    /list — show your wishlist.\n\
    /edit — pick a wish to edit.\n\
    /delete — pick a wish to delete.\n\
    /others — view another user's list.\n\
    /categories — show all known categories.\n\
    /search word — search your wishes.\n\
    /export — download the list as TXT or CSV.\n\
    \nYou can also just paste a link to add it instantly.";

/// Split a command message into the command token (bot-name suffix
/// stripped) and its argument tail.
fn split_command(text: &str) -> (&str, &str) {
    let trimmed = text.trim();
    let (head, tail) = match trimmed.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (trimmed, ""),
    };
    (head.split('@').next().unwrap_or(head), tail)
}

fn identity_of(msg: &Message) -> Option<Identity> {
    msg.from
        .as_ref()
        .map(|user| Identity::new(user.id.0 as i64, user.username.clone()))
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    store: Arc<Store>,
    sessions: Arc<SessionManager>,
    dialogue: WishDialogue,
) -> Result<()> {
    let Some(identity) = identity_of(&msg) else {
        debug!(chat_id = %msg.chat.id, "Message without a sender ignored");
        return Ok(());
    };

    if let Some(text) = msg.text() {
        handle_text_message(&bot, &msg, &identity, text, &store, &sessions, &dialogue).await
    } else if msg.photo().is_some() {
        handle_photo_message(&bot, &msg, &identity, &store, &sessions, &dialogue).await
    } else {
        // Stickers, voice, documents and the rest have no meaning here.
        send_html(
            &bot,
            msg.chat.id,
            "I can work with text and photos. See /help.",
        )
        .await?;
        Ok(())
    }
}

/// Run the authorization gate, informing the user and clearing any
/// in-flight conversation on denial. Returns `true` when the caller may
/// proceed.
async fn pass_gate(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<bool> {
    let gate = match sessions.authorize_and_continue(identity).await {
        Ok(gate) => gate,
        Err(e) => {
            error!(user_id = identity.user_id, error = %e, "Gate check failed");
            send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
            return Ok(false);
        }
    };

    match gate {
        Gate::Allowed => Ok(true),
        Gate::Denied(denial) => {
            // Fail closed: whatever the in-memory cursor says, the flow ends here.
            dialogue.exit().await?;
            send_html_with_markup(
                bot,
                msg.chat.id,
                denial.user_message(),
                logged_out_reply_keyboard(),
            )
            .await?;
            Ok(false)
        }
    }
}

async fn handle_text_message(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    text: &str,
    store: &Arc<Store>,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<()> {
    let (command, args) = split_command(text);

    // Session commands work regardless of the gate.
    match command {
        "/start" => return handle_start(bot, msg, identity, sessions, dialogue).await,
        "/login" => return handle_login(bot, msg, identity, sessions, dialogue).await,
        "/logout" => return handle_logout(bot, msg, identity, sessions, dialogue).await,
        _ => {}
    }

    if !pass_gate(bot, msg, identity, sessions, dialogue).await? {
        return Ok(());
    }

    let state = dialogue.get().await?.unwrap_or_default();
    match state {
        FlowState::AddTitle
        | FlowState::AddLink { .. }
        | FlowState::AddCategory { .. }
        | FlowState::AddDescription { .. }
        | FlowState::AddPriority { .. } => {
            handle_add_flow_input(bot, msg, dialogue, store, identity.user_id, &state, text).await
        }
        FlowState::EditValue { wish_id, field } => {
            handle_edit_value_input(
                bot,
                msg,
                dialogue,
                store,
                identity.user_id,
                wish_id,
                field,
                text,
            )
            .await
        }
        FlowState::EditPhoto { wish_id } => {
            handle_edit_photo_text(bot, msg, dialogue, store, identity.user_id, wish_id, text)
                .await
        }
        FlowState::Idle => {
            handle_idle_command(bot, msg, identity, command, args, text, store, sessions, dialogue)
                .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_idle_command(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    command: &str,
    args: &str,
    full_text: &str,
    store: &Arc<Store>,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<()> {
    let user_id = identity.user_id;
    match command {
        "/add" => {
            dialogue.update(FlowState::AddTitle).await?;
            send_html(bot, msg.chat.id, PROMPT_TITLE).await?;
        }
        "/list" => match store.list_wishes(user_id).await {
            Ok(wishes) => {
                send_wish_list(bot, msg.chat.id, &wishes, EMPTY_LIST_TEXT, true).await?;
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to list wishes");
                send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
            }
        },
        "/edit" => match store.list_wishes(user_id).await {
            Ok(wishes) if wishes.is_empty() => {
                send_html(bot, msg.chat.id, EMPTY_LIST_TEXT).await?;
            }
            Ok(wishes) => {
                send_html(bot, msg.chat.id, "✏️ Pick a wish to edit:").await?;
                send_wish_list(bot, msg.chat.id, &wishes, EMPTY_LIST_TEXT, true).await?;
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to list wishes");
                send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
            }
        },
        "/delete" => match store.list_wishes(user_id).await {
            Ok(wishes) if wishes.is_empty() => {
                send_html(bot, msg.chat.id, "The wishlist is empty. Nothing to delete.").await?;
            }
            Ok(mut wishes) => {
                wishes.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
                send_html_with_markup(
                    bot,
                    msg.chat.id,
                    "Pick the wish you want to delete:",
                    list_actions_keyboard(&wishes),
                )
                .await?;
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to list wishes");
                send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
            }
        },
        "/search" => {
            if args.is_empty() {
                send_html(bot, msg.chat.id, "Usage: /search &lt;word&gt;").await?;
                return Ok(());
            }
            match store.list_wishes(user_id).await {
                Ok(wishes) => {
                    let needle = args.to_lowercase();
                    let matched: Vec<Wish> = wishes
                        .into_iter()
                        .filter(|wish| {
                            wish.title.to_lowercase().contains(&needle)
                                || wish.description.to_lowercase().contains(&needle)
                        })
                        .collect();
                    send_wish_list(bot, msg.chat.id, &matched, "No matches found.", true).await?;
                }
                Err(e) => {
                    error!(user_id, error = %e, "Failed to search wishes");
                    send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
                }
            }
        }
        "/categories" => match store.collect_categories().await {
            Ok(categories) if categories.is_empty() => {
                send_html(
                    bot,
                    msg.chat.id,
                    "No categories yet. Add a wish with a category via /add.",
                )
                .await?;
            }
            Ok(categories) => {
                let lines: Vec<String> = categories
                    .iter()
                    .map(|category| {
                        format!("{} {}", category_to_emoji(category), escape_html(category))
                    })
                    .collect();
                send_html(bot, msg.chat.id, &lines.join("\n")).await?;
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to collect categories");
                send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
            }
        },
        "/others" => {
            let Some(other_id) = sessions.allow_list().select_other_user(user_id) else {
                send_html(
                    bot,
                    msg.chat.id,
                    "No other users have access to this bot yet.",
                )
                .await?;
                return Ok(());
            };
            match store.list_wishes(other_id).await {
                Ok(wishes) => {
                    send_wish_list(bot, msg.chat.id, &wishes, EMPTY_PARTNER_LIST_TEXT, false)
                        .await?;
                }
                Err(e) => {
                    error!(user_id, other_id, error = %e, "Failed to list partner wishes");
                    send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
                }
            }
        }
        "/export" => match store.list_wishes(user_id).await {
            Ok(wishes) if wishes.is_empty() => {
                send_html(
                    bot,
                    msg.chat.id,
                    "Nothing to export yet. Add a wish first with /add.",
                )
                .await?;
            }
            Ok(_) => {
                send_html_with_markup(
                    bot,
                    msg.chat.id,
                    "Choose the export format:",
                    export_menu_keyboard(),
                )
                .await?;
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to list wishes");
                send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
            }
        },
        "/help" => {
            send_html(bot, msg.chat.id, HELP_TEXT).await?;
        }
        "/cancel" => {
            send_html(bot, msg.chat.id, "Nothing to cancel.").await?;
        }
        _ if command.starts_with('/') => {
            send_html(bot, msg.chat.id, "Unknown command. See /help.").await?;
        }
        _ if contains_url(full_text) => {
            // Single-shot add: one message with a link becomes a wish.
            if let Some(draft) = parse_quick_add(full_text) {
                commit_draft(bot, msg.chat.id, user_id, store, draft).await?;
            }
        }
        _ => {
            send_html(
                bot,
                msg.chat.id,
                "Send /add to create a wish step by step, or paste a link to add it instantly.",
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_photo_message(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    store: &Arc<Store>,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<()> {
    if !pass_gate(bot, msg, identity, sessions, dialogue).await? {
        return Ok(());
    }

    let state = dialogue.get().await?.unwrap_or_default();
    match state {
        FlowState::EditPhoto { wish_id } => {
            handle_edit_photo_message(bot, msg, dialogue, store, identity.user_id, wish_id).await
        }
        FlowState::Idle => {
            let caption = msg.caption().unwrap_or("").trim();
            if caption.is_empty() {
                send_html(
                    bot,
                    msg.chat.id,
                    "Add a caption so I know what the wish is, or use /add.",
                )
                .await?;
                return Ok(());
            }
            let Some(mut draft) = parse_quick_add(caption) else {
                send_html(bot, msg.chat.id, "I could not read that caption. Try /add.").await?;
                return Ok(());
            };
            if let Some(largest) = msg.photo().and_then(|photos| photos.last()) {
                draft.photo_file_id = Some(largest.file.id.0.clone());
                draft.photo = download_photo_if_small(bot, largest).await;
            }
            commit_draft(bot, msg.chat.id, identity.user_id, store, draft).await
        }
        _ => {
            send_html(bot, msg.chat.id, "Please answer with text, or send /cancel.").await?;
            Ok(())
        }
    }
}

async fn handle_start(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<()> {
    dialogue.exit().await?;
    match sessions.start(identity).await {
        Ok(true) => {
            send_html_with_markup(
                bot,
                msg.chat.id,
                "Hi! I keep your wishlist. Use /help to see what I can do.",
                active_reply_keyboard(),
            )
            .await?;
        }
        Ok(false) => {
            send_html_with_markup(
                bot,
                msg.chat.id,
                "Hi! This bot is private and your account is not on the access list. \
                 Send your Telegram ID or username to the administrator, then use /login.",
                logged_out_reply_keyboard(),
            )
            .await?;
        }
        Err(e) => {
            error!(user_id = identity.user_id, error = %e, "Start failed");
            send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

async fn handle_login(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<()> {
    use crate::session::LoginOutcome;

    dialogue.exit().await?;
    match sessions.login(identity).await {
        Ok(LoginOutcome::Accepted) => {
            send_html_with_markup(
                bot,
                msg.chat.id,
                "Login successful! The main commands are available now. Use /list or /help.",
                active_reply_keyboard(),
            )
            .await?;
        }
        Ok(LoginOutcome::Rejected { attempted }) => {
            let mut lines = vec![
                "Login failed. Make sure your Telegram ID or username is on the access list."
                    .to_string(),
            ];
            if let Some(id) = attempted.first() {
                lines.push(format!("ID: {}", escape_html(id)));
            }
            if let Some(handle) = attempted.iter().find(|value| value.starts_with('@')) {
                lines.push(format!("Username: {}", escape_html(handle)));
            }
            send_html_with_markup(
                bot,
                msg.chat.id,
                &lines.join("\n"),
                logged_out_reply_keyboard(),
            )
            .await?;
        }
        Err(e) => {
            error!(user_id = identity.user_id, error = %e, "Login failed");
            send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

async fn handle_logout(
    bot: &Bot,
    msg: &Message,
    identity: &Identity,
    sessions: &Arc<SessionManager>,
    dialogue: &WishDialogue,
) -> Result<()> {
    let was_active = sessions
        .store()
        .is_session_active(identity.user_id)
        .await
        .unwrap_or(false);

    if !was_active {
        send_html(bot, msg.chat.id, "You are not logged in. Use /login.").await?;
        return Ok(());
    }

    dialogue.exit().await?;
    match sessions.logout(identity.user_id).await {
        Ok(()) => {
            send_html_with_markup(
                bot,
                msg.chat.id,
                "You are logged out. Use /login to come back.",
                logged_out_reply_keyboard(),
            )
            .await?;
        }
        Err(e) => {
            error!(user_id = identity.user_id, error = %e, "Logout failed");
            send_html(bot, msg.chat.id, MSG_GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

/// Send a wish list grouped by category, one message per category, with
/// optional per-wish action buttons.
pub async fn send_wish_list(
    bot: &Bot,
    chat_id: ChatId,
    wishes: &[Wish],
    empty_text: &str,
    with_actions: bool,
) -> Result<()> {
    if wishes.is_empty() {
        send_html(bot, chat_id, empty_text).await?;
        return Ok(());
    }

    for (category, items) in sort_wishes_for_display(wishes) {
        let emoji = if category == DEFAULT_CATEGORY_TITLE {
            DEFAULT_CATEGORY_EMOJI
        } else {
            category_to_emoji(&category)
        };
        let mut lines = vec![format!("{emoji} {}", escape_html(&category))];
        for wish in &items {
            lines.push(build_wish_block(wish));
            lines.push(String::new());
        }
        let payload = lines.join("\n").trim().to_string();
        if with_actions {
            send_html_with_markup(bot, chat_id, &payload, list_actions_keyboard(&items)).await?;
        } else {
            send_html(bot, chat_id, &payload).await?;
        }
    }
    Ok(())
}
