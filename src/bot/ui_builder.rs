//! Keyboard builders for command menus and inline actions.
//!
//! Callback payloads follow the `action:id[:sub[:value]]` convention that
//! `callback_handler` parses.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup as ReplyKeyboardMarkup,
};

use crate::format::truncate;
use crate::wish::Wish;

/// Persistent reply keyboard for an active session.
pub fn active_reply_keyboard() -> ReplyKeyboardMarkup {
    let rows = vec![
        vec![
            KeyboardButton::new("/add"),
            KeyboardButton::new("/list"),
            KeyboardButton::new("/help"),
        ],
        vec![
            KeyboardButton::new("/edit"),
            KeyboardButton::new("/delete"),
            KeyboardButton::new("/others"),
        ],
        vec![
            KeyboardButton::new("/search"),
            KeyboardButton::new("/categories"),
            KeyboardButton::new("/export"),
        ],
        vec![KeyboardButton::new("/logout")],
    ];
    let mut markup = ReplyKeyboardMarkup::new(rows);
    markup.resize_keyboard = true;
    markup
}

/// Reply keyboard shown while logged out.
pub fn logged_out_reply_keyboard() -> ReplyKeyboardMarkup {
    let mut markup = ReplyKeyboardMarkup::new(vec![vec![KeyboardButton::new("/login")]]);
    markup.resize_keyboard = true;
    markup
}

/// Per-wish edit/delete buttons shown under a list chunk.
pub fn list_actions_keyboard(wishes: &[Wish]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = wishes
        .iter()
        .map(|wish| {
            vec![
                InlineKeyboardButton::callback(
                    format!("✏️ {}", truncate(&wish.title, 18)),
                    format!("edit:{}", wish.id),
                ),
                InlineKeyboardButton::callback("❌", format!("delete:{}", wish.id)),
            ]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Field-selection menu on the edit card.
pub fn edit_menu_keyboard(wish_id: i64, has_photo: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![InlineKeyboardButton::callback(
            "📝 Title",
            format!("edit:{wish_id}:title"),
        )],
        vec![
            InlineKeyboardButton::callback("🔗 Link", format!("edit:{wish_id}:link")),
            InlineKeyboardButton::callback("🗑️ Clear link", format!("edit:{wish_id}:link:clear")),
        ],
        vec![
            InlineKeyboardButton::callback("🏷️ Category", format!("edit:{wish_id}:category")),
            InlineKeyboardButton::callback(
                "💬 Description",
                format!("edit:{wish_id}:description"),
            ),
        ],
        vec![InlineKeyboardButton::callback(
            "⭐ Priority",
            format!("edit:{wish_id}:priority"),
        )],
    ];

    let mut photo_row = vec![InlineKeyboardButton::callback(
        "🖼️ Photo",
        format!("edit:{wish_id}:photo"),
    )];
    if has_photo {
        photo_row.push(InlineKeyboardButton::callback(
            "🗑️ Remove photo",
            format!("edit:{wish_id}:photo:clear"),
        ));
    }
    rows.push(photo_row);

    InlineKeyboardMarkup::new(rows)
}

/// One-of-five priority choice.
pub fn priority_menu_keyboard(wish_id: i64) -> InlineKeyboardMarkup {
    let choices: Vec<InlineKeyboardButton> = (1..=5)
        .map(|value| {
            InlineKeyboardButton::callback(
                value.to_string(),
                format!("edit:{wish_id}:priority:{value}"),
            )
        })
        .collect();
    InlineKeyboardMarkup::new(vec![
        choices,
        vec![InlineKeyboardButton::callback(
            "⬅️ Back",
            format!("edit:{wish_id}:back"),
        )],
    ])
}

/// Two-step delete confirmation.
pub fn delete_confirm_keyboard(wish_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Yes, delete", format!("delete:{wish_id}:confirm")),
        InlineKeyboardButton::callback("Cancel", format!("delete:{wish_id}:cancel")),
    ]])
}

/// Export format choice.
pub fn export_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("TXT", "export:txt"),
        InlineKeyboardButton::callback("CSV", "export:csv"),
    ]])
}
