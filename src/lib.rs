//! # Wishbot
//!
//! A private wishlist Telegram bot for a small fixed set of users:
//! add, list, edit, delete, search, categorize and export wishes through
//! guided conversations, with a JSON-file or Postgres store behind one
//! interface.

pub mod bot;
pub mod config;
pub mod dialogue;
pub mod format;
pub mod quick_add;
pub mod session;
pub mod storage;
pub mod transport;
pub mod wish;
