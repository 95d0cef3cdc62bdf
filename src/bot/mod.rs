//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles incoming commands, flow input and photos
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards
//! - `dialogue_manager`: Maps flow transitions onto sends and store calls

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

// Re-export utility functions that might be used elsewhere
pub use callback_handler::{parse_callback, CallbackAction, CallbackParseError, ExportFormat};
pub use dialogue_manager::show_edit_card;
pub use message_handler::send_wish_list;
