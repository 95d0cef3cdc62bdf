//! Configuration and identity resolution.
//!
//! The allow-list of authorized users is loaded once at process start from
//! the `AUTHORIZED_USER_IDS` environment variable. Identifiers are either
//! numeric Telegram user ids or `@handles`; both are kept in one canonical
//! set so membership checks are a plain lookup.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

pub const ENV_AUTHORIZED_USERS_KEY: &str = "AUTHORIZED_USER_IDS";
pub const DEFAULT_DATA_FILE: &str = "wishlist_data.json";

/// Normalize a raw identifier into its canonical form.
///
/// - leading/trailing whitespace is dropped;
/// - `@Handle` becomes `@handle`;
/// - purely numeric input is kept as-is;
/// - anything else is treated as a bare handle and gets the `@` prefix.
///
/// Returns `None` for empty input. Canonicalization is idempotent.
pub fn canonicalize_identifier(value: &str) -> Option<String> {
    let text = value.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(rest) = text.strip_prefix('@') {
        return Some(format!("@{}", rest.to_lowercase()));
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return Some(text.to_string());
    }
    Some(format!("@{}", text.to_lowercase()))
}

/// A user identity as seen on an inbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: Option<String>,
}

impl Identity {
    pub fn new(user_id: i64, username: Option<String>) -> Self {
        Self { user_id, username }
    }

    /// Identifiers to try against the allow-list, in match order:
    /// the numeric id first, then the `@handle` when known.
    pub fn candidates(&self) -> Vec<String> {
        let mut out = vec![self.user_id.to_string()];
        if let Some(username) = &self.username {
            out.push(format!("@{username}"));
        }
        out
    }
}

/// Statically configured set of authorized identifiers.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    identifiers: HashSet<String>,
}

impl AllowList {
    pub fn parse(raw: &str) -> Self {
        let mut identifiers = HashSet::new();
        for chunk in raw.split(|c: char| c.is_whitespace() || c == ',') {
            if let Some(identifier) = canonicalize_identifier(chunk) {
                identifiers.insert(identifier);
            }
        }
        Self { identifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Membership check for an already-canonical identifier.
    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Whether any of the identity's candidate identifiers is allowed.
    pub fn is_authorized(&self, identity: &Identity) -> bool {
        self.matched_identifier(identity).is_some()
    }

    /// The first canonical candidate present in the allow-list, if any.
    pub fn matched_identifier(&self, identity: &Identity) -> Option<String> {
        identity
            .candidates()
            .iter()
            .filter_map(|raw| canonicalize_identifier(raw))
            .find(|canonical| self.identifiers.contains(canonical))
    }

    /// Numeric ids from the allow-list, used to seed per-user wish lists
    /// and to pick the partner list for /others.
    pub fn numeric_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .identifiers
            .iter()
            .filter_map(|identifier| identifier.parse::<i64>().ok())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The first authorized numeric user other than `current`, if any.
    pub fn select_other_user(&self, current: i64) -> Option<i64> {
        self.numeric_ids().into_iter().find(|id| *id != current)
    }
}

/// Process configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub allow_list: AllowList,
    /// Postgres connection string; when absent the JSON file backend is used.
    pub database_url: Option<String>,
    pub data_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN must be set")?
            .trim()
            .to_string();

        let allow_list = AllowList::parse(
            &env::var(ENV_AUTHORIZED_USERS_KEY).unwrap_or_default(),
        );
        if allow_list.is_empty() {
            warn!(
                "No authorized Telegram users configured. Set {} to allow access.",
                ENV_AUTHORIZED_USERS_KEY
            );
        }

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        let data_file = env::var("WISHBOT_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_FILE));

        Ok(Self {
            bot_token,
            allow_list,
            database_url,
            data_file,
        })
    }
}
