//! File-backed wish store.
//!
//! The whole collection lives in one JSON document: a map from owner id to
//! that user's wish list, a session map, and the next wish id. Every
//! mutation runs under a single process-wide async mutex and rewrites the
//! document in full, so concurrent requests are strictly serialized and a
//! reader never observes a partial write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{sort_categories, SessionRecord};
use crate::wish::{Wish, WishDraft, WishUpdate};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    users: BTreeMap<String, Vec<Wish>>,
    #[serde(default)]
    sessions: BTreeMap<String, SessionRecord>,
    #[serde(default = "first_wish_id")]
    next_wish_id: i64,
}

fn first_wish_id() -> i64 {
    1
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            sessions: BTreeMap::new(),
            next_wish_id: first_wish_id(),
        }
    }
}

pub struct JsonStore {
    path: PathBuf,
    state: Mutex<StoreDocument>,
}

impl JsonStore {
    /// Load the document (or start fresh), seed an empty list for every
    /// authorized numeric user, and write the file back so it exists on
    /// disk from the first run.
    pub fn open(path: impl AsRef<Path>, seed_user_ids: &[i64]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut document = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file {}", path.display()))?;
            match serde_json::from_str::<StoreDocument>(&raw) {
                Ok(document) => document,
                Err(e) => {
                    warn!(error = %e, "Failed to decode storage file, starting fresh");
                    StoreDocument::default()
                }
            }
        } else {
            StoreDocument::default()
        };

        for user_id in seed_user_ids {
            document.users.entry(user_id.to_string()).or_default();
        }

        // Never reuse an id, even after hand-edits to the file.
        let max_id = document
            .users
            .values()
            .flatten()
            .map(|wish| wish.id)
            .max()
            .unwrap_or(0);
        if document.next_wish_id <= max_id {
            document.next_wish_id = max_id + 1;
        }

        persist(&path, &document)?;
        info!(path = %path.display(), "Wish store loaded");

        Ok(Self {
            path,
            state: Mutex::new(document),
        })
    }

    pub async fn create_wish(&self, owner_id: i64, draft: WishDraft) -> Result<Wish> {
        let mut document = self.state.lock().await;
        let id = document.next_wish_id;
        document.next_wish_id += 1;

        let wish = Wish {
            id,
            title: draft.title,
            link: draft.link,
            category: draft.category,
            description: draft.description,
            priority: draft.priority,
            photo_file_id: draft.photo_file_id,
            photo: draft.photo,
        };
        document
            .users
            .entry(owner_id.to_string())
            .or_default()
            .push(wish.clone());
        persist(&self.path, &document)?;
        info!(user_id = owner_id, wish_id = id, "Wish created");
        Ok(wish)
    }

    pub async fn get_wish(&self, owner_id: i64, wish_id: i64) -> Result<Option<Wish>> {
        let document = self.state.lock().await;
        Ok(document
            .users
            .get(&owner_id.to_string())
            .and_then(|wishes| wishes.iter().find(|wish| wish.id == wish_id))
            .cloned())
    }

    pub async fn list_wishes(&self, owner_id: i64) -> Result<Vec<Wish>> {
        let document = self.state.lock().await;
        Ok(document
            .users
            .get(&owner_id.to_string())
            .cloned()
            .unwrap_or_default())
    }

    pub async fn update_wish(
        &self,
        owner_id: i64,
        wish_id: i64,
        update: &WishUpdate,
    ) -> Result<Option<Wish>> {
        let mut document = self.state.lock().await;
        let updated = document
            .users
            .entry(owner_id.to_string())
            .or_default()
            .iter_mut()
            .find(|wish| wish.id == wish_id)
            .map(|wish| {
                update.apply(wish);
                wish.clone()
            });

        if updated.is_some() {
            persist(&self.path, &document)?;
            info!(
                user_id = owner_id,
                wish_id,
                field = update.field_name(),
                "Wish field updated"
            );
        } else {
            debug!(user_id = owner_id, wish_id, "Update target not found");
        }
        Ok(updated)
    }

    pub async fn delete_wish(&self, owner_id: i64, wish_id: i64) -> Result<bool> {
        let mut document = self.state.lock().await;
        let wishes = document.users.entry(owner_id.to_string()).or_default();
        let original_len = wishes.len();
        wishes.retain(|wish| wish.id != wish_id);
        let removed = wishes.len() != original_len;

        if removed {
            persist(&self.path, &document)?;
            info!(user_id = owner_id, wish_id, "Wish deleted");
        }
        Ok(removed)
    }

    pub async fn collect_categories(&self) -> Result<Vec<String>> {
        let document = self.state.lock().await;
        let mut seen = std::collections::HashSet::new();
        let mut categories = Vec::new();
        for wishes in document.users.values() {
            for wish in wishes {
                let name = wish.category.trim();
                if !name.is_empty() && seen.insert(name.to_string()) {
                    categories.push(name.to_string());
                }
            }
        }
        sort_categories(&mut categories);
        Ok(categories)
    }

    pub async fn set_session(&self, user_id: i64, is_active: bool) -> Result<()> {
        let mut document = self.state.lock().await;
        document.sessions.insert(
            user_id.to_string(),
            SessionRecord {
                is_active,
                updated_at: Utc::now(),
            },
        );
        persist(&self.path, &document)?;
        debug!(user_id, is_active, "Session flag persisted");
        Ok(())
    }

    pub async fn is_session_active(&self, user_id: i64) -> Result<bool> {
        let document = self.state.lock().await;
        Ok(document
            .sessions
            .get(&user_id.to_string())
            .map(|session| session.is_active)
            .unwrap_or(false))
    }
}

fn persist(path: &Path, document: &StoreDocument) -> Result<()> {
    let raw = serde_json::to_string_pretty(document).context("Failed to serialize store")?;
    fs::write(path, raw)
        .with_context(|| format!("Failed to write store file {}", path.display()))
}
