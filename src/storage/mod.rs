//! Wish and session persistence.
//!
//! Two interchangeable backends sit behind the [`Store`] enum: a single
//! JSON document guarded by one async mutex, and a Postgres database where
//! every mutation is one transactionally-scoped statement. Callers cannot
//! tell them apart; handlers receive an `Arc<Store>` so tests can inject a
//! throwaway file-backed store.

pub mod json;
pub mod postgres;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wish::{Wish, WishDraft, WishUpdate};

pub use json::JsonStore;
pub use postgres::PgStore;

/// Persisted per-user session flag. Authoritative over any in-memory
/// conversational cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Backend dispatch. All operations are scoped by `owner_id`; ids from a
/// different owner never match.
pub enum Store {
    Json(JsonStore),
    Postgres(PgStore),
}

impl Store {
    /// Assign an id, persist the draft and return the stored record.
    pub async fn create_wish(&self, owner_id: i64, draft: WishDraft) -> Result<Wish> {
        match self {
            Store::Json(store) => store.create_wish(owner_id, draft).await,
            Store::Postgres(store) => store.create_wish(owner_id, draft).await,
        }
    }

    pub async fn get_wish(&self, owner_id: i64, wish_id: i64) -> Result<Option<Wish>> {
        match self {
            Store::Json(store) => store.get_wish(owner_id, wish_id).await,
            Store::Postgres(store) => store.get_wish(owner_id, wish_id).await,
        }
    }

    /// All wishes of one owner. Display ordering is the presentation
    /// layer's concern.
    pub async fn list_wishes(&self, owner_id: i64) -> Result<Vec<Wish>> {
        match self {
            Store::Json(store) => store.list_wishes(owner_id).await,
            Store::Postgres(store) => store.list_wishes(owner_id).await,
        }
    }

    /// Read-modify-write of a single field. Returns `None` when the record
    /// does not exist for that owner.
    pub async fn update_wish(
        &self,
        owner_id: i64,
        wish_id: i64,
        update: &WishUpdate,
    ) -> Result<Option<Wish>> {
        match self {
            Store::Json(store) => store.update_wish(owner_id, wish_id, update).await,
            Store::Postgres(store) => store.update_wish(owner_id, wish_id, update).await,
        }
    }

    /// `Ok(false)` means "nothing to delete"; errors mean the backend
    /// itself failed.
    pub async fn delete_wish(&self, owner_id: i64, wish_id: i64) -> Result<bool> {
        match self {
            Store::Json(store) => store.delete_wish(owner_id, wish_id).await,
            Store::Postgres(store) => store.delete_wish(owner_id, wish_id).await,
        }
    }

    /// Distinct non-empty category labels across all owners, case
    /// preserved, sorted case-insensitively.
    pub async fn collect_categories(&self) -> Result<Vec<String>> {
        match self {
            Store::Json(store) => store.collect_categories().await,
            Store::Postgres(store) => store.collect_categories().await,
        }
    }

    pub async fn mark_session_active(&self, user_id: i64) -> Result<()> {
        match self {
            Store::Json(store) => store.set_session(user_id, true).await,
            Store::Postgres(store) => store.set_session(user_id, true).await,
        }
    }

    pub async fn mark_session_inactive(&self, user_id: i64) -> Result<()> {
        match self {
            Store::Json(store) => store.set_session(user_id, false).await,
            Store::Postgres(store) => store.set_session(user_id, false).await,
        }
    }

    /// Missing session records read as inactive.
    pub async fn is_session_active(&self, user_id: i64) -> Result<bool> {
        match self {
            Store::Json(store) => store.is_session_active(user_id).await,
            Store::Postgres(store) => store.is_session_active(user_id).await,
        }
    }
}

/// Sort category labels in place: case-insensitive order, case preserved.
pub(crate) fn sort_categories(categories: &mut Vec<String>) {
    categories.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
}
