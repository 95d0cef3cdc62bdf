//! Wish record model shared by both storage backends.

use serde::{Deserialize, Serialize};

/// One desired item owned by exactly one user.
///
/// Optional text fields use the empty string for "not set" so the persisted
/// document always carries the full attribute set. `photo_file_id` is the
/// transport-side file reference; `photo` holds downloaded bytes only when
/// the file was small enough to fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wish {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub priority: u8,
    #[serde(default)]
    pub photo_file_id: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<u8>>,
}

impl Wish {
    pub fn has_photo(&self) -> bool {
        self.photo_file_id.is_some() || self.photo.is_some()
    }
}

/// Field set collected by the Add-Wish flow before the record exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WishDraft {
    pub title: String,
    pub link: String,
    pub category: String,
    pub description: String,
    pub priority: u8,
    pub photo_file_id: Option<String>,
    pub photo: Option<Vec<u8>>,
}

/// Downloaded (or reference-only) photo attached to a wish.
#[derive(Debug, Clone, PartialEq)]
pub struct WishPhoto {
    pub file_id: String,
    /// Present only when the file was within the download cap.
    pub bytes: Option<Vec<u8>>,
}

/// Closed field selector for single-field updates.
///
/// Carrying the new value inside the variant keeps the set of mutable
/// fields a compile-time fact; the Postgres backend maps each variant to a
/// fixed column name and never interpolates caller-supplied text.
#[derive(Debug, Clone, PartialEq)]
pub enum WishUpdate {
    Title(String),
    /// Empty string clears the link.
    Link(String),
    /// Empty string moves the wish back to "uncategorized".
    Category(String),
    Description(String),
    Priority(u8),
    /// `None` removes the photo entirely.
    Photo(Option<WishPhoto>),
}

impl WishUpdate {
    /// Human-readable field name used in confirmations and logs.
    pub fn field_name(&self) -> &'static str {
        match self {
            WishUpdate::Title(_) => "title",
            WishUpdate::Link(_) => "link",
            WishUpdate::Category(_) => "category",
            WishUpdate::Description(_) => "description",
            WishUpdate::Priority(_) => "priority",
            WishUpdate::Photo(_) => "photo",
        }
    }

    /// Apply the update to an in-memory record (JSON backend path).
    pub fn apply(&self, wish: &mut Wish) {
        match self {
            WishUpdate::Title(value) => wish.title = value.clone(),
            WishUpdate::Link(value) => wish.link = value.clone(),
            WishUpdate::Category(value) => wish.category = value.clone(),
            WishUpdate::Description(value) => wish.description = value.clone(),
            WishUpdate::Priority(value) => wish.priority = *value,
            WishUpdate::Photo(None) => {
                wish.photo_file_id = None;
                wish.photo = None;
            }
            WishUpdate::Photo(Some(photo)) => {
                wish.photo_file_id = Some(photo.file_id.clone());
                wish.photo = photo.bytes.clone();
            }
        }
    }
}
