//! Postgres-backed wish store.
//!
//! Each mutation is a single statement, so the durability unit is one
//! logical operation. Column names for field updates come from a closed
//! match over [`WishUpdate`]; user input is only ever bound as a
//! parameter, never interpolated into SQL.

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use tracing::info;

use super::sort_categories;
use crate::wish::{Wish, WishDraft, WishUpdate};

const WISH_COLUMNS: &str =
    "id, owner_id, title, link, category, description, priority, photo_file_id, photo";

#[derive(sqlx::FromRow)]
struct WishRow {
    id: i64,
    #[allow(dead_code)]
    owner_id: i64,
    title: String,
    link: String,
    category: String,
    description: String,
    priority: i32,
    photo_file_id: Option<String>,
    photo: Option<Vec<u8>>,
}

impl From<WishRow> for Wish {
    fn from(row: WishRow) -> Self {
        Wish {
            id: row.id,
            title: row.title,
            link: row.link,
            category: row.category,
            description: row.description,
            priority: row.priority.clamp(1, 5) as u8,
            photo_file_id: row.photo_file_id,
            photo: row.photo,
        }
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS wishes (
                id BIGSERIAL PRIMARY KEY,
                owner_id BIGINT NOT NULL,
                title TEXT NOT NULL,
                link TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                priority INTEGER NOT NULL,
                photo_file_id TEXT,
                photo BYTEA
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create wishes table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS wishes_owner_idx ON wishes (owner_id)")
            .execute(&self.pool)
            .await
            .context("Failed to create owner index")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                user_id BIGINT PRIMARY KEY,
                is_active BOOLEAN NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create sessions table")?;

        info!("Database schema initialized");
        Ok(())
    }

    pub async fn create_wish(&self, owner_id: i64, draft: WishDraft) -> Result<Wish> {
        let row = sqlx::query_as::<_, WishRow>(&format!(
            "INSERT INTO wishes
                 (owner_id, title, link, category, description, priority, photo_file_id, photo)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {WISH_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&draft.title)
        .bind(&draft.link)
        .bind(&draft.category)
        .bind(&draft.description)
        .bind(draft.priority as i32)
        .bind(&draft.photo_file_id)
        .bind(&draft.photo)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert wish")?;

        info!(user_id = owner_id, wish_id = row.id, "Wish created");
        Ok(row.into())
    }

    pub async fn get_wish(&self, owner_id: i64, wish_id: i64) -> Result<Option<Wish>> {
        let row = sqlx::query_as::<_, WishRow>(&format!(
            "SELECT {WISH_COLUMNS} FROM wishes WHERE owner_id = $1 AND id = $2"
        ))
        .bind(owner_id)
        .bind(wish_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read wish")?;
        Ok(row.map(Wish::from))
    }

    pub async fn list_wishes(&self, owner_id: i64) -> Result<Vec<Wish>> {
        let rows = sqlx::query_as::<_, WishRow>(&format!(
            "SELECT {WISH_COLUMNS} FROM wishes WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wishes")?;
        Ok(rows.into_iter().map(Wish::from).collect())
    }

    pub async fn update_wish(
        &self,
        owner_id: i64,
        wish_id: i64,
        update: &WishUpdate,
    ) -> Result<Option<Wish>> {
        // The column name is selected by this match and nothing else.
        let row = match update {
            WishUpdate::Title(value) => self.update_text(owner_id, wish_id, "title", value).await?,
            WishUpdate::Link(value) => self.update_text(owner_id, wish_id, "link", value).await?,
            WishUpdate::Category(value) => {
                self.update_text(owner_id, wish_id, "category", value).await?
            }
            WishUpdate::Description(value) => {
                self.update_text(owner_id, wish_id, "description", value).await?
            }
            WishUpdate::Priority(value) => {
                sqlx::query_as::<_, WishRow>(&format!(
                    "UPDATE wishes SET priority = $1
                     WHERE owner_id = $2 AND id = $3
                     RETURNING {WISH_COLUMNS}"
                ))
                .bind(*value as i32)
                .bind(owner_id)
                .bind(wish_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to update priority")?
            }
            WishUpdate::Photo(photo) => {
                let (file_id, bytes) = match photo {
                    Some(photo) => (Some(photo.file_id.clone()), photo.bytes.clone()),
                    None => (None, None),
                };
                sqlx::query_as::<_, WishRow>(&format!(
                    "UPDATE wishes SET photo_file_id = $1, photo = $2
                     WHERE owner_id = $3 AND id = $4
                     RETURNING {WISH_COLUMNS}"
                ))
                .bind(file_id)
                .bind(bytes)
                .bind(owner_id)
                .bind(wish_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to update photo")?
            }
        };

        if row.is_some() {
            info!(
                user_id = owner_id,
                wish_id,
                field = update.field_name(),
                "Wish field updated"
            );
        }
        Ok(row.map(Wish::from))
    }

    async fn update_text(
        &self,
        owner_id: i64,
        wish_id: i64,
        column: &'static str,
        value: &str,
    ) -> Result<Option<WishRow>> {
        sqlx::query_as::<_, WishRow>(&format!(
            "UPDATE wishes SET {column} = $1
             WHERE owner_id = $2 AND id = $3
             RETURNING {WISH_COLUMNS}"
        ))
        .bind(value)
        .bind(owner_id)
        .bind(wish_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update {column}"))
    }

    pub async fn delete_wish(&self, owner_id: i64, wish_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishes WHERE owner_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(wish_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete wish")?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(user_id = owner_id, wish_id, "Wish deleted");
        }
        Ok(removed)
    }

    pub async fn collect_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM wishes WHERE category <> ''")
                .fetch_all(&self.pool)
                .await
                .context("Failed to collect categories")?;
        sort_categories(&mut categories);
        Ok(categories)
    }

    pub async fn set_session(&self, user_id: i64, is_active: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (user_id, is_active, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (user_id)
             DO UPDATE SET is_active = EXCLUDED.is_active, updated_at = now()",
        )
        .bind(user_id)
        .bind(is_active)
        .execute(&self.pool)
        .await
        .context("Failed to persist session flag")?;
        Ok(())
    }

    pub async fn is_session_active(&self, user_id: i64) -> Result<bool> {
        let active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read session flag")?;
        Ok(active.unwrap_or(false))
    }
}
