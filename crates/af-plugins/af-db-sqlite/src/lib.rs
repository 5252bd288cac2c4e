//! # af-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `af-core` domain models.

use af_core::models::{Category, CategoryFilter, NewReply, NewThread, Reply, Thread};
use af_core::traits::{CategoryRepo, ReplyRepo, ThreadRepo};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS forum_categories (
    id          BLOB PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT
);
CREATE TABLE IF NOT EXISTS forum_threads (
    id          BLOB PRIMARY KEY,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    category_id BLOB REFERENCES forum_categories(id),
    author_id   BLOB NOT NULL,
    reply_count INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS forum_threads_created_at ON forum_threads(created_at);
CREATE TABLE IF NOT EXISTS forum_replies (
    id          BLOB PRIMARY KEY,
    thread_id   BLOB NOT NULL REFERENCES forum_threads(id),
    parent_id   BLOB REFERENCES forum_replies(id),
    content     TEXT NOT NULL,
    author_id   BLOB NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS forum_replies_thread ON forum_replies(thread_id, created_at);
"#;

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

fn opt_blob_to_uuid(blob: Option<Vec<u8>>) -> anyhow::Result<Option<Uuid>> {
    blob.map(|b| blob_to_uuid(&b)).transpose()
}

fn row_to_thread(row: &SqliteRow) -> anyhow::Result<Thread> {
    Ok(Thread {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category_id: opt_blob_to_uuid(row.try_get("category_id")?)?,
        author_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("author_id")?)?,
        reply_count: row.try_get("reply_count")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_reply(row: &SqliteRow) -> anyhow::Result<Reply> {
    Ok(Reply {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        thread_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("thread_id")?)?,
        parent_id: opt_blob_to_uuid(row.try_get("parent_id")?)?,
        content: row.try_get("content")?,
        author_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("author_id")?)?,
        created_at: row.try_get("created_at")?,
    })
}

impl SqliteForumRepo {
    /// Connects and creates the forum tables if they are missing.
    pub async fn new(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        // Every connection to `sqlite::memory:` is its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { max_connections };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::info!(url, "sqlite forum store ready");
        Ok(Self { pool })
    }

    /// Adds a category. Used for seeding; the client never writes categories.
    pub async fn insert_category(&self, name: &str, description: Option<&str>) -> anyhow::Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO forum_categories (id, name, description) VALUES (?, ?, ?)")
            .bind(uuid_to_blob(id))
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn category_count(&self) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM forum_categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CategoryRepo for SqliteForumRepo {
    #[tracing::instrument(skip(self), err)]
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, description FROM forum_categories ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ThreadRepo for SqliteForumRepo {
    #[tracing::instrument(skip(self), err)]
    async fn list_threads(&self, filter: CategoryFilter) -> anyhow::Result<Vec<Thread>> {
        let rows = match filter.category_id() {
            None => {
                sqlx::query("SELECT * FROM forum_threads ORDER BY created_at DESC, rowid DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(category_id) => {
                sqlx::query(
                    "SELECT * FROM forum_threads WHERE category_id = ? ORDER BY created_at DESC, rowid DESC",
                )
                .bind(uuid_to_blob(category_id))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(row_to_thread).collect()
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        let row = sqlx::query("SELECT * FROM forum_threads WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_thread).transpose()
    }

    #[tracing::instrument(skip(self, thread), fields(author_id = %thread.author_id), err)]
    async fn create_thread(&self, thread: NewThread) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO forum_threads (id, title, content, category_id, author_id, reply_count, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(uuid_to_blob(Uuid::now_v7()))
        .bind(thread.title)
        .bind(thread.content)
        .bind(thread.category_id.map(uuid_to_blob))
        .bind(uuid_to_blob(thread.author_id))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReplyRepo for SqliteForumRepo {
    #[tracing::instrument(skip(self), err)]
    async fn list_replies(&self, thread_id: Uuid) -> anyhow::Result<Vec<Reply>> {
        let rows = sqlx::query(
            "SELECT * FROM forum_replies WHERE thread_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(uuid_to_blob(thread_id))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_reply).collect()
    }

    /// Inserts the reply and bumps the thread's `reply_count` atomically.
    #[tracing::instrument(skip(self, reply), fields(thread_id = %reply.thread_id), err)]
    async fn create_reply(&self, reply: NewReply) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE forum_threads SET reply_count = reply_count + 1 WHERE id = ?")
            .bind(uuid_to_blob(reply.thread_id))
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            anyhow::bail!("thread {} does not exist", reply.thread_id);
        }

        sqlx::query(
            "INSERT INTO forum_replies (id, thread_id, parent_id, content, author_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(Uuid::now_v7()))
        .bind(uuid_to_blob(reply.thread_id))
        .bind(reply.parent_id.map(uuid_to_blob))
        .bind(reply.content)
        .bind(uuid_to_blob(reply.author_id))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> SqliteForumRepo {
        SqliteForumRepo::new("sqlite::memory:", 5).await.unwrap()
    }

    fn new_thread(title: &str, category_id: Option<Uuid>, author_id: Uuid) -> NewThread {
        NewThread {
            title: title.into(),
            content: format!("{title} body"),
            category_id,
            author_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_threads() {
        let repo = repo().await;
        let ethics = repo.insert_category("Ethics", Some("Right and wrong")).await.unwrap();
        let author = Uuid::now_v7();

        repo.create_thread(new_thread("first", Some(ethics), author)).await.unwrap();
        repo.create_thread(new_thread("second", None, author)).await.unwrap();
        repo.create_thread(new_thread("third", Some(ethics), author)).await.unwrap();

        let all = repo.list_threads(CategoryFilter::All).await.unwrap();
        let titles: Vec<_> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        let filtered = repo.list_threads(CategoryFilter::Category(ethics)).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|t| t.category_id == Some(ethics)));

        let uncategorized = all.iter().find(|t| t.title == "second").unwrap();
        assert_eq!(uncategorized.category_id, None);
        assert_eq!(uncategorized.author_id, author);
    }

    #[tokio::test]
    async fn test_get_missing_thread_is_none() {
        let repo = repo().await;
        assert!(repo.get_thread(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reply_bumps_count_and_orders() {
        let repo = repo().await;
        let author = Uuid::now_v7();
        repo.create_thread(new_thread("topic", None, author)).await.unwrap();
        let thread = repo.list_threads(CategoryFilter::All).await.unwrap().remove(0);

        for (i, parent) in [None, None].into_iter().enumerate() {
            repo.create_reply(NewReply {
                thread_id: thread.id,
                parent_id: parent,
                content: format!("reply {i}"),
                author_id: author,
            })
            .await
            .unwrap();
        }
        let replies = repo.list_replies(thread.id).await.unwrap();
        repo.create_reply(NewReply {
            thread_id: thread.id,
            parent_id: Some(replies[0].id),
            content: "nested".into(),
            author_id: author,
        })
        .await
        .unwrap();

        let replies = repo.list_replies(thread.id).await.unwrap();
        let contents: Vec<_> = replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["reply 0", "reply 1", "nested"]);
        assert_eq!(replies[2].parent_id, Some(replies[0].id));

        let thread = repo.get_thread(thread.id).await.unwrap().unwrap();
        assert_eq!(thread.reply_count, 3);
    }

    #[tokio::test]
    async fn test_reply_to_missing_thread_fails() {
        let repo = repo().await;
        let result = repo
            .create_reply(NewReply {
                thread_id: Uuid::now_v7(),
                parent_id: None,
                content: "orphan".into(),
                author_id: Uuid::now_v7(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_categories_keep_insert_order() {
        let repo = repo().await;
        repo.insert_category("Ethics", None).await.unwrap();
        repo.insert_category("Logic", None).await.unwrap();

        let names: Vec<_> = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ethics", "Logic"]);
        assert_eq!(repo.category_count().await.unwrap(), 2);
    }
}
