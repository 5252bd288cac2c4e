//! In-memory backend for tests in this and downstream crates.
//!
//! Behaves like the relational backend: filters and orders on read, stamps
//! ids and timestamps on insert, and can be told to fail any operation.

use crate::models::{
    sort_replies_oldest_first, sort_threads_newest_first, Category, CategoryFilter, NewReply,
    NewThread, Reply, Thread,
};
use crate::traits::{CategoryRepo, ReplyRepo, ThreadRepo};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    threads: Vec<Thread>,
    replies: Vec<Reply>,
    clock: Option<DateTime<Utc>>,
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListCategories,
    ListThreads,
    GetThread,
    CreateThread,
    ListReplies,
    CreateReply,
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    failing: Mutex<Vec<Op>>,
    writes: Mutex<usize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_categories(self, categories: Vec<Category>) -> Self {
        self.tables.lock().await.categories = categories;
        self
    }

    pub async fn insert_thread(&self, thread: Thread) {
        self.tables.lock().await.threads.push(thread);
    }

    pub async fn insert_reply(&self, reply: Reply) {
        self.tables.lock().await.replies.push(reply);
    }

    /// Makes every future call of `op` fail until `recover` is called.
    pub async fn fail(&self, op: Op) {
        self.failing.lock().await.push(op);
    }

    pub async fn recover(&self, op: Op) {
        self.failing.lock().await.retain(|o| *o != op);
    }

    /// Number of successful inserts so far.
    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }

    pub async fn threads(&self) -> Vec<Thread> {
        self.tables.lock().await.threads.clone()
    }

    pub async fn replies(&self) -> Vec<Reply> {
        self.tables.lock().await.replies.clone()
    }

    async fn check(&self, op: Op) -> anyhow::Result<()> {
        if self.failing.lock().await.contains(&op) {
            anyhow::bail!("injected failure for {op:?}");
        }
        Ok(())
    }
}

impl Tables {
    /// Strictly increasing timestamps so inserts order deterministically.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = match self.clock {
            Some(last) => std::cmp::max(Utc::now(), last + Duration::milliseconds(1)),
            None => Utc::now(),
        };
        self.clock = Some(now);
        now
    }
}

#[async_trait]
impl CategoryRepo for InMemoryBackend {
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        self.check(Op::ListCategories).await?;
        Ok(self.tables.lock().await.categories.clone())
    }
}

#[async_trait]
impl ThreadRepo for InMemoryBackend {
    async fn list_threads(&self, filter: CategoryFilter) -> anyhow::Result<Vec<Thread>> {
        self.check(Op::ListThreads).await?;
        let mut rows: Vec<Thread> = self
            .tables
            .lock()
            .await
            .threads
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_threads_newest_first(&mut rows);
        Ok(rows)
    }

    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        self.check(Op::GetThread).await?;
        Ok(self
            .tables
            .lock()
            .await
            .threads
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn create_thread(&self, thread: NewThread) -> anyhow::Result<()> {
        self.check(Op::CreateThread).await?;
        let mut tables = self.tables.lock().await;
        let created_at = tables.tick();
        tables.threads.push(Thread {
            id: Uuid::now_v7(),
            title: thread.title,
            content: thread.content,
            category_id: thread.category_id,
            author_id: thread.author_id,
            reply_count: 0,
            created_at,
        });
        *self.writes.lock().await += 1;
        Ok(())
    }
}

#[async_trait]
impl ReplyRepo for InMemoryBackend {
    async fn list_replies(&self, thread_id: Uuid) -> anyhow::Result<Vec<Reply>> {
        self.check(Op::ListReplies).await?;
        let mut rows: Vec<Reply> = self
            .tables
            .lock()
            .await
            .replies
            .iter()
            .filter(|r| r.thread_id == thread_id)
            .cloned()
            .collect();
        sort_replies_oldest_first(&mut rows);
        Ok(rows)
    }

    async fn create_reply(&self, reply: NewReply) -> anyhow::Result<()> {
        self.check(Op::CreateReply).await?;
        let mut tables = self.tables.lock().await;
        let created_at = tables.tick();
        tables.replies.push(Reply {
            id: Uuid::now_v7(),
            thread_id: reply.thread_id,
            parent_id: reply.parent_id,
            content: reply.content,
            author_id: reply.author_id,
            created_at,
        });
        *self.writes.lock().await += 1;
        Ok(())
    }
}
