//! # Core Traits (Ports)
//!
//! Any backend plugin must implement these traits to be used by the binary.
//! Implementations hold no state between calls beyond their connection.

use crate::models::{Category, CategoryFilter, NewReply, NewThread, Reply, Thread, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Read access to `forum_categories`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Every category, unfiltered and unpaginated.
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>>;
}

/// Thread persistence contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    /// Threads matching `filter`, newest first.
    async fn list_threads(&self, filter: CategoryFilter) -> anyhow::Result<Vec<Thread>>;

    /// A single thread by primary key. `Ok(None)` when no row matches.
    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>>;

    /// Inserts a thread. The created row is not returned; callers refetch.
    async fn create_thread(&self, thread: NewThread) -> anyhow::Result<()>;
}

/// Reply persistence contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReplyRepo: Send + Sync {
    /// Replies of one thread, oldest first.
    async fn list_replies(&self, thread_id: Uuid) -> anyhow::Result<Vec<Reply>>;

    /// Inserts a reply. The created row is not returned; callers refetch.
    async fn create_reply(&self, reply: NewReply) -> anyhow::Result<()>;
}

/// Identity contract, provided by whatever handles sign-in.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;
}
