//! # Domain Models
//!
//! These structs mirror the rows of the `forum_categories`, `forum_threads`
//! and `forum_replies` tables. Identifiers are UUIDs; new rows get v7 ids so
//! they sort by creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named grouping used to filter the thread list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    /// Display name, also the filter key shown in the sidebar
    pub name: String,
    pub description: Option<String>,
}

/// A top-level forum post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
    pub author_id: Uuid,
    /// Denormalized counter owned by the backend. Never bumped client-side.
    #[serde(default)]
    pub reply_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A response attached to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub thread_id: Uuid,
    /// Set when the reply was written from another reply's composer.
    /// Listing stays flat; this only records what was being answered.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `forum_threads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
    pub author_id: Uuid,
}

/// Insert payload for `forum_replies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReply {
    pub thread_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub author_id: Uuid,
}

/// The authenticated identity. Presence is the only authorization signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Which threads the list view asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(Uuid),
}

impl CategoryFilter {
    /// The equality filter on `category_id`, if any.
    pub fn category_id(&self) -> Option<Uuid> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Category(id) => Some(*id),
        }
    }

    pub fn matches(&self, thread: &Thread) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(id) => thread.category_id == Some(*id),
        }
    }
}

/// Newest first. Stable, so equal timestamps keep backend order.
pub fn sort_threads_newest_first(threads: &mut [Thread]) {
    threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Oldest first.
pub fn sort_replies_oldest_first(replies: &mut [Reply]) {
    replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

/// The `by 1a2b3c4d...` label used on cards.
pub fn short_id(id: &Uuid) -> String {
    let s = id.simple().to_string();
    format!("{}...", &s[..8])
}
