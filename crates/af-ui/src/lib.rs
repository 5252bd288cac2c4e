//! # af-ui
//!
//! Text rendering of controller snapshots. The templates only print fields;
//! everything that needs a decision is worked out here first.

use af_core::{short_id, CategoryState, CategoryStore, Reply, Thread};
use af_view::{DetailView, ForumSnapshot, ListView, ViewMode};
use askama::Template;
use chrono::{DateTime, Utc};

pub struct SidebarEntry {
    pub name: String,
    pub active: bool,
}

pub struct ThreadCard {
    pub id: String,
    pub title: String,
    /// First two lines of the post
    pub excerpt: Vec<String>,
    pub author: String,
    pub date: String,
    pub category: Option<String>,
}

pub struct ComposerModal {
    pub title: String,
    pub category: String,
    pub content: String,
}

#[derive(Template)]
#[template(path = "list.txt")]
pub struct ListTemplate {
    pub sidebar: Vec<SidebarEntry>,
    pub category_notice: Option<String>,
    pub can_post: bool,
    pub loading: bool,
    pub cards: Vec<ThreadCard>,
    pub composer: Option<ComposerModal>,
}

pub struct ThreadHeader {
    pub title: String,
    pub author: String,
    pub date: String,
    pub category: Option<String>,
    pub content: String,
}

pub struct ReplyCard {
    pub id: String,
    pub author: String,
    pub date: String,
    pub content: String,
    pub in_reply_to: Option<String>,
    /// The inline composer is open under this reply
    pub composing: bool,
}

#[derive(Template)]
#[template(path = "thread.txt")]
pub struct ThreadTemplate {
    pub thread: Option<ThreadHeader>,
    pub replies_loading: bool,
    pub replies: Vec<ReplyCard>,
    pub signed_in: bool,
    pub draft: String,
}

fn date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn category_name(store: &CategoryStore, thread: &Thread) -> Option<String> {
    thread
        .category_id
        .and_then(|id| store.find_by_id(id))
        .map(|c| c.name.clone())
}

fn card(store: &CategoryStore, thread: &Thread) -> ThreadCard {
    ThreadCard {
        id: thread.id.to_string(),
        title: thread.title.clone(),
        excerpt: thread.content.lines().take(2).map(str::to_owned).collect(),
        author: short_id(&thread.author_id),
        date: date(&thread.created_at),
        category: category_name(store, thread),
    }
}

pub fn list_page(categories: &CategoryState, list: &ListView, signed_in: bool) -> ListTemplate {
    let store = categories.store();
    let active = store.label_for(list.filter).to_string();

    let mut sidebar = vec![SidebarEntry {
        name: "All".into(),
        active: active == "All",
    }];
    sidebar.extend(store.iter().map(|c| SidebarEntry {
        name: c.name.clone(),
        active: c.name == active,
    }));

    let category_notice = match categories {
        CategoryState::Failed(_) => Some("Categories could not be loaded.".to_string()),
        CategoryState::Loaded(s) if s.is_empty() => Some("No categories yet.".to_string()),
        _ => None,
    };

    let composer = list.composer.open.then(|| ComposerModal {
        title: list.composer.title.clone(),
        category: list
            .composer
            .category_id
            .and_then(|id| store.find_by_id(id))
            .map_or_else(|| "(none)".to_string(), |c| c.name.clone()),
        content: list.composer.content.clone(),
    });

    ListTemplate {
        sidebar,
        category_notice,
        can_post: signed_in,
        loading: list.threads.is_loading(),
        cards: list
            .threads
            .ready()
            .map(|threads| threads.iter().map(|t| card(&store, t)).collect())
            .unwrap_or_default(),
        composer,
    }
}

fn reply_card(reply: &Reply, composing: Option<uuid::Uuid>) -> ReplyCard {
    ReplyCard {
        id: reply.id.to_string(),
        author: short_id(&reply.author_id),
        date: timestamp(&reply.created_at),
        content: reply.content.clone(),
        in_reply_to: reply.parent_id.as_ref().map(short_id),
        composing: composing == Some(reply.id),
    }
}

pub fn thread_page(categories: &CategoryState, detail: &DetailView, signed_in: bool) -> ThreadTemplate {
    let store = categories.store();
    let thread = detail.thread.ready().map(|t| ThreadHeader {
        title: t.title.clone(),
        author: short_id(&t.author_id),
        date: timestamp(&t.created_at),
        category: category_name(&store, t),
        content: t.content.clone(),
    });

    ThreadTemplate {
        thread,
        replies_loading: detail.replies.is_loading(),
        replies: detail
            .replies
            .ready()
            .map(|replies| {
                replies
                    .iter()
                    .map(|r| reply_card(r, detail.composer.replying_to))
                    .collect()
            })
            .unwrap_or_default(),
        signed_in,
        draft: detail.composer.content.clone(),
    }
}

/// Renders whichever view the snapshot is in.
pub fn render(snapshot: &ForumSnapshot) -> askama::Result<String> {
    match &snapshot.view {
        ViewMode::List(list) => list_page(&snapshot.categories, list, snapshot.signed_in).render(),
        ViewMode::Detail(detail) => {
            thread_page(&snapshot.categories, detail, snapshot.signed_in).render()
        }
    }
}
