//! # af-db-rest
//!
//! Repository ports over a hosted PostgREST-style backend: one table per
//! resource under `/rest/v1`, filters as `column=eq.value` query parameters,
//! ordering as `order=column.asc|desc`.

use af_core::models::{Category, CategoryFilter, NewReply, NewThread, Reply, Thread};
use af_core::traits::{CategoryRepo, ReplyRepo, ThreadRepo};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

pub const CATEGORIES_TABLE: &str = "forum_categories";
pub const THREADS_TABLE: &str = "forum_threads";
pub const REPLIES_TABLE: &str = "forum_replies";

/// PostgREST's media type for "exactly one row".
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

// =============================================================================
// Client
// =============================================================================

pub struct RestForumRepo {
    client: Client,
    /// `https://<project>/rest/v1`, no trailing slash
    base_url: String,
    api_key: SecretString,
    /// The signed-in user's token; the anon key is used when absent.
    access_token: Option<SecretString>,
    /// Column holding a reply's parent. Parents are not sent when unset.
    reply_parent_column: Option<String>,
}

impl RestForumRepo {
    pub fn new(project_url: &str, api_key: SecretString) -> Result<Self, RestError> {
        let trimmed = project_url.trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(RestError::InvalidUrl(project_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url: format!("{trimmed}/rest/v1"),
            api_key,
            access_token: None,
            reply_parent_column: None,
        })
    }

    pub fn with_access_token(mut self, token: SecretString) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn with_reply_parent_column(mut self, column: impl Into<String>) -> Self {
        self.reply_parent_column = Some(column.into());
        self
    }

    /// Insert body for `forum_replies`.
    pub fn reply_row(&self, reply: &NewReply) -> Value {
        let mut row = json!({
            "thread_id": reply.thread_id,
            "content": reply.content,
            "author_id": reply.author_id,
        });
        match (&self.reply_parent_column, reply.parent_id) {
            (Some(column), Some(parent_id)) => row[column.as_str()] = json!(parent_id),
            (None, Some(parent_id)) => {
                tracing::debug!(%parent_id, "no parent column configured; posting flat")
            }
            _ => {}
        }
        row
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_ref().unwrap_or(&self.api_key);
        request
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>, RestError> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(query)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// `Ok(None)` when no row matches.
    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Option<T>, RestError> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .header(header::ACCEPT, SINGLE_OBJECT)
            .query(query)
            .send()
            .await?;
        // PostgREST answers 406 when the row count is not exactly one.
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Ok(None);
        }
        let response = check(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<(), RestError> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, %body, "backend rejected request");
    Err(RestError::Status { status, body })
}

fn eq(column: &str, id: Uuid) -> (String, String) {
    (column.to_string(), format!("eq.{id}"))
}

fn select_all() -> (String, String) {
    ("select".to_string(), "*".to_string())
}

fn order(column: &str, ascending: bool) -> (String, String) {
    let dir = if ascending { "asc" } else { "desc" };
    ("order".to_string(), format!("{column}.{dir}"))
}

/// Query for `list_threads`.
pub fn threads_query(filter: CategoryFilter) -> Vec<(String, String)> {
    let mut query = vec![select_all(), order("created_at", false)];
    if let Some(category_id) = filter.category_id() {
        query.push(eq("category_id", category_id));
    }
    query
}

/// Query for `list_replies`.
pub fn replies_query(thread_id: Uuid) -> Vec<(String, String)> {
    vec![select_all(), eq("thread_id", thread_id), order("created_at", true)]
}

#[async_trait]
impl CategoryRepo for RestForumRepo {
    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        Ok(self.select(CATEGORIES_TABLE, &[select_all()]).await?)
    }
}

#[async_trait]
impl ThreadRepo for RestForumRepo {
    #[instrument(skip(self), err)]
    async fn list_threads(&self, filter: CategoryFilter) -> anyhow::Result<Vec<Thread>> {
        Ok(self.select(THREADS_TABLE, &threads_query(filter)).await?)
    }

    #[instrument(skip(self), err)]
    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        Ok(self
            .select_one(THREADS_TABLE, &[select_all(), eq("id", id)])
            .await?)
    }

    #[instrument(skip(self, thread), fields(author_id = %thread.author_id), err)]
    async fn create_thread(&self, thread: NewThread) -> anyhow::Result<()> {
        Ok(self.insert(THREADS_TABLE, &thread).await?)
    }
}

#[async_trait]
impl ReplyRepo for RestForumRepo {
    #[instrument(skip(self), err)]
    async fn list_replies(&self, thread_id: Uuid) -> anyhow::Result<Vec<Reply>> {
        Ok(self.select(REPLIES_TABLE, &replies_query(thread_id)).await?)
    }

    #[instrument(skip(self, reply), fields(thread_id = %reply.thread_id), err)]
    async fn create_reply(&self, reply: NewReply) -> anyhow::Result<()> {
        Ok(self.insert(REPLIES_TABLE, &self.reply_row(&reply)).await?)
    }
}
