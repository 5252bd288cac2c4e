//! # Forum View Controller
//!
//! Coordinates navigation, the repositories and the state machine.
//!
//! The controller is shared by reference and every operation takes `&self`,
//! so a host can have several operations in flight at once (two quick filter
//! clicks, say). The state lock is never held across a backend call; results
//! are applied through the tickets in [`crate::state`], which is what keeps
//! overlapping fetches from clobbering each other.

use crate::events::{ForumEvent, Notification};
use crate::state::{Applied, ForumSnapshot, ForumState, ListTicket, ReplyTicket, ThreadLookup};
use af_core::{
    CategoryFilter, CategoryRepo, CategoryState, ForumError, ReplyRepo, Route, SessionProvider,
    ThreadRepo,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// The backends the controller talks to.
#[derive(Clone)]
pub struct ForumPorts {
    pub categories: Arc<dyn CategoryRepo>,
    pub threads: Arc<dyn ThreadRepo>,
    pub replies: Arc<dyn ReplyRepo>,
    pub session: Arc<dyn SessionProvider>,
}

impl ForumPorts {
    /// Uses one backend for all three repositories.
    pub fn from_backend<B>(backend: Arc<B>, session: Arc<dyn SessionProvider>) -> Self
    where
        B: CategoryRepo + ThreadRepo + ReplyRepo + 'static,
    {
        Self {
            categories: backend.clone(),
            threads: backend.clone(),
            replies: backend,
            session,
        }
    }
}

/// What became of a submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    /// Nobody is signed in; the sign-in flow was requested and no write made.
    SignInRequired,
    /// The backend rejected the write; the draft is kept for a retry.
    Failed,
    /// The composer does not exist in the current view.
    Ignored,
}

pub struct ForumController {
    ports: ForumPorts,
    state: Mutex<ForumState>,
    events: mpsc::UnboundedSender<ForumEvent>,
}

impl ForumController {
    /// Builds a controller and the receiving end of its event stream.
    pub fn new(ports: ForumPorts) -> (Self, mpsc::UnboundedReceiver<ForumEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            ports,
            state: Mutex::new(ForumState::new()),
            events,
        };
        (controller, rx)
    }

    fn emit(&self, event: ForumEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }

    fn notify(&self, notification: Notification) {
        self.emit(ForumEvent::Notify(notification));
    }

    pub async fn snapshot(&self) -> ForumSnapshot {
        let signed_in = self.ports.session.current_user().is_some();
        self.state.lock().await.snapshot(signed_in)
    }

    pub async fn route(&self) -> Route {
        self.state.lock().await.route()
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// Enters the forum at `route`. Categories are loaded on the first call
    /// only, alongside whatever the route needs.
    pub async fn enter(&self, route: Route) {
        let first = self.state.lock().await.enter();
        if first {
            tracing::info!(%route, "entering forum");
            tokio::join!(self.load_categories(), self.apply_route(route));
        } else {
            self.apply_route(route).await;
        }
    }

    /// Follows a router change. Same-route navigation does nothing.
    pub async fn navigate(&self, route: Route) {
        let (entered, current) = {
            let state = self.state.lock().await;
            (state.is_entered(), state.route())
        };
        if !entered {
            return self.enter(route).await;
        }
        if current == route {
            tracing::debug!(%route, "already there");
            return;
        }
        self.apply_route(route).await;
    }

    /// Follows a router change given as a path. Unparsable thread ids are
    /// treated as missing threads; non-forum paths are rejected.
    pub async fn navigate_path(&self, path: &str) -> af_core::Result<()> {
        match path.parse::<Route>() {
            Ok(route) => {
                self.navigate(route).await;
                Ok(())
            }
            Err(ForumError::NotFound(kind, id)) => {
                tracing::warn!(%kind, %id, "unparsable thread id");
                let (first, ticket) = {
                    let mut state = self.state.lock().await;
                    (state.enter(), state.show_list(CategoryFilter::All))
                };
                if first {
                    tokio::join!(self.load_categories(), self.thread_not_found(ticket));
                } else {
                    self.thread_not_found(ticket).await;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Selecting a thread card.
    pub async fn open_thread(&self, thread_id: Uuid) {
        let route = Route::Thread(thread_id);
        self.emit(ForumEvent::Navigate(route));
        self.navigate(route).await;
    }

    /// "Back to Forum": the unfiltered list, refetched.
    pub async fn back_to_forum(&self) {
        self.emit(ForumEvent::Navigate(Route::ForumRoot));
        let ticket = self.state.lock().await.show_list(CategoryFilter::All);
        self.fetch_list(ticket).await;
    }

    /// Switches the category filter. Ignored outside the list view.
    pub async fn select_category(&self, filter: CategoryFilter) {
        let ticket = self.state.lock().await.select_filter(filter);
        match ticket {
            Some(ticket) => self.fetch_list(ticket).await,
            None => tracing::debug!(?filter, "filter change outside list view"),
        }
    }

    /// Switches the category filter by sidebar label.
    pub async fn select_category_named(&self, name: &str) {
        let filter = self.state.lock().await.categories.store().filter_for(name);
        self.select_category(filter).await;
    }

    /// Re-reads whatever the current view shows. The list keeps its filter.
    pub async fn refresh(&self) {
        let (ticket, route) = {
            let mut state = self.state.lock().await;
            (state.reload_list(), state.route())
        };
        match ticket {
            Some(ticket) => self.fetch_list(ticket).await,
            None => self.apply_route(route).await,
        }
    }

    async fn apply_route(&self, route: Route) {
        match route {
            Route::ForumRoot => {
                let ticket = self.state.lock().await.show_list(CategoryFilter::All);
                self.fetch_list(ticket).await;
            }
            Route::Thread(thread_id) => self.load_thread(thread_id).await,
        }
    }

    // ── Fetches ─────────────────────────────────────────────────────────────

    async fn load_categories(&self) {
        let categories = CategoryState::load(self.ports.categories.as_ref()).await;
        self.state.lock().await.set_categories(categories);
    }

    async fn fetch_list(&self, ticket: ListTicket) {
        let result = match self.ports.threads.list_threads(ticket.filter).await {
            Ok(threads) => Some(threads),
            Err(e) => {
                tracing::warn!(error = %e, filter = ?ticket.filter, "failed to load threads");
                None
            }
        };
        let failed = result.is_none();
        let applied = self.state.lock().await.finish_list(ticket, result);
        if failed && applied == Applied::Current {
            self.notify(Notification::ThreadsLoadFailed);
        }
    }

    async fn load_thread(&self, thread_id: Uuid) {
        let ticket = self.state.lock().await.show_thread(thread_id);
        let found = match self.ports.threads.get_thread(thread_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, %thread_id, "failed to load thread");
                None
            }
        };

        let lookup = self.state.lock().await.finish_thread(ticket, found);
        match lookup {
            ThreadLookup::Stale => {}
            ThreadLookup::NotFound(list) => self.thread_not_found(list).await,
            ThreadLookup::Found(replies) => self.fetch_replies(replies).await,
        }
    }

    /// The list view is already showing; announce it and fill it.
    async fn thread_not_found(&self, ticket: ListTicket) {
        self.notify(Notification::ThreadNotFound);
        self.emit(ForumEvent::Navigate(Route::ForumRoot));
        self.fetch_list(ticket).await;
    }

    async fn fetch_replies(&self, ticket: ReplyTicket) {
        let result = match self.ports.replies.list_replies(ticket.thread_id).await {
            Ok(replies) => Some(replies),
            Err(e) => {
                tracing::warn!(error = %e, thread_id = %ticket.thread_id, "failed to load replies");
                None
            }
        };
        self.state.lock().await.finish_replies(ticket, result);
    }

    // ── Thread composer ─────────────────────────────────────────────────────

    pub async fn open_thread_composer(&self) {
        if let Some(composer) = self.state.lock().await.thread_composer() {
            composer.open = true;
        }
    }

    /// Hides the modal. The draft is kept.
    pub async fn close_thread_composer(&self) {
        if let Some(composer) = self.state.lock().await.thread_composer() {
            composer.open = false;
        }
    }

    pub async fn set_thread_title(&self, title: impl Into<String>) {
        if let Some(composer) = self.state.lock().await.thread_composer() {
            composer.title = title.into();
        }
    }

    pub async fn set_thread_content(&self, content: impl Into<String>) {
        if let Some(composer) = self.state.lock().await.thread_composer() {
            composer.content = content.into();
        }
    }

    pub async fn set_thread_category(&self, category_id: Option<Uuid>) {
        if let Some(composer) = self.state.lock().await.thread_composer() {
            composer.category_id = category_id;
        }
    }

    /// Posts the thread composer. On success the user lands on the
    /// unfiltered list, which is refetched from scratch.
    pub async fn submit_thread(&self) -> SubmitOutcome {
        if self.state.lock().await.thread_composer().is_none() {
            return SubmitOutcome::Ignored;
        }
        let Some(user) = self.ports.session.current_user() else {
            tracing::debug!("thread submit gated on sign-in");
            self.emit(ForumEvent::SignInRequested);
            return SubmitOutcome::SignInRequired;
        };
        let Some(draft) = self.state.lock().await.thread_draft(&user) else {
            return SubmitOutcome::Ignored;
        };

        if let Err(e) = self.ports.threads.create_thread(draft).await {
            tracing::error!(error = %e, user_id = %user.id, "failed to create thread");
            self.notify(Notification::ThreadCreateFailed);
            return SubmitOutcome::Failed;
        }

        tracing::info!(user_id = %user.id, "thread created");
        self.notify(Notification::ThreadCreated);
        let ticket = self.state.lock().await.thread_created();
        if let Some(ticket) = ticket {
            self.fetch_list(ticket).await;
        }
        SubmitOutcome::Created
    }

    // ── Reply composer ──────────────────────────────────────────────────────

    /// Opens the inline composer under `reply_id`.
    pub async fn begin_reply_to(&self, reply_id: Uuid) {
        if let Some(composer) = self.state.lock().await.reply_composer() {
            composer.replying_to = Some(reply_id);
        }
    }

    pub async fn cancel_reply_to(&self) {
        if let Some(composer) = self.state.lock().await.reply_composer() {
            composer.replying_to = None;
        }
    }

    pub async fn set_reply_content(&self, content: impl Into<String>) {
        if let Some(composer) = self.state.lock().await.reply_composer() {
            composer.content = content.into();
        }
    }

    /// Posts the reply draft to the open thread, then re-reads its replies.
    pub async fn submit_reply(&self) -> SubmitOutcome {
        if self.state.lock().await.reply_composer().is_none() {
            return SubmitOutcome::Ignored;
        }
        let Some(user) = self.ports.session.current_user() else {
            tracing::debug!("reply submit gated on sign-in");
            self.emit(ForumEvent::SignInRequested);
            return SubmitOutcome::SignInRequired;
        };
        let Some(draft) = self.state.lock().await.reply_draft(&user) else {
            return SubmitOutcome::Ignored;
        };
        let thread_id = draft.thread_id;

        if let Err(e) = self.ports.replies.create_reply(draft).await {
            tracing::error!(error = %e, %thread_id, "failed to post reply");
            self.notify(Notification::ReplyPostFailed);
            return SubmitOutcome::Failed;
        }

        tracing::info!(%thread_id, user_id = %user.id, "reply posted");
        self.notify(Notification::ReplyPosted);
        let ticket = self.state.lock().await.reply_posted(thread_id);
        if let Some(ticket) = ticket {
            self.fetch_replies(ticket).await;
        }
        SubmitOutcome::Created
    }
}
