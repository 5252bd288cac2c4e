//! # Forum State Machine
//!
//! Pure view state for the forum. The controller drives it; nothing here
//! performs I/O.
//!
//! Every fetch starts by taking a ticket from the state (`show_list`,
//! `show_thread`, ...) and ends by handing the ticket back with the result.
//! A ticket is only honoured if no newer fetch for the same slot has been
//! issued since and the view still matches what the ticket was issued for,
//! so a slow response can never overwrite a newer one.

use af_core::{
    sort_replies_oldest_first, sort_threads_newest_first, CategoryFilter, CategoryState, NewReply,
    NewThread, Reply, Route, Thread, User,
};
use uuid::Uuid;

/// A value that is either still being fetched or ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Loadable<T> {
    #[default]
    Loading,
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Loading => None,
            Loadable::Ready(value) => Some(value),
        }
    }
}

/// The "Start New Thread" modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadComposer {
    pub open: bool,
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
}

/// Reply drafting. The draft text is shared between the top-level box and
/// whichever per-reply box is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyComposer {
    pub content: String,
    /// The reply whose inline composer is open, if any.
    pub replying_to: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub filter: CategoryFilter,
    pub threads: Loadable<Vec<Thread>>,
    pub composer: ThreadComposer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub thread_id: Uuid,
    pub thread: Loadable<Thread>,
    pub replies: Loadable<Vec<Reply>>,
    pub composer: ReplyComposer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    List(ListView),
    Detail(DetailView),
}

impl ViewMode {
    pub fn route(&self) -> Route {
        match self {
            ViewMode::List(_) => Route::ForumRoot,
            ViewMode::Detail(detail) => Route::Thread(detail.thread_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTicket {
    seq: u64,
    pub filter: CategoryFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadTicket {
    seq: u64,
    pub thread_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTicket {
    seq: u64,
    pub thread_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadLookup {
    Stale,
    /// Back on the unfiltered list; fetch it with this ticket.
    NotFound(ListTicket),
    /// Thread shown; replies should be fetched with this ticket.
    Found(ReplyTicket),
}

/// Read-only copy of the state handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumSnapshot {
    pub categories: CategoryState,
    pub view: ViewMode,
    pub signed_in: bool,
}

#[derive(Debug, Clone)]
pub struct ForumState {
    pub categories: CategoryState,
    pub view: ViewMode,
    entered: bool,
    list_seq: u64,
    detail_seq: u64,
    reply_seq: u64,
}

impl Default for ForumState {
    fn default() -> Self {
        Self::new()
    }
}

impl ForumState {
    pub fn new() -> Self {
        Self {
            categories: CategoryState::Loading,
            view: ViewMode::List(ListView {
                filter: CategoryFilter::All,
                threads: Loadable::Loading,
                composer: ThreadComposer::default(),
            }),
            entered: false,
            list_seq: 0,
            detail_seq: 0,
            reply_seq: 0,
        }
    }

    pub fn route(&self) -> Route {
        self.view.route()
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    /// Marks the forum as entered. Returns `false` if it already was.
    pub fn enter(&mut self) -> bool {
        !std::mem::replace(&mut self.entered, true)
    }

    pub fn set_categories(&mut self, categories: CategoryState) {
        self.categories = categories;
    }

    pub fn list(&self) -> Option<&ListView> {
        match &self.view {
            ViewMode::List(list) => Some(list),
            ViewMode::Detail(_) => None,
        }
    }

    pub fn detail(&self) -> Option<&DetailView> {
        match &self.view {
            ViewMode::Detail(detail) => Some(detail),
            ViewMode::List(_) => None,
        }
    }

    fn list_mut(&mut self) -> Option<&mut ListView> {
        match &mut self.view {
            ViewMode::List(list) => Some(list),
            ViewMode::Detail(_) => None,
        }
    }

    fn detail_mut(&mut self) -> Option<&mut DetailView> {
        match &mut self.view {
            ViewMode::Detail(detail) => Some(detail),
            ViewMode::List(_) => None,
        }
    }

    /// Shows the thread list with `filter` and starts a fetch for it.
    /// The thread composer survives a filter switch but not a view switch.
    pub fn show_list(&mut self, filter: CategoryFilter) -> ListTicket {
        self.list_seq += 1;
        self.detail_seq += 1;
        self.reply_seq += 1;

        match self.list_mut() {
            Some(list) => {
                list.filter = filter;
                list.threads = Loadable::Loading;
            }
            None => {
                self.view = ViewMode::List(ListView {
                    filter,
                    threads: Loadable::Loading,
                    composer: ThreadComposer::default(),
                });
            }
        }
        tracing::debug!(?filter, seq = self.list_seq, "list view");
        ListTicket {
            seq: self.list_seq,
            filter,
        }
    }

    /// Re-issues the list fetch for the current filter. `None` outside the
    /// list view.
    pub fn reload_list(&mut self) -> Option<ListTicket> {
        let filter = self.list()?.filter;
        Some(self.show_list(filter))
    }

    /// Switches filter. `None` outside the list view.
    pub fn select_filter(&mut self, filter: CategoryFilter) -> Option<ListTicket> {
        self.list()?;
        Some(self.show_list(filter))
    }

    /// Applies a thread-list response. A failed fetch leaves the list empty.
    pub fn finish_list(&mut self, ticket: ListTicket, result: Option<Vec<Thread>>) -> Applied {
        let current = self.list_seq;
        let Some(list) = self.list_mut() else {
            return Applied::Stale;
        };
        if ticket.seq != current || list.filter != ticket.filter {
            tracing::debug!(?ticket.filter, "discarding stale thread list");
            return Applied::Stale;
        }
        let mut threads = result.unwrap_or_default();
        sort_threads_newest_first(&mut threads);
        list.threads = Loadable::Ready(threads);
        Applied::Current
    }

    /// Shows the detail view for `thread_id` and starts the thread lookup.
    pub fn show_thread(&mut self, thread_id: Uuid) -> ThreadTicket {
        self.list_seq += 1;
        self.detail_seq += 1;
        self.reply_seq += 1;
        self.view = ViewMode::Detail(DetailView {
            thread_id,
            thread: Loadable::Loading,
            replies: Loadable::Loading,
            composer: ReplyComposer::default(),
        });
        tracing::debug!(%thread_id, seq = self.detail_seq, "detail view");
        ThreadTicket {
            seq: self.detail_seq,
            thread_id,
        }
    }

    /// Applies a thread lookup. A missing thread drops straight back to the
    /// unfiltered list.
    pub fn finish_thread(&mut self, ticket: ThreadTicket, found: Option<Thread>) -> ThreadLookup {
        if ticket.seq != self.detail_seq {
            return ThreadLookup::Stale;
        }
        let Some(detail) = self.detail_mut() else {
            return ThreadLookup::Stale;
        };
        if detail.thread_id != ticket.thread_id {
            return ThreadLookup::Stale;
        }
        match found {
            None => ThreadLookup::NotFound(self.show_list(CategoryFilter::All)),
            Some(thread) => {
                detail.thread = Loadable::Ready(thread);
                self.reply_seq += 1;
                ThreadLookup::Found(ReplyTicket {
                    seq: self.reply_seq,
                    thread_id: ticket.thread_id,
                })
            }
        }
    }

    /// Ticket for re-reading the replies of the open thread. The current
    /// replies stay on screen until the response lands.
    pub fn refresh_replies(&mut self) -> Option<ReplyTicket> {
        let thread_id = self.detail()?.thread_id;
        self.reply_seq += 1;
        Some(ReplyTicket {
            seq: self.reply_seq,
            thread_id,
        })
    }

    /// Applies a reply-list response. A failed fetch shows no replies.
    pub fn finish_replies(&mut self, ticket: ReplyTicket, result: Option<Vec<Reply>>) -> Applied {
        let current = self.reply_seq;
        let Some(detail) = self.detail_mut() else {
            return Applied::Stale;
        };
        if ticket.seq != current || detail.thread_id != ticket.thread_id {
            return Applied::Stale;
        }
        let mut replies = result.unwrap_or_default();
        sort_replies_oldest_first(&mut replies);
        detail.replies = Loadable::Ready(replies);
        Applied::Current
    }

    /// Mutable access to the thread composer, in the list view only.
    pub fn thread_composer(&mut self) -> Option<&mut ThreadComposer> {
        self.list_mut().map(|list| &mut list.composer)
    }

    /// Mutable access to the reply composer, in the detail view only.
    pub fn reply_composer(&mut self) -> Option<&mut ReplyComposer> {
        self.detail_mut().map(|detail| &mut detail.composer)
    }

    /// Insert payload for the thread composer, authored by `user`.
    pub fn thread_draft(&self, user: &User) -> Option<NewThread> {
        let composer = &self.list()?.composer;
        Some(NewThread {
            title: composer.title.clone(),
            content: composer.content.clone(),
            category_id: composer.category_id,
            author_id: user.id,
        })
    }

    /// Insert payload for the reply composer, authored by `user`.
    pub fn reply_draft(&self, user: &User) -> Option<NewReply> {
        let detail = self.detail()?;
        Some(NewReply {
            thread_id: detail.thread_id,
            parent_id: detail.composer.replying_to,
            content: detail.composer.content.clone(),
            author_id: user.id,
        })
    }

    /// After a successful insert: close and clear the composer, drop the
    /// cached list and refetch everything.
    pub fn thread_created(&mut self) -> Option<ListTicket> {
        let composer = self.thread_composer()?;
        *composer = ThreadComposer::default();
        Some(self.show_list(CategoryFilter::All))
    }

    /// After a successful insert into `thread_id`: clear the draft, close
    /// any inline composer and refetch the replies.
    pub fn reply_posted(&mut self, thread_id: Uuid) -> Option<ReplyTicket> {
        let detail = self.detail_mut()?;
        if detail.thread_id != thread_id {
            return None;
        }
        detail.composer = ReplyComposer::default();
        self.refresh_replies()
    }

    pub fn snapshot(&self, signed_in: bool) -> ForumSnapshot {
        ForumSnapshot {
            categories: self.categories.clone(),
            view: self.view.clone(),
            signed_in,
        }
    }
}
