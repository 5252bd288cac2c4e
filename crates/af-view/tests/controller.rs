use af_core::testing::{InMemoryBackend, Op};
use af_core::{
    Category, CategoryFilter, CategoryRepo, CategoryState, LocalSession, MockCategoryRepo,
    MockReplyRepo, MockThreadRepo, Reply, ReplyRepo, Route, Thread, ThreadRepo, User,
};
use af_view::{
    ForumController, ForumEvent, ForumPorts, Loadable, Notification, SubmitOutcome, ViewMode,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

fn category(name: &str) -> Category {
    Category {
        id: Uuid::now_v7(),
        name: name.into(),
        description: None,
    }
}

fn thread(category_id: Option<Uuid>, minutes_ago: i64) -> Thread {
    Thread {
        id: Uuid::now_v7(),
        title: format!("thread from {minutes_ago}m ago"),
        content: "What is the good life?".into(),
        category_id,
        author_id: Uuid::now_v7(),
        reply_count: 0,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

fn user() -> User {
    User {
        id: Uuid::now_v7(),
        email: Some("alum@example.org".into()),
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ForumEvent>) -> Vec<ForumEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

struct Harness {
    backend: Arc<InMemoryBackend>,
    session: Arc<LocalSession>,
    controller: ForumController,
    events: mpsc::UnboundedReceiver<ForumEvent>,
}

async fn harness(categories: Vec<Category>, threads: Vec<Thread>) -> Harness {
    let backend = Arc::new(InMemoryBackend::new().with_categories(categories).await);
    for t in threads {
        backend.insert_thread(t).await;
    }
    let session = Arc::new(LocalSession::new());
    let (controller, events) =
        ForumController::new(ForumPorts::from_backend(backend.clone(), session.clone()));
    Harness {
        backend,
        session,
        controller,
        events,
    }
}

async fn listed(controller: &ForumController) -> Loadable<Vec<Thread>> {
    match controller.snapshot().await.view {
        ViewMode::List(list) => list.threads,
        ViewMode::Detail(_) => panic!("expected list view"),
    }
}

async fn shown_replies(controller: &ForumController) -> Vec<Reply> {
    match controller.snapshot().await.view {
        ViewMode::Detail(detail) => detail.replies.ready().cloned().expect("replies loaded"),
        ViewMode::List(_) => panic!("expected detail view"),
    }
}

#[tokio::test]
async fn entering_loads_categories_and_all_threads() {
    let ethics = category("Ethics");
    let mut h = harness(
        vec![ethics.clone()],
        vec![thread(Some(ethics.id), 5), thread(None, 1)],
    )
    .await;

    h.controller.enter(Route::ForumRoot).await;

    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.categories.store().len(), 1);
    assert!(!snapshot.signed_in);
    let threads = listed(&h.controller).await;
    let threads = threads.ready().unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads[0].created_at > threads[1].created_at);
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn filtering_by_category_returns_only_its_threads() {
    let ethics = category("Ethics");
    let logic = category("Logic");
    let h = harness(
        vec![ethics.clone(), logic.clone()],
        vec![
            thread(Some(ethics.id), 3),
            thread(Some(logic.id), 2),
            thread(Some(ethics.id), 1),
            thread(None, 4),
        ],
    )
    .await;
    h.controller.enter(Route::ForumRoot).await;

    h.controller.select_category_named("Ethics").await;
    let threads = listed(&h.controller).await;
    let threads = threads.ready().unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|t| t.category_id == Some(ethics.id)));

    h.controller.select_category_named("All").await;
    assert_eq!(listed(&h.controller).await.ready().unwrap().len(), 4);
}

#[tokio::test]
async fn empty_category_is_not_an_error() {
    let ethics = category("Ethics");
    let ethics_id = ethics.id;
    let mut threads = MockThreadRepo::new();
    threads
        .expect_list_threads()
        .withf(|f| *f == CategoryFilter::All)
        .times(1)
        .returning(|_| Ok(vec![]));
    threads
        .expect_list_threads()
        .withf(move |f| *f == CategoryFilter::Category(ethics_id))
        .times(1)
        .returning(|_| Ok(vec![]));

    let mut categories = MockCategoryRepo::new();
    let rows = vec![ethics.clone()];
    categories
        .expect_list_categories()
        .times(1)
        .returning(move || Ok(rows.clone()));

    let ports = ForumPorts {
        categories: Arc::new(categories),
        threads: Arc::new(threads),
        replies: Arc::new(MockReplyRepo::new()),
        session: Arc::new(LocalSession::new()),
    };
    let (controller, mut events) = ForumController::new(ports);
    controller.enter(Route::ForumRoot).await;
    controller.select_category_named("Ethics").await;

    assert_eq!(listed(&controller).await, Loadable::Ready(vec![]));
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn thread_load_failure_toasts_and_leaves_list_empty() {
    let mut h = harness(vec![], vec![thread(None, 1)]).await;
    h.backend.fail(Op::ListThreads).await;

    h.controller.enter(Route::ForumRoot).await;

    assert_eq!(listed(&h.controller).await, Loadable::Ready(vec![]));
    assert_eq!(
        drain(&mut h.events),
        vec![ForumEvent::Notify(Notification::ThreadsLoadFailed)]
    );
}

#[tokio::test]
async fn category_failure_is_silent_but_distinguishable() {
    let mut h = harness(vec![category("Ethics")], vec![]).await;
    h.backend.fail(Op::ListCategories).await;

    h.controller.enter(Route::ForumRoot).await;

    let snapshot = h.controller.snapshot().await;
    assert!(matches!(snapshot.categories, CategoryState::Failed(_)));
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn creating_thread_signed_in_lands_on_unfiltered_list() {
    let ethics = category("Ethics");
    let mut h = harness(vec![ethics.clone()], vec![thread(Some(ethics.id), 10)]).await;
    let author = user();
    h.session.sign_in(author.clone());
    h.controller.enter(Route::ForumRoot).await;
    h.controller.select_category_named("Ethics").await;

    h.controller.open_thread_composer().await;
    h.controller.set_thread_title("Is virtue teachable?").await;
    h.controller.set_thread_content("Meno thought not.").await;
    let outcome = h.controller.submit_thread().await;
    assert_eq!(outcome, SubmitOutcome::Created);

    let stored = h.backend.threads().await;
    let created: Vec<_> = stored
        .iter()
        .filter(|t| t.title == "Is virtue teachable?")
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].author_id, author.id);
    assert_eq!(created[0].category_id, None);

    let ViewMode::List(list) = h.controller.snapshot().await.view else {
        panic!("expected list view");
    };
    assert_eq!(list.filter, CategoryFilter::All);
    assert!(!list.composer.open);
    assert!(list.composer.title.is_empty());
    let shown = list.threads.ready().unwrap();
    assert_eq!(
        shown.iter().filter(|t| t.id == created[0].id).count(),
        1
    );
    assert_eq!(shown[0].id, created[0].id);

    assert_eq!(
        drain(&mut h.events),
        vec![ForumEvent::Notify(Notification::ThreadCreated)]
    );
}

#[tokio::test]
async fn failed_thread_create_keeps_draft() {
    let mut h = harness(vec![], vec![]).await;
    h.session.sign_in(user());
    h.controller.enter(Route::ForumRoot).await;
    h.backend.fail(Op::CreateThread).await;

    h.controller.open_thread_composer().await;
    h.controller.set_thread_title("Draft").await;
    assert_eq!(h.controller.submit_thread().await, SubmitOutcome::Failed);

    let ViewMode::List(list) = h.controller.snapshot().await.view else {
        panic!("expected list view");
    };
    assert!(list.composer.open);
    assert_eq!(list.composer.title, "Draft");
    assert_eq!(
        drain(&mut h.events),
        vec![ForumEvent::Notify(Notification::ThreadCreateFailed)]
    );
}

#[tokio::test]
async fn guest_writes_prompt_sign_in_and_never_hit_backend() {
    let existing = thread(None, 1);
    let existing_id = existing.id;

    let mut threads = MockThreadRepo::new();
    threads.expect_list_threads().returning(|_| Ok(vec![]));
    threads
        .expect_get_thread()
        .returning(move |_| Ok(Some(existing.clone())));
    threads.expect_create_thread().never();

    let mut replies = MockReplyRepo::new();
    replies.expect_list_replies().returning(|_| Ok(vec![]));
    replies.expect_create_reply().never();

    let mut categories = MockCategoryRepo::new();
    categories.expect_list_categories().returning(|| Ok(vec![]));

    let ports = ForumPorts {
        categories: Arc::new(categories),
        threads: Arc::new(threads),
        replies: Arc::new(replies),
        session: Arc::new(LocalSession::new()),
    };
    let (controller, mut events) = ForumController::new(ports);
    controller.enter(Route::ForumRoot).await;

    controller.open_thread_composer().await;
    controller.set_thread_title("Hello").await;
    assert_eq!(controller.submit_thread().await, SubmitOutcome::SignInRequired);
    assert_eq!(drain(&mut events), vec![ForumEvent::SignInRequested]);

    let ViewMode::List(list) = controller.snapshot().await.view else {
        panic!("expected list view");
    };
    assert!(list.composer.open);
    assert_eq!(list.composer.title, "Hello");

    controller.navigate(Route::Thread(existing_id)).await;
    let parent = Uuid::now_v7();
    controller.begin_reply_to(parent).await;
    controller.set_reply_content("Me too").await;
    assert_eq!(controller.submit_reply().await, SubmitOutcome::SignInRequired);
    assert_eq!(drain(&mut events), vec![ForumEvent::SignInRequested]);

    let ViewMode::Detail(detail) = controller.snapshot().await.view else {
        panic!("expected detail view");
    };
    assert_eq!(detail.composer.replying_to, Some(parent));
    assert_eq!(detail.composer.content, "Me too");
}

#[tokio::test]
async fn missing_thread_redirects_to_list() {
    let mut h = harness(vec![], vec![thread(None, 1)]).await;
    h.controller.enter(Route::Thread(Uuid::now_v7())).await;

    assert_eq!(h.controller.route().await, Route::ForumRoot);
    assert_eq!(listed(&h.controller).await.ready().unwrap().len(), 1);
    assert_eq!(
        drain(&mut h.events),
        vec![
            ForumEvent::Notify(Notification::ThreadNotFound),
            ForumEvent::Navigate(Route::ForumRoot),
        ]
    );

    // Echoing the redirect back from the router changes nothing.
    h.controller.navigate(Route::ForumRoot).await;
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn backend_error_on_thread_lookup_also_redirects() {
    let existing = thread(None, 1);
    let mut h = harness(vec![], vec![existing.clone()]).await;
    h.backend.fail(Op::GetThread).await;

    h.controller.enter(Route::Thread(existing.id)).await;

    assert!(matches!(h.controller.snapshot().await.view, ViewMode::List(_)));
    assert_eq!(
        drain(&mut h.events).first(),
        Some(&ForumEvent::Notify(Notification::ThreadNotFound))
    );
}

#[tokio::test]
async fn garbage_thread_path_is_not_found() {
    let mut h = harness(vec![], vec![]).await;
    tokio_test::assert_ok!(h.controller.navigate_path("/forum/definitely-not-an-id").await);

    assert_eq!(h.controller.route().await, Route::ForumRoot);
    assert!(drain(&mut h.events).contains(&ForumEvent::Notify(Notification::ThreadNotFound)));
    assert!(h.controller.navigate_path("/news").await.is_err());
}

#[tokio::test]
async fn posting_reply_appends_exactly_one_at_the_end() {
    let t = thread(None, 60);
    let mut h = harness(vec![], vec![t.clone()]).await;
    for minutes in [30, 20] {
        h.backend
            .insert_reply(Reply {
                id: Uuid::now_v7(),
                thread_id: t.id,
                parent_id: None,
                content: format!("{minutes}m ago"),
                author_id: Uuid::now_v7(),
                created_at: Utc::now() - Duration::minutes(minutes),
            })
            .await;
    }
    let author = user();
    h.session.sign_in(author.clone());
    h.controller.enter(Route::ForumRoot).await;
    h.controller.open_thread(t.id).await;
    assert_eq!(
        drain(&mut h.events),
        vec![ForumEvent::Navigate(Route::Thread(t.id))]
    );

    let before = shown_replies(&h.controller).await;
    assert_eq!(before.len(), 2);

    h.controller.begin_reply_to(before[0].id).await;
    h.controller.set_reply_content("A late answer").await;
    assert_eq!(h.controller.submit_reply().await, SubmitOutcome::Created);

    let after = shown_replies(&h.controller).await;
    assert_eq!(after.len(), before.len() + 1);
    let last = after.last().unwrap();
    assert_eq!(last.content, "A late answer");
    assert_eq!(last.thread_id, t.id);
    assert_eq!(last.author_id, author.id);
    assert_eq!(last.parent_id, Some(before[0].id));

    let ViewMode::Detail(detail) = h.controller.snapshot().await.view else {
        panic!("expected detail view");
    };
    assert!(detail.composer.content.is_empty());
    assert_eq!(detail.composer.replying_to, None);
    assert_eq!(
        drain(&mut h.events),
        vec![ForumEvent::Notify(Notification::ReplyPosted)]
    );
}

#[tokio::test]
async fn failed_reply_keeps_draft() {
    let t = thread(None, 5);
    let mut h = harness(vec![], vec![t.clone()]).await;
    h.session.sign_in(user());
    h.controller.enter(Route::Thread(t.id)).await;
    h.backend.fail(Op::CreateReply).await;

    h.controller.set_reply_content("Lost?").await;
    assert_eq!(h.controller.submit_reply().await, SubmitOutcome::Failed);

    let ViewMode::Detail(detail) = h.controller.snapshot().await.view else {
        panic!("expected detail view");
    };
    assert_eq!(detail.composer.content, "Lost?");
    assert_eq!(h.backend.write_count().await, 0);
    assert_eq!(
        drain(&mut h.events),
        vec![ForumEvent::Notify(Notification::ReplyPostFailed)]
    );
}

#[tokio::test]
async fn back_to_forum_resets_filter() {
    let ethics = category("Ethics");
    let t = thread(Some(ethics.id), 1);
    let mut h = harness(vec![ethics], vec![t.clone(), thread(None, 2)]).await;
    h.controller.enter(Route::ForumRoot).await;
    h.controller.select_category_named("Ethics").await;
    h.controller.open_thread(t.id).await;

    h.controller.back_to_forum().await;

    let ViewMode::List(list) = h.controller.snapshot().await.view else {
        panic!("expected list view");
    };
    assert_eq!(list.filter, CategoryFilter::All);
    assert_eq!(list.threads.ready().unwrap().len(), 2);
    assert_eq!(
        drain(&mut h.events),
        vec![
            ForumEvent::Navigate(Route::Thread(t.id)),
            ForumEvent::Navigate(Route::ForumRoot),
        ]
    );
}

#[tokio::test]
async fn refresh_rereads_the_filtered_list() {
    let ethics = category("Ethics");
    let mut h = harness(
        vec![ethics.clone()],
        vec![thread(Some(ethics.id), 3), thread(None, 2)],
    )
    .await;
    h.controller.enter(Route::ForumRoot).await;
    h.controller.select_category_named("Ethics").await;
    h.backend.insert_thread(thread(Some(ethics.id), 0)).await;

    h.controller.refresh().await;

    let ViewMode::List(list) = h.controller.snapshot().await.view else {
        panic!("expected list view");
    };
    assert_eq!(list.filter, CategoryFilter::Category(ethics.id));
    let threads = list.threads.ready().unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|t| t.category_id == Some(ethics.id)));
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn guest_submit_without_a_composer_is_ignored() {
    let existing = thread(None, 1);
    let mut h = harness(vec![], vec![existing.clone()]).await;
    h.controller.enter(Route::ForumRoot).await;

    assert_eq!(h.controller.submit_reply().await, SubmitOutcome::Ignored);

    h.controller.open_thread(existing.id).await;
    drain(&mut h.events);
    assert_eq!(h.controller.submit_thread().await, SubmitOutcome::Ignored);

    assert!(drain(&mut h.events).is_empty());
    assert_eq!(h.backend.write_count().await, 0);
}

/// Thread repo whose category-filtered reads wait for a signal.
struct GatedThreads {
    inner: InMemoryBackend,
    gate: Arc<Notify>,
}

#[async_trait]
impl ThreadRepo for GatedThreads {
    async fn list_threads(&self, filter: CategoryFilter) -> anyhow::Result<Vec<Thread>> {
        let rows = self.inner.list_threads(filter).await;
        if filter != CategoryFilter::All {
            self.gate.notified().await;
        }
        rows
    }

    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        self.inner.get_thread(id).await
    }

    async fn create_thread(&self, thread: af_core::NewThread) -> anyhow::Result<()> {
        self.inner.create_thread(thread).await
    }
}

#[tokio::test]
async fn superseded_filter_response_is_discarded() {
    let ethics = category("Ethics");
    let inner = InMemoryBackend::new()
        .with_categories(vec![ethics.clone()])
        .await;
    inner.insert_thread(thread(Some(ethics.id), 1)).await;
    inner.insert_thread(thread(None, 2)).await;
    inner.insert_thread(thread(None, 3)).await;

    let categories: Arc<dyn CategoryRepo> = Arc::new(
        InMemoryBackend::new()
            .with_categories(vec![ethics.clone()])
            .await,
    );
    let replies: Arc<dyn ReplyRepo> = Arc::new(InMemoryBackend::new());
    let gate = Arc::new(Notify::new());
    let ports = ForumPorts {
        categories,
        threads: Arc::new(GatedThreads {
            inner,
            gate: gate.clone(),
        }),
        replies,
        session: Arc::new(LocalSession::new()),
    };
    let (controller, mut events) = ForumController::new(ports);
    controller.enter(Route::ForumRoot).await;

    // "Ethics" is clicked first but answers last.
    tokio::join!(
        controller.select_category(CategoryFilter::Category(ethics.id)),
        controller.select_category(CategoryFilter::All),
        async {
            tokio::task::yield_now().await;
            gate.notify_one();
        },
    );

    let ViewMode::List(list) = controller.snapshot().await.view else {
        panic!("expected list view");
    };
    assert_eq!(list.filter, CategoryFilter::All);
    assert_eq!(list.threads.ready().unwrap().len(), 3);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn filter_switch_shows_loading_until_response() {
    let ethics = category("Ethics");
    let inner = InMemoryBackend::new();
    inner.insert_thread(thread(Some(ethics.id), 1)).await;
    let gate = Arc::new(Notify::new());
    let ports = ForumPorts {
        categories: Arc::new(InMemoryBackend::new().with_categories(vec![ethics.clone()]).await),
        threads: Arc::new(GatedThreads {
            inner,
            gate: gate.clone(),
        }),
        replies: Arc::new(InMemoryBackend::new()),
        session: Arc::new(LocalSession::new()),
    };
    let (controller, _events) = ForumController::new(ports);
    controller.enter(Route::ForumRoot).await;

    tokio::join!(
        controller.select_category(CategoryFilter::Category(ethics.id)),
        async {
            assert!(listed(&controller).await.is_loading());
            gate.notify_one();
        },
    );
    assert_eq!(listed(&controller).await.ready().unwrap().len(), 1);
}
