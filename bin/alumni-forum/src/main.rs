//! # alumni-forum
//!
//! Interactive terminal client. The backend is chosen at runtime from
//! settings, among those compiled in through features.

mod commands;

use af_config::{BackendKind, BackendSettings, ForumSettings, LogSettings, Settings};
use af_core::{LocalSession, SessionProvider, User};
use af_view::{ForumController, ForumEvent, ForumPorts, Severity, ViewMode};
use clap::Parser;
use commands::{Command, HELP};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[cfg(feature = "db-sqlite")]
use af_db_sqlite::SqliteForumRepo;

#[cfg(feature = "db-rest")]
use af_db_rest::RestForumRepo;

#[derive(Debug, Parser)]
#[command(name = "alumni-forum", version, about = "Alumni discussion forum")]
struct Cli {
    /// Settings file (TOML). Defaults to ./alumni-forum.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start signed in as this user.
    #[arg(long)]
    user: Option<Uuid>,

    /// Where to start, `/forum` or `/forum/<thread-id>`.
    #[arg(default_value = af_core::FORUM_ROOT)]
    path: String,
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "db-sqlite")]
async fn seed(repo: &SqliteForumRepo, forum: &ForumSettings) -> anyhow::Result<()> {
    if forum.seed_categories.is_empty() || repo.category_count().await? > 0 {
        return Ok(());
    }
    for category in &forum.seed_categories {
        repo.insert_category(&category.name, category.description.as_deref())
            .await?;
    }
    tracing::info!(count = forum.seed_categories.len(), "seeded categories");
    Ok(())
}

async fn build_ports(
    backend: BackendSettings,
    forum: &ForumSettings,
    session: Arc<dyn SessionProvider>,
) -> anyhow::Result<ForumPorts> {
    match backend.kind {
        #[cfg(feature = "db-sqlite")]
        BackendKind::Sqlite => {
            let repo = SqliteForumRepo::new(&backend.database_url, backend.max_connections).await?;
            seed(&repo, forum).await?;
            tracing::info!(url = %backend.database_url, "using sqlite backend");
            Ok(ForumPorts::from_backend(Arc::new(repo), session))
        }
        #[cfg(feature = "db-rest")]
        BackendKind::Rest => {
            let url = backend
                .rest_url
                .ok_or_else(|| anyhow::anyhow!("backend.rest_url is not set"))?;
            let key = backend
                .api_key
                .ok_or_else(|| anyhow::anyhow!("backend.api_key is not set"))?;
            let mut repo = RestForumRepo::new(&url, key)?;
            if let Some(token) = backend.access_token {
                repo = repo.with_access_token(token);
            }
            if let Some(column) = backend.reply_parent_column {
                repo = repo.with_reply_parent_column(column);
            }
            if !forum.seed_categories.is_empty() {
                tracing::warn!("seed categories are ignored for the rest backend");
            }
            tracing::info!(%url, "using rest backend");
            Ok(ForumPorts::from_backend(Arc::new(repo), session))
        }
        #[allow(unreachable_patterns)]
        kind => anyhow::bail!("backend {kind:?} is not compiled in; rebuild with its feature"),
    }
}

fn drain_events(events: &mut UnboundedReceiver<ForumEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ForumEvent::Notify(notification) => match notification.severity() {
                Severity::Success => println!("[ok] {notification}"),
                Severity::Error => println!("[error] {notification}"),
            },
            ForumEvent::Navigate(route) => println!("-> {route}"),
            ForumEvent::SignInRequested => {
                println!("Sign in to post: login <user-id>")
            }
        }
    }
}

async fn show(controller: &ForumController) {
    match af_ui::render(&controller.snapshot().await) {
        Ok(page) => println!("{page}"),
        Err(e) => tracing::error!(error = %e, "render failed"),
    }
}

/// Runs one command. Returns `false` when the client should exit.
async fn execute(controller: &ForumController, session: &LocalSession, command: Command) -> bool {
    match command {
        Command::Threads => controller.refresh().await,
        Command::Filter(name) => controller.select_category_named(&name).await,
        Command::Open(id) => controller.open_thread(id).await,
        Command::Back => controller.back_to_forum().await,
        Command::New => controller.open_thread_composer().await,
        Command::Title(title) => controller.set_thread_title(title).await,
        Command::Body(body) => controller.set_thread_content(body).await,
        Command::Category(None) => controller.set_thread_category(None).await,
        Command::Category(Some(name)) => {
            let found = controller
                .snapshot()
                .await
                .categories
                .store()
                .find_by_name(&name)
                .map(|c| c.id);
            match found {
                Some(id) => controller.set_thread_category(Some(id)).await,
                None => println!("No category named `{name}`."),
            }
        }
        Command::Post => {
            let outcome = controller.submit_thread().await;
            tracing::debug!(?outcome, "submit thread");
        }
        Command::Cancel => match controller.snapshot().await.view {
            ViewMode::List(_) => controller.close_thread_composer().await,
            ViewMode::Detail(_) => controller.cancel_reply_to().await,
        },
        Command::Reply(Some(id)) => controller.begin_reply_to(id).await,
        Command::Reply(None) => controller.cancel_reply_to().await,
        Command::Say(text) => controller.set_reply_content(text).await,
        Command::Send => {
            let outcome = controller.submit_reply().await;
            tracing::debug!(?outcome, "submit reply");
        }
        Command::Login(id) => session.sign_in(User { id, email: None }),
        Command::Logout => session.sign_out(),
        Command::Show => {}
        Command::Help => {
            println!("{HELP}");
            return true;
        }
        Command::Quit => return false,
    }
    show(controller).await;
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Settings {
        backend,
        log,
        forum,
        env_file,
    } = Settings::load(cli.config.as_deref())?;
    init_tracing(&log);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let session = Arc::new(match cli.user {
        Some(id) => LocalSession::signed_in(User { id, email: None }),
        None => LocalSession::new(),
    });
    let ports = build_ports(backend, &forum, session.clone()).await?;
    let (controller, mut events) = ForumController::new(ports);

    controller.navigate_path(&cli.path).await?;
    show(&controller).await;
    drain_events(&mut events);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.parse::<Command>() {
            Ok(command) => {
                if !execute(&controller, &session, command).await {
                    break;
                }
            }
            Err(e) => println!("{e}"),
        }
        drain_events(&mut events);
    }

    tracing::info!("bye");
    Ok(())
}
