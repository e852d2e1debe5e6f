use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::driver::{self, DriverConfig, Input};
use client::net::api::HttpBoardStore;
use client::net::{BoardStore, Relay, relay};
use client::{Brush, ClientView, SyncError, Synchronizer};
use frames::model::{CollaborationMode, DEFAULT_COLOR, Identity, Point, SettingsPatch, Tool, UnknownMode};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("invalid point `{0}`; expected x,y")]
    InvalidPoint(String),
    #[error(transparent)]
    InvalidMode(#[from] UnknownMode),
    #[error("nothing to update; pass --locked or --mode")]
    EmptyPatch,
    #[error("board `{0}` is locked; nothing was drawn")]
    LayerLocked(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sketch-cli", about = "Drawing room REST and websocket CLI")]
struct Cli {
    #[arg(long, env = "SKETCH_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Api(ApiCommand),
    Ws(WsCommand),
}

// =============================================================================
// REST COMMANDS
// =============================================================================

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Board(BoardCommand),
    User(UserCommand),
}

#[derive(Args, Debug)]
struct BoardCommand {
    #[command(subcommand)]
    command: BoardSubcommand,
}

#[derive(Subcommand, Debug)]
enum BoardSubcommand {
    Get {
        slug: String,
    },
    Create {
        slug: String,
        #[arg(long)]
        title: Option<String>,
    },
    Clear {
        slug: String,
    },
    Settings {
        slug: String,
        #[arg(long)]
        locked: Option<bool>,
        #[arg(long, help = "invite-only, open or view-only")]
        mode: Option<String>,
    },
    Presence {
        slug: String,
    },
}

#[derive(Args, Debug)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand, Debug)]
enum UserSubcommand {
    Upsert {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Add {
        slug: String,
        user_id: Uuid,
    },
    Remove {
        slug: String,
        user_id: Uuid,
    },
    List {
        slug: String,
    },
}

// =============================================================================
// WEBSOCKET COMMANDS
// =============================================================================

#[derive(Args, Debug)]
struct WsCommand {
    #[command(subcommand)]
    command: WsSubcommand,
}

#[derive(Subcommand, Debug)]
enum WsSubcommand {
    /// Join a room and print the view each time it changes.
    Watch(WatchArgs),
    /// Join a room, draw one stroke, and wait until it is persisted.
    Draw(DrawArgs),
}

#[derive(Args, Debug)]
struct SessionArgs {
    slug: String,

    #[arg(long, env = "SKETCH_IDENTITY_ID")]
    identity_id: String,

    #[arg(long, env = "SKETCH_NAME")]
    name: Option<String>,

    #[arg(long, env = "SKETCH_COLOR", default_value = DEFAULT_COLOR)]
    color: String,
}

impl SessionArgs {
    fn identity(&self) -> Identity {
        Identity {
            id: self.identity_id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.identity_id.clone()),
            color: self.color.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    session: SessionArgs,

    #[arg(long, default_value_t = 30, help = "Seconds to watch before exiting")]
    seconds: u64,
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[command(flatten)]
    session: SessionArgs,

    #[arg(long, default_value = "0,0 5,5 10,10", help = "Space-separated x,y points")]
    points: String,

    #[arg(long, default_value_t = 3.0)]
    size: f64,

    #[arg(long, default_value_t = false)]
    erase: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let store = HttpBoardStore::new(&cli.base_url);

    match cli.command {
        Command::Ping => {
            store.health().await?;
            println!("ok");
            Ok(())
        }
        Command::Api(api) => run_api(&store, api).await,
        Command::Ws(ws) => run_ws(store, ws).await,
    }
}

async fn run_api(store: &HttpBoardStore, api: ApiCommand) -> Result<(), CliError> {
    match api.command {
        ApiSubcommand::Board(board) => run_api_board(store, board).await,
        ApiSubcommand::User(user) => run_api_user(store, user).await,
    }
}

async fn run_api_board(store: &HttpBoardStore, board: BoardCommand) -> Result<(), CliError> {
    match board.command {
        BoardSubcommand::Get { slug } => print_json(&store.get_board(&slug).await?),
        BoardSubcommand::Create { slug, title } => print_json(&store.create_board(&slug, title.as_deref()).await?),
        BoardSubcommand::Clear { slug } => {
            store.clear_strokes(&slug).await?;
            print_json(&store.get_board(&slug).await?)
        }
        BoardSubcommand::Settings { slug, locked, mode } => {
            let patch = settings_patch(locked, mode.as_deref())?;
            store.update_settings(&slug, patch).await?;
            print_json(&store.get_board(&slug).await?)
        }
        BoardSubcommand::Presence { slug } => print_json(&store.presence(&slug).await?),
    }
}

async fn run_api_user(store: &HttpBoardStore, user: UserCommand) -> Result<(), CliError> {
    match user.command {
        UserSubcommand::Upsert { email, name, color } => {
            print_json(&store.upsert_user(&email, name.as_deref(), color.as_deref()).await?)
        }
        UserSubcommand::Add { slug, user_id } => print_json(&store.add_collaborator(&slug, user_id).await?),
        UserSubcommand::Remove { slug, user_id } => print_json(&store.remove_collaborator(&slug, user_id).await?),
        UserSubcommand::List { slug } => print_json(&store.list_collaborators(&slug).await?),
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

async fn run_ws(store: HttpBoardStore, ws: WsCommand) -> Result<(), CliError> {
    match ws.command {
        WsSubcommand::Watch(args) => ws_watch(store, args).await,
        WsSubcommand::Draw(args) => ws_draw(store, args).await,
    }
}

async fn open_session(store: &HttpBoardStore, session: &SessionArgs) -> Result<driver::SyncHandle, CliError> {
    let (ws, inbound) = relay::connect(store.base_url(), 256).await?;
    let sync = Synchronizer::new(session.slug.clone(), session.identity());
    Ok(driver::spawn(
        sync,
        Arc::new(ws) as Arc<dyn Relay>,
        Arc::new(store.clone()) as Arc<dyn BoardStore>,
        inbound,
        DriverConfig::default(),
    ))
}

async fn ws_watch(store: HttpBoardStore, args: WatchArgs) -> Result<(), CliError> {
    let handle = open_session(&store, &args.session).await?;
    let mut view = handle.view();

    let watch = async {
        let mut last = String::new();
        while view.changed().await.is_ok() {
            let line = summarize(&view.borrow_and_update());
            if line != last {
                println!("{line}");
                last = line;
            }
        }
    };
    // Elapsed is the normal way out.
    let _ = tokio::time::timeout(Duration::from_secs(args.seconds), watch).await;
    handle.abort();
    Ok(())
}

async fn ws_draw(store: HttpBoardStore, args: DrawArgs) -> Result<(), CliError> {
    let points = parse_points(&args.points)?;
    let identity_id = args.session.identity_id.clone();
    let handle = open_session(&store, &args.session).await?;
    let mut view = handle.view();

    wait_for(&mut view, "room join", |v| v.users().get(&identity_id).is_some_and(|u| u.online)).await?;
    wait_for(&mut view, "board load", |v| v.title().is_some()).await?;
    let before = {
        let current = view.borrow();
        if current.is_layer_locked() {
            return Err(CliError::LayerLocked(args.session.slug.clone()));
        }
        current.last_stroke().map(str::to_owned)
    };

    let brush = Brush {
        tool: if args.erase { Tool::Erase } else { Tool::Draw },
        color: args.session.color.clone(),
        size: args.size,
    };
    handle.send(Input::SetBrush(brush)).await?;

    let mut points = points.into_iter();
    if let Some(first) = points.next() {
        handle.send(Input::PointerDown(first)).await?;
        for point in points {
            handle.send(Input::PointerMove(point)).await?;
        }
        handle.send(Input::PointerUp).await?;
    }

    wait_for(&mut view, "stroke", |v| {
        drawn_stroke(v, before.as_deref()).is_some() || v.is_layer_locked()
    })
    .await?;
    let Some(stroke_id) = drawn_stroke(&view.borrow(), before.as_deref()) else {
        return Err(CliError::LayerLocked(args.session.slug.clone()));
    };

    let persisted = async {
        loop {
            if let Ok(board) = store.get_board(&args.session.slug).await {
                if board.strokes.iter().any(|stroke| stroke.id == stroke_id) {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), persisted)
        .await
        .map_err(|_| CliError::Timeout("persisted stroke"))?;

    println!("{stroke_id}");
    handle.abort();
    Ok(())
}

async fn wait_for(
    view: &mut watch::Receiver<ClientView>,
    what: &'static str,
    check: impl Fn(&ClientView) -> bool,
) -> Result<(), CliError> {
    tokio::time::timeout(Duration::from_secs(5), view.wait_for(|v| check(v)))
        .await
        .map_err(|_| CliError::Timeout(what))?
        .map_err(|_| CliError::Sync(SyncError::Closed))?;
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn summarize(view: &ClientView) -> String {
    let settings = view.settings();
    let users: Vec<String> = view
        .users()
        .iter()
        .map(|user| format!("{}{}", user.name, if user.online { "" } else { "(offline)" }))
        .collect();
    format!(
        "strokes={} locked={} mode={} online={} users=[{}]",
        view.strokes().len(),
        settings.is_layer_locked,
        settings.collaboration_mode,
        view.online_count(),
        users.join(", ")
    )
}

/// The local stroke finalized since `before` was recorded, once the gesture
/// is over.
fn drawn_stroke(view: &ClientView, before: Option<&str>) -> Option<String> {
    if view.drawing().is_some() {
        return None;
    }
    view.last_stroke().filter(|id| Some(*id) != before).map(str::to_owned)
}

fn settings_patch(locked: Option<bool>, mode: Option<&str>) -> Result<SettingsPatch, CliError> {
    let collaboration_mode = mode.map(str::parse::<CollaborationMode>).transpose()?;
    let patch = SettingsPatch { is_layer_locked: locked, collaboration_mode };
    if patch.is_empty() {
        return Err(CliError::EmptyPatch);
    }
    Ok(patch)
}

fn parse_points(raw: &str) -> Result<Vec<Point>, CliError> {
    raw.split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',').ok_or_else(|| CliError::InvalidPoint(pair.to_owned()))?;
            let x = x.trim().parse::<f64>().map_err(|_| CliError::InvalidPoint(pair.to_owned()))?;
            let y = y.trim().parse::<f64>().map_err(|_| CliError::InvalidPoint(pair.to_owned()))?;
            Ok(Point::new(x, y))
        })
        .collect()
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
