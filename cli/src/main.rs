
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use portal::net::api::ApiClient;
use portal::net::mock::{MOCK_ADMIN_EMAIL, MOCK_ADMIN_PASSWORD, MOCK_DEVELOPER_EMAIL, MOCK_DEVELOPER_PASSWORD, MockAuthBackend};
use portal::net::types::{LoginKind, SearchQuery};
use portal::net::{AuthBackend, BackendError};
use portal::state::admin::AdminState;
use portal::state::dashboard::{DashboardState, MOCK_DELAY};
use portal::state::session::{Access, Route, SessionController, SessionError};
use portal::state::token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const SESSION_DIR: &str = ".movie-portal";
const SESSION_FILE: &str = "session";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot locate session file; pass --session-file or set MOVIE_PORTAL_SESSION_FILE")]
    NoSessionPath,
    #[error("{0}")]
    LoginFailed(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("{0}")]
    ViewFailed(String),
    #[error("access denied; go to {}", .0.path())]
    Redirect(Route),
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "movie-cli", about = "Movie API developer portal CLI")]
struct Cli {
    #[arg(long, env = "MOVIE_API_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    #[arg(long, env = "MOVIE_API_KEY")]
    api_key: Option<String>,

    #[arg(long, env = "MOVIE_PORTAL_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a developer account; a verification code is emailed.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MOVIE_PORTAL_PASSWORD")]
        password: String,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MOVIE_PORTAL_PASSWORD")]
        password: String,
        #[arg(long, default_value_t = false)]
        admin: bool,
    },
    Logout,
    Whoami,
    Dashboard(ViewArgs),
    Admin(ViewArgs),
    Keys(KeysCommand),
    Movies(MoviesCommand),
}

/// Protected view options. `--mock` signs in against the in-memory backend
/// with the given (or default mock) credentials and loads the fixed data.
#[derive(Args, Debug)]
struct ViewArgs {
    #[arg(long, default_value_t = false)]
    mock: bool,
    #[arg(long, requires = "mock")]
    email: Option<String>,
    #[arg(long, requires = "mock")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct KeysCommand {
    #[command(subcommand)]
    command: KeysSubcommand,
}

#[derive(Subcommand, Debug)]
enum KeysSubcommand {
    /// Issue another API key for the signed-in developer.
    Generate,
    /// Usage of the key given by --api-key.
    Stats,
}

#[derive(Args, Debug)]
struct MoviesCommand {
    #[command(subcommand)]
    command: MoviesSubcommand,
}

#[derive(Subcommand, Debug)]
enum MoviesSubcommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 10)]
        per_page: i64,
    },
    Get {
        id: i64,
    },
    Search {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        genre: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    api_key: Option<String>,
    session_file: Option<PathBuf>,
}

impl CliContext {
    fn client(&self) -> Result<ApiClient, CliError> {
        Ok(ApiClient::new(&self.base_url)?.with_api_key(self.api_key.clone()))
    }

    fn session(&self) -> Result<SessionController<ApiClient, FileTokenStore>, CliError> {
        let path = session_path(self.session_file.clone(), std::env::var_os("HOME").map(PathBuf::from))
            .ok_or(CliError::NoSessionPath)?;
        Ok(SessionController::new(self.client()?, FileTokenStore::new(path)))
    }
}

/// Explicit path wins; otherwise `$HOME/.movie-portal/session`.
fn session_path(explicit: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| home.map(|h| h.join(SESSION_DIR).join(SESSION_FILE)))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, api_key: cli.api_key, session_file: cli.session_file };
    tracing::debug!(base_url = %ctx.base_url, "movie-cli starting");

    match cli.command {
        Command::Register { name, email, password, confirm_password } => {
            let confirm = confirm_password.unwrap_or_else(|| password.clone());
            ctx.session()?.register(&name, &email, &password, &confirm).await?;
            println!("Account created. Check {email} for a verification code, then run `movie-cli verify`.");
            Ok(())
        }
        Command::Verify { email, code } => {
            ctx.session()?.verify_email(&email, &code).await?;
            println!("Email verified. You can now sign in.");
            Ok(())
        }
        Command::Login { email, password, admin } => run_login(&ctx, &email, &password, admin).await,
        Command::Logout => {
            let mut session = ctx.session()?;
            session.restore().await;
            session.logout().await;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            let mut session = ctx.session()?;
            session.restore().await;
            let user = session.current_user().ok_or(CliError::NotSignedIn)?;
            print_json(user)
        }
        Command::Dashboard(args) => run_dashboard(&ctx, args).await,
        Command::Admin(args) => run_admin(&ctx, args).await,
        Command::Keys(keys) => run_keys(&ctx, keys).await,
        Command::Movies(movies) => run_movies(&ctx, movies).await,
    }
}

async fn run_login(ctx: &CliContext, email: &str, password: &str, admin: bool) -> Result<(), CliError> {
    let mut session = ctx.session()?;
    // Picks up a stored session so the new login revokes it.
    session.restore().await;
    let kind = if admin { LoginKind::Admin } else { LoginKind::Developer };
    let ok = match kind {
        LoginKind::Developer => session.login(email, password).await,
        LoginKind::Admin => session.login_admin(email, password).await,
    };
    if !ok {
        return Err(CliError::LoginFailed(session.last_error().unwrap_or_default().to_owned()));
    }
    let next = SessionController::<ApiClient, FileTokenStore>::post_login_route(kind);
    if let Some(user) = session.current_user() {
        println!("Signed in as {} <{}>. Next: movie-cli {}", user.name, user.email, next.path().trim_start_matches('/'));
    }
    Ok(())
}

/// Check the guard for `route`; on denial print where to go and fail.
fn require<B: AuthBackend, S: TokenStore>(session: &SessionController<B, S>, route: Route) -> Result<(), CliError> {
    match session.guard(route) {
        Access::Granted => Ok(()),
        Access::Redirect(target) => {
            eprintln!("redirect: {}", target.path());
            Err(CliError::Redirect(target))
        }
    }
}

/// Sign in against the in-memory backend for `--mock` views.
async fn mock_session(
    args: &ViewArgs,
    kind: LoginKind,
) -> Result<SessionController<MockAuthBackend, MemoryTokenStore>, CliError> {
    let (default_email, default_password) = match kind {
        LoginKind::Developer => (MOCK_DEVELOPER_EMAIL, MOCK_DEVELOPER_PASSWORD),
        LoginKind::Admin => (MOCK_ADMIN_EMAIL, MOCK_ADMIN_PASSWORD),
    };
    let email = args.email.as_deref().unwrap_or(default_email);
    let password = args.password.as_deref().unwrap_or(default_password);

    let mut session = SessionController::new(MockAuthBackend::new(), MemoryTokenStore::new());
    let ok = match kind {
        LoginKind::Developer => session.login(email, password).await,
        LoginKind::Admin => session.login_admin(email, password).await,
    };
    if !ok {
        return Err(CliError::LoginFailed(session.last_error().unwrap_or_default().to_owned()));
    }
    Ok(session)
}

async fn run_dashboard(ctx: &CliContext, args: ViewArgs) -> Result<(), CliError> {
    let mut state = DashboardState::new();
    if args.mock {
        let session = mock_session(&args, LoginKind::Developer).await?;
        require(&session, Route::Dashboard)?;
        state.load_mock(MOCK_DELAY).await;
    } else {
        let mut session = ctx.session()?;
        session.restore().await;
        require(&session, Route::Dashboard)?;
        let token = session.token().ok_or(CliError::NotSignedIn)?;
        state.load(session.backend(), token).await;
    }

    if let Some(error) = &state.error {
        return Err(CliError::ViewFailed(error.clone()));
    }
    let Some(record) = &state.record else {
        println!("No API key yet. Run `movie-cli keys generate`.");
        return Ok(());
    };
    print_json(record)?;
    if let Some(sample) = state.quick_start(&ctx.base_url) {
        println!("\nQuick start:\n  {sample}");
    }
    Ok(())
}

async fn run_admin(ctx: &CliContext, args: ViewArgs) -> Result<(), CliError> {
    let mut state = AdminState::new();
    if args.mock {
        let session = mock_session(&args, LoginKind::Admin).await?;
        require(&session, Route::Admin)?;
        state.load_mock(MOCK_DELAY).await;
    } else {
        let mut session = ctx.session()?;
        session.restore().await;
        require(&session, Route::Admin)?;
        let token = session.token().ok_or(CliError::NotSignedIn)?;
        state.load(session.backend(), token).await;
    }

    match (&state.overview, &state.error) {
        (Some(overview), _) => print_json(overview),
        (None, Some(error)) => Err(CliError::ViewFailed(error.clone())),
        (None, None) => Ok(()),
    }
}

async fn run_keys(ctx: &CliContext, keys: KeysCommand) -> Result<(), CliError> {
    match keys.command {
        KeysSubcommand::Generate => {
            let mut session = ctx.session()?;
            session.restore().await;
            require(&session, Route::Dashboard)?;
            let token = session.token().ok_or(CliError::NotSignedIn)?;
            let record = session.backend().generate_key(token).await?;
            print_json(&record)
        }
        KeysSubcommand::Stats => print_json(&ctx.client()?.key_stats().await?),
    }
}

async fn run_movies(ctx: &CliContext, movies: MoviesCommand) -> Result<(), CliError> {
    let client = ctx.client()?;
    match movies.command {
        MoviesSubcommand::List { page, per_page } => print_json(&client.list_movies(page, per_page).await?),
        MoviesSubcommand::Get { id } => print_json(&client.get_movie(id).await?),
        MoviesSubcommand::Search { title, year, genre } => {
            let query = SearchQuery { title, year, genre };
            print_json(&client.search_movies(&query).await?)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
