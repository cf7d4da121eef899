//! `escalas`: command-line client for the Sistema de Escalas backend.
//!
//! # Usage
//!
//! ```text
//! escalas <command> [args]
//!
//! Commands:
//!   login <username> <password>   authenticate and store the session
//!   logout                        forget the stored session
//!   whoami                        fetch the current user (refreshes the stored copy)
//!   update-profile <field=value>..  change the current user's profile
//!   status                        show backend URL and stored session
//!   get <path>                    GET /api/<path> and print the JSON body
//! ```
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Build the API client over the file-backed session
//!   5. Run the command; failures print the call site's notice

use std::{process, sync::Arc};

use escalas_client::{
    ApiClient, AppError, Notices,
    api::ApiError,
    config::{self, Config},
    logger,
    session::{FileStore, SessionStore},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

enum Command {
    Help,
    Login { username: String, password: String },
    Logout,
    WhoAmI,
    UpdateProfile { changes: Map<String, Value> },
    Status,
    Get { path: String },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let command = parse_args(std::env::args().skip(1).collect())?;
    if let Command::Help = command {
        print_help();
        return Ok(());
    }

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        backend_url = %config.backend_url,
        session_dir = %config.session_dir.display(),
        log_level = %config.log_level,
        "config loaded"
    );

    let session = SessionStore::new(Arc::new(FileStore::new(&config.session_dir)));
    let client = ApiClient::from_config(&config, session).map_err(|e| AppError::Request(e.to_string()))?;
    let notices = Notices::with_labels(&config.messages);

    execute(&client, &config, &notices, command).await
}

async fn execute(client: &ApiClient, config: &Config, notices: &Notices, command: Command) -> Result<(), AppError> {
    let fail = |site: &str, e: ApiError| AppError::Request(notices.notice(site, &e));

    match command {
        Command::Help => print_help(),
        Command::Login { username, password } => {
            let session = client.login(&username, &password).await.map_err(|e| fail("login", e))?;
            let name = session.user.nome_completo.as_deref().unwrap_or(session.user.id.as_str());
            println!("✓ Logged in as {name}");
        }
        Command::Logout => {
            client.logout().map_err(|e| fail("logout", e))?;
            println!("✓ Logged out");
        }
        Command::WhoAmI => {
            let user = client.me().await.map_err(|e| fail("profile_load", e))?;
            println!("{}", pretty(&user));
        }
        Command::UpdateProfile { changes } => {
            let user = client.update_profile(&changes).await.map_err(|e| fail("profile_update", e))?;
            println!("✓ Profile updated");
            println!("{}", pretty(&user));
        }
        Command::Status => {
            println!("backend:  {}", config.api_base());
            println!("session:  {}", config.session_dir.display());
            match client.session().load()? {
                Some(s) => println!("user:     {} ({})", s.user.id, s.user.funcao.as_deref().unwrap_or("-")),
                None if client.session().is_authenticated()? => println!("user:     <token only>"),
                None => println!("user:     <not logged in>"),
            }
        }
        Command::Get { path } => {
            let body: Value = client.get(&path).await.map_err(|e| fail("get", e))?;
            println!("{}", pretty(&body));
        }
    }
    Ok(())
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}

// ── CLI arg parsing ────────────────────────────────────────────────────────

fn parse_args(args: Vec<String>) -> Result<Command, AppError> {
    let mut iter = args.into_iter();
    let Some(command) = iter.next() else {
        print_help();
        return Err(AppError::Usage("missing command".into()));
    };

    let mut next = |what: &str| iter.next().ok_or_else(|| AppError::Usage(format!("{command} requires <{what}>")));

    match command.as_str() {
        "--help" | "-h" | "help" => Ok(Command::Help),
        "login" => {
            let username = next("username")?;
            let password = next("password")?;
            Ok(Command::Login { username, password })
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::WhoAmI),
        "update-profile" => parse_changes(iter).map(|changes| Command::UpdateProfile { changes }),
        "status" => Ok(Command::Status),
        "get" => Ok(Command::Get { path: next("path")? }),
        other => Err(AppError::Usage(format!("unknown command '{other}' (try --help)"))),
    }
}

/// `field=value` pairs; a value that parses as JSON keeps its type, anything
/// else is sent as a string.
fn parse_changes(args: impl Iterator<Item = String>) -> Result<Map<String, Value>, AppError> {
    let mut changes = Map::new();
    for arg in args {
        let Some((field, raw)) = arg.split_once('=').filter(|(f, _)| !f.is_empty()) else {
            return Err(AppError::Usage(format!("update-profile expects <field=value>, got '{arg}'")));
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        changes.insert(field.to_string(), value);
    }
    if changes.is_empty() {
        return Err(AppError::Usage("update-profile requires at least one <field=value>".into()));
    }
    Ok(changes)
}

fn print_help() {
    eprintln!("usage: escalas <command> [args]");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  login <username> <password>   authenticate and store the session");
    eprintln!("  logout                        forget the stored session");
    eprintln!("  whoami                        fetch the current user");
    eprintln!("  update-profile <field=value>..  change the current user's profile");
    eprintln!("  status                        show backend URL and stored session");
    eprintln!("  get <path>                    GET /api/<path> and print the JSON body");
    eprintln!();
    eprintln!("environment:");
    eprintln!("  ESCALAS_CONFIG        config file (default: config/default.toml)");
    eprintln!("  ESCALAS_BACKEND_URL   backend origin, e.g. http://localhost:8001");
    eprintln!("  ESCALAS_SESSION_DIR   where the session is stored");
    eprintln!("  ESCALAS_LOG_LEVEL     log level (RUST_LOG takes precedence)");
}
