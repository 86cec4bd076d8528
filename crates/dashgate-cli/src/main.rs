//! dashgate - command-line front end for the dashboard session manager.
//!
//! Stands in for the dashboard shell: it restores the session on startup,
//! logs in and out, and routes paths through the access gate.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dashgate_core::session::HOME_PATH;
use dashgate_core::{
    AccessGate, Config, CredentialStore, Credentials, GateDecision, Navigation, SessionClient,
    SessionContext,
};

const USAGE: &str = "\
Usage: dashgate <command>

Commands:
  login [email]   Log in (password from DASHGATE_PASSWORD or prompt)
  logout          End the current session
  status          Show who is logged in
  open [path]     Show what the dashboard would do for a path
  header          Print the Authorization header for API calls";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");
    if matches!(command, "help" | "-h" | "--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Ok(url) = std::env::var("DASHGATE_LOGIN_URL") {
        config.login_url = url;
    }

    let store = Arc::new(CredentialStore::new(config.open_storage()?));
    let client = SessionClient::from_config(&config, store)?;
    let (session, mut nav_rx) = SessionContext::start(client);
    info!(status = ?session.status(), "Session context ready");

    match command {
        "login" => login(&session, &mut config, args.get(2).cloned()).await?,
        "logout" => {
            session.logout()?;
            drain_navigation(&mut nav_rx);
            println!("Logged out.");
        }
        "status" | "whoami" => status(&session),
        "open" => open(&session, args.get(2).map(String::as_str).unwrap_or(HOME_PATH)),
        "header" => {
            let headers = session
                .client()
                .auth_header()
                .context("Not logged in - run `dashgate login` first")?;
            for (name, value) in headers.iter() {
                println!("{}: {}", name, value.to_str().unwrap_or_default());
            }
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}

async fn login(session: &SessionContext, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email
        .or_else(|| std::env::var("DASHGATE_EMAIL").ok())
        .or_else(|| config.last_email.clone())
    {
        Some(email) => email,
        None => prompt_email()?,
    };

    let password = match std::env::var("DASHGATE_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    let user = session
        .login(&Credentials::new(email.clone(), password))
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {} <{}>", user.full_name(), user.email);
    Ok(())
}

fn prompt_email() -> Result<String> {
    print!("Email: ");
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(email.trim().to_string())
}

fn status(session: &SessionContext) {
    match session.user() {
        Some(user) if session.is_authenticated() => {
            println!("Logged in as {} <{}>", user.full_name(), user.email);
            if !user.roles.is_empty() {
                println!("Roles: {}", user.roles.join(", "));
            }
        }
        _ => println!("Not logged in."),
    }
}

fn open(session: &SessionContext, path: &str) {
    match AccessGate::route(session, path, path) {
        GateDecision::Loading => println!("Loading..."),
        GateDecision::Redirect(nav) => print_navigation(&nav),
        GateDecision::Render(view) => println!("Render {}", view),
    }
}

fn drain_navigation(nav_rx: &mut mpsc::Receiver<Navigation>) {
    while let Ok(nav) = nav_rx.try_recv() {
        print_navigation(&nav);
    }
}

fn print_navigation(nav: &Navigation) {
    let mode = if nav.replace { "replace" } else { "push" };
    println!("Redirect to {} ({})", nav.path, mode);
}
