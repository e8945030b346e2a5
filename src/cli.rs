use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::auth::guards::{check_route, GuardOutcome, Route};
use crate::auth::session::{SessionEvent, SessionSnapshot};
use crate::events::SessionSubscriber;
use crate::App;

#[derive(Parser, Debug)]
#[command(name = "noteling", about = "Noteling note service client")]
pub struct Cli {
    /// Override the API base URL from config
    #[arg(long, env = "NOTELING_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with an existing account
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when not given
        #[arg(long)]
        password: Option<String>,
    },
    /// Create a new account and sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when not given
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in profile, fetched fresh from the server
    Profile,
    /// Show session status and reachable routes
    Status,
    /// Navigate to a route, honoring its access policy
    Open {
        /// Route name or path, e.g. `profile` or `/auth`
        route: String,
    },
}

/// Dispatch a parsed command against the wired application
pub async fn run(app: App, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => login(app, &email, password).await,
        Command::Register {
            username,
            email,
            password,
        } => register(app, &username, &email, password).await,
        Command::Logout => logout(app).await,
        Command::Profile => profile(app).await,
        Command::Status => status(app).await,
        Command::Open { route } => open(app, &route).await,
    }
}

async fn login(app: App, email: &str, password: Option<String>) -> Result<()> {
    let mut events = app.session.subscribe();
    let snapshot = app.session.initialize().await;
    drain_notifications(&mut events);

    // The login view is guest-only
    if let GuardOutcome::Redirect(to) = check_route(Route::Login, &snapshot) {
        println!("Already signed in.");
        println!("-> {}", to.path());
        return Ok(());
    }

    let password = read_password(password)?;
    let user = app.session.login(email, &password).await?;
    println!("Signed in. Welcome back, {}!", user.username);
    println!("-> {}", Route::Home.path());
    Ok(())
}

async fn register(app: App, username: &str, email: &str, password: Option<String>) -> Result<()> {
    let mut events = app.session.subscribe();
    let snapshot = app.session.initialize().await;
    drain_notifications(&mut events);

    if let GuardOutcome::Redirect(to) = check_route(Route::Register, &snapshot) {
        println!("Already signed in.");
        println!("-> {}", to.path());
        return Ok(());
    }

    let password = read_password(password)?;
    let user = app.session.register(username, email, &password).await?;
    println!("Account created. Welcome, {}!", user.username);
    println!("-> {}", Route::Home.path());
    Ok(())
}

async fn logout(app: App) -> Result<()> {
    let mut events = app.session.subscribe();
    app.session.initialize().await;
    drain_notifications(&mut events);

    app.session.logout().await?;

    // The store only emits; navigation is decided here
    while let Some(event) = events.try_recv() {
        if let SessionEvent::LoggedOut = event {
            println!("Signed out.");
            println!("-> {}", Route::Login.path());
        }
    }
    Ok(())
}

async fn profile(app: App) -> Result<()> {
    let mut events = app.session.subscribe();
    let snapshot = app.session.initialize().await;
    drain_notifications(&mut events);

    if let GuardOutcome::Redirect(to) = check_route(Route::Profile, &snapshot) {
        println!("Please sign in to view your profile.");
        println!("-> {}", to.path());
        return Ok(());
    }

    let user = app.session.refresh_profile().await?;
    println!("My profile");
    println!("  Username: {}", user.username);
    println!("  Email:    {}", user.email);
    println!("  User ID:  {}", user.id);
    Ok(())
}

async fn status(app: App) -> Result<()> {
    let mut events = app.session.subscribe();
    let snapshot = app.session.initialize().await;
    drain_notifications(&mut events);

    match &snapshot.user {
        Some(user) => println!("Signed in as {} <{}>", user.username, user.email),
        None => println!("Not signed in."),
    }

    println!("Routes:");
    for route in Route::ALL {
        match check_route(route, &snapshot) {
            GuardOutcome::Allow => println!("  {:<10} {}", route.to_string(), route.path()),
            GuardOutcome::Redirect(to) => {
                println!("  {:<10} {} (redirects to {})", route.to_string(), route.path(), to.path());
            }
        }
    }
    Ok(())
}

async fn open(app: App, route: &str) -> Result<()> {
    let route: Route = route.parse().map_err(anyhow::Error::msg)?;

    let mut events = app.session.subscribe();
    let snapshot = app.session.initialize().await;
    drain_notifications(&mut events);

    match check_route(route, &snapshot) {
        GuardOutcome::Allow => render(route, &snapshot),
        GuardOutcome::Redirect(to) => {
            debug!(%route, to = %to, "Guard redirected navigation");
            println!("-> {}", to.path());
            render(to, &snapshot);
        }
    }
    Ok(())
}

// Plain-text stand-ins for the views
fn render(route: Route, snapshot: &SessionSnapshot) {
    println!("[{}]", route.path());
    match route {
        Route::Home => match &snapshot.user {
            Some(user) => println!("Welcome back, {}.", user.username),
            None => println!("Welcome to Noteling. Sign in to start taking notes."),
        },
        Route::About => println!("Noteling is a small note-taking service."),
        Route::Notes => println!("No notes yet."),
        Route::Profile => match &snapshot.user {
            Some(user) => {
                println!("Username: {}", user.username);
                println!("Email:    {}", user.email);
                println!("User ID:  {}", user.id);
            }
            None => println!("Loading profile..."),
        },
        Route::Login => println!("Sign in with `noteling login --email <email>`."),
        Route::Register => {
            println!("Create an account with `noteling register --username <name> --email <email>`.");
        }
    }
}

// Surface store notifications (e.g. an expired session) before any output
fn drain_notifications(events: &mut SessionSubscriber) {
    while let Some(event) = events.try_recv() {
        if let SessionEvent::Expired { reason } = event {
            println!("{reason}");
        }
    }
}

fn read_password(arg: Option<String>) -> Result<String> {
    if let Some(password) = arg {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
