//! Command-line views over the login core.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::{
    api::{LoginEventFeed, RegistrationForm},
    camera::{CapturedFrame, DeviceStatus, RawFrame, StillImageBackend},
    directory::{load_directory, DirectoryView},
    error::StatusBanner,
    init_logging,
    navigation::Route,
    recognition::AttemptPhase,
    session::{ActiveSession, SessionAccess, SessionHandoff},
    settings::{flag_enabled, Settings},
    AppState,
};

#[derive(Parser)]
#[command(name = "facegate")]
#[command(about = "Face-recognition login client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Recognition backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory holding settings.json and the session database
    #[arg(long, global = true, env = "FACEGATE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a face image
    Login {
        /// Still image standing in for the camera
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Show the logged-in user
    Whoami,

    /// Drop the stored session
    Logout,

    /// Show recent login events and any active lockout
    History {
        /// Keep counting down while locked
        #[arg(short, long)]
        watch: bool,
    },

    /// Register a new user
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, default_value = "")]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Face image for the new user
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// List registered users (admin)
    Users {
        /// Delete the user with this id instead of listing
        #[arg(long, value_name = "ID")]
        delete: Option<String>,
    },

    /// Log in as administrator
    AdminLogin {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Print the backend's own log
    ServerLogs,
}

/// Debug output wanted before `settings.json` has been read.
fn debug_requested(flag: bool, env_value: Option<&str>) -> bool {
    flag || env_value.is_some_and(flag_enabled)
}

pub async fn run(cli: Cli) -> Result<()> {
    let early_debug = debug_requested(cli.debug, std::env::var("FACEGATE_DEBUG").ok().as_deref());
    init_logging(early_debug);

    let mut settings = Settings::load(cli.data_dir.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    settings.debug |= early_debug;
    if settings.debug && !early_debug {
        init_logging(true);
    }

    let state = AppState::open(settings)?;

    match cli.command {
        Commands::Login { image } => login(&state, image).await,
        Commands::Whoami => whoami(&state, None).await,
        Commands::Logout => {
            let route = state.sessions.logout().await?;
            println!("Logged out. Next: {route}");
            Ok(())
        }
        Commands::History { watch } => history(&state, watch).await,
        Commands::Register {
            username,
            email,
            password,
            image,
        } => register(&state, username, email, password, image).await,
        Commands::Users { delete } => users(&state, delete).await,
        Commands::AdminLogin { username, password } => {
            let gate = state.admin_gate();
            match gate.login(&username, &password).await {
                Ok(handoff) => whoami(&state, Some(&handoff)).await,
                Err(err) => bail!(StatusBanner::from(&err).message),
            }
        }
        Commands::ServerLogs => {
            let logs = state.api.fetch_server_log().await?;
            print!("{logs}");
            Ok(())
        }
    }
}

async fn login(state: &AppState, image: PathBuf) -> Result<()> {
    let camera = state.camera(Arc::new(StillImageBackend::new(image)));
    let recognition = state.recognition(camera.clone());

    camera.initialize().await;
    println!("{}", camera.device().await.banner().message);
    let device = camera.settled().await;
    if device.status != DeviceStatus::Ready {
        camera.teardown().await;
        bail!(device.banner().message);
    }

    let outcome = match recognition.start().await {
        Ok(attempt) => {
            println!("{}", attempt.banner().message);
            recognition.outcome().await
        }
        Err(err) => {
            recognition.teardown().await;
            camera.teardown().await;
            bail!(StatusBanner::from(&err).message);
        }
    };
    println!("{}", outcome.banner().message);

    let handoff = if outcome.phase == AttemptPhase::Succeeded {
        recognition.next_handoff().await
    } else {
        None
    };
    recognition.teardown().await;
    camera.teardown().await;

    match handoff {
        Some(handoff) => whoami(state, Some(&handoff)).await,
        None => bail!("{} Run `facegate login` again to retry.", outcome.banner().message),
    }
}

async fn whoami(state: &AppState, handoff: Option<&SessionHandoff>) -> Result<()> {
    match state.sessions.resolve(handoff).await {
        SessionAccess::Granted(session) => {
            let destination = handoff.map(|h| h.destination).unwrap_or(Route::Welcome);
            print_session(&session, destination);
            Ok(())
        }
        SessionAccess::Redirect(route) => bail!("Not logged in. Next: {route}"),
    }
}

fn print_session(session: &ActiveSession, destination: Route) {
    println!("[{destination}] Welcome, {}!", session.user_name);
    println!(
        "Logged in at {}",
        session.login_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

async fn history(state: &AppState, watch: bool) -> Result<()> {
    let feed: LoginEventFeed = state.api.fetch_login_events().await?;
    if feed.logs.is_empty() {
        println!("No login history found.");
    }
    for event in &feed.logs {
        let status: String = event.status.clone().into();
        println!("{:<26} {:<20} {}", event.time, event.username, status);
    }

    let countdown = state.lockout();
    let lock = countdown.ingest_feed(&feed).await;
    let Some(banner) = lock.banner() else {
        return Ok(());
    };
    println!("{}", banner.message);
    if !watch {
        countdown.teardown().await;
        return Ok(());
    }

    let mut rx = countdown.subscribe();
    while rx.changed().await.is_ok() {
        let lock = *rx.borrow_and_update();
        match lock.banner() {
            Some(banner) => println!("{} ({:.0}%)", banner.message, lock.progress() * 100.0),
            None => {
                println!("Lock expired. You may try logging in again.");
                break;
            }
        }
    }
    countdown.teardown().await;
    Ok(())
}

async fn register(
    state: &AppState,
    username: String,
    email: String,
    password: String,
    image: Option<PathBuf>,
) -> Result<()> {
    let image = match image {
        Some(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let frame = tokio::task::spawn_blocking(move || {
                CapturedFrame::encode(RawFrame::Encoded(bytes))
            })
            .await??;
            Some(frame.into_data_url())
        }
        None => None,
    };

    let form = RegistrationForm {
        username,
        email,
        password,
        image,
    };
    state.api.register(&form).await?;
    if let Err(err) = state.users.remember_registration(&form).await {
        log::warn!("Registered, but failed to cache user locally: {err:#}");
    }
    println!("Registration successful. Next: {}", Route::Login);
    Ok(())
}

async fn users(state: &AppState, delete: Option<String>) -> Result<()> {
    if let SessionAccess::Redirect(route) = state.sessions.resolve(None).await {
        bail!("Not logged in. Next: {route}");
    }

    if let Some(id) = delete {
        state.api.delete_user(&id).await?;
        println!("Deleted user {id}");
        return Ok(());
    }

    match load_directory(&state.api, &state.users).await {
        DirectoryView::Listed { users, notice } => {
            if let Some(notice) = notice {
                println!("{notice}");
            }
            if users.is_empty() {
                println!("No users found.");
            }
            for user in users {
                println!(
                    "{:<10} {:<20} {:<28} {:<6} {}",
                    user.id.as_deref().unwrap_or("-"),
                    user.name,
                    user.email,
                    user.role,
                    user.login_time.as_deref().unwrap_or("never"),
                );
            }
            Ok(())
        }
        DirectoryView::Redirect(route) => bail!("Admin credentials rejected. Next: {route}"),
    }
}
