//! Login screen demo.
//!
//! Drives the login reactor from the command line: enters the screen, types
//! the credentials, logs in, and prints every state and effect until the
//! login finishes or Ctrl-C is pressed.

mod contacts;
mod reactor;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use flowreactor::{ReactorConfig, ReactorHandle};

use crate::contacts::InMemoryContacts;
use crate::reactor::{Action, Effect, LoginReactor, State};

/// Login demo command line arguments.
#[derive(Parser, Debug)]
#[command(name = "login_demo")]
#[command(about = "Drive the sample login reactor from the terminal")]
struct Args {
    /// Reactor config file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Username to log in with
    #[arg(short, long, default_value = "ada@example.com")]
    username: String,

    /// Password to log in with
    #[arg(short, long, default_value = "hunter2")]
    password: String,

    /// Simulated login latency in milliseconds
    #[arg(long, default_value_t = 1000)]
    login_delay_ms: u64,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ReactorConfig> {
    let config = match path {
        Some(path) => ReactorConfig::load_from(path),
        None => ReactorConfig::load(),
    };
    config.context("loading reactor config")
}

fn print_state(state: &State) {
    let emails = state
        .auto_complete_emails
        .as_ref()
        .map(|emails| emails.join(", "))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "state: username={:?} busy={} login_enabled={} fields_enabled={} emails=[{}]",
        state.username,
        state.is_busy,
        state.login_enabled(),
        state.username_enabled() && state.password_enabled(),
        emails
    );
}

fn print_effect(effect: &Effect) {
    match effect {
        Effect::LoggedIn { account } => {
            println!("effect: logged in as {} ({})", account.name, account.kind);
        }
        Effect::ShowError(message) => {
            println!("effect: login failed: {message}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = load_config(args.config.as_ref())?;
    tracing::info!(
        ingress_capacity = config.ingress_capacity,
        subscriber_capacity = config.subscriber_capacity,
        overflow = ?config.overflow,
        "Starting login demo"
    );

    let contacts = InMemoryContacts::new(vec![
        "ada@example.com".to_string(),
        "grace@example.com".to_string(),
    ]);
    let reactor = LoginReactor::new(
        Arc::new(contacts),
        Duration::from_millis(args.login_delay_ms),
    );
    let handle = ReactorHandle::spawn_with_config(reactor, State::default(), config);
    tracing::info!(reactor_id = %handle.id(), "Reactor spawned");

    let mut states = handle.states();
    let printer = tokio::spawn(async move {
        while let Some(state) = states.recv().await {
            print_state(&state);
        }
    });
    let mut effects = handle.effects();

    handle.send(Action::EnterScreen).await?;
    handle.send(Action::UsernameChanged(args.username)).await?;
    handle.send(Action::PasswordChanged(args.password)).await?;
    handle.send(Action::Login).await?;

    // Every login attempt ends with exactly one effect.
    tokio::select! {
        effect = effects.recv() => match effect {
            Some(effect) => print_effect(&effect),
            None => tracing::warn!("Reactor completed before the login finished"),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, cancelling reactor");
            handle.cancel();
        }
    }

    handle.close();
    handle.completed().await;
    printer.await.context("state printer task failed")?;
    tracing::info!("Login demo finished");
    Ok(())
}
