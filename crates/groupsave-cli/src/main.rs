//! groupsave - command line client for savings groups.
//!
//! Each invocation restores the stored session, runs one command against
//! the backend and prints any notifications raised along the way.

mod cli;
mod output;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use groupsave_core::models::{
    GroupUpdate, LoginRequest, NewGroup, NewTransaction, ProfileUpdate, RegisterRequest,
    TransactionStatus,
};
use groupsave_core::{
    ApiClient, Config, LocalStore, NotificationFeed, NotificationKind, Notifier, SessionStore,
};

use cli::{Cli, Command};

/// Directory for daily log files; unset means stderr only
const LOG_DIR_ENV: &str = "GROUPSAVE_LOG_DIR";
const EMAIL_ENV: &str = "GROUPSAVE_EMAIL";
const PASSWORD_ENV: &str = "GROUPSAVE_PASSWORD";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "groupsave.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();
    info!(command = ?cli.command, "groupsave starting");

    let notifier = Notifier::new();
    let mut feed = notifier.subscribe();

    let result = run(cli.command, notifier).await;
    let shown = print_notifications(&mut feed);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.to_string();
            if !shown.contains(&message) {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Print pending notifications and return the error messages among them.
fn print_notifications(feed: &mut NotificationFeed) -> Vec<String> {
    feed.poll();
    let mut errors = Vec::new();
    for notification in feed.visible() {
        eprintln!("{}", output::notification_line(notification));
        if notification.kind == NotificationKind::Error {
            errors.push(notification.message.clone());
        }
    }
    errors
}

async fn run(command: Command, notifier: Notifier) -> Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring unreadable config: {:#}", e);
        Config::default()
    });

    let store = LocalStore::in_dir(config.storage_dir()?);
    let api = ApiClient::with_timeout(config.api_base_url(), store, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let session = SessionStore::new(api, notifier);

    let state = session.rehydrate().await;
    info!(?state, "Session restored");

    if command.requires_session() && !session.is_authenticated() {
        bail!("Not signed in. Run `groupsave login` first.");
    }

    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| env_value(EMAIL_ENV)) {
                Some(email) => email,
                None => prompt_line("Email", config.last_email.as_deref())?,
            };
            let password = match env_value(PASSWORD_ENV) {
                Some(password) => password,
                None => prompt_password("Password: ")?,
            };

            let user = session.login(&LoginRequest::new(email.clone(), password)).await?;
            println!("{}", output::user_summary(&user));

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!("Failed to save config: {:#}", e);
            }
        }
        Command::Register { username, email } => {
            let password = prompt_password("Password: ")?;
            let confirm = prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            let details = RegisterRequest {
                username,
                email,
                password,
            };
            let user = session.register(&details).await?;
            if session.has_credential() {
                println!("{}", output::user_summary(&user));
            } else {
                println!("Account created for {}. Run `groupsave login` to sign in.", user.username);
            }
        }
        Command::Logout => session.logout().await,
        Command::Whoami => {
            let user = session
                .current_user()
                .ok_or_else(|| anyhow!("Not signed in"))?;
            println!("{}", output::user_summary(&user));
        }
        Command::Profile {
            username,
            email,
            password,
        } => {
            let password = if password {
                Some(prompt_password("New password: ")?)
            } else {
                None
            };
            let update = ProfileUpdate {
                username,
                email,
                password,
            };
            if update.is_empty() {
                bail!("Nothing to update. Pass --username, --email or --password.");
            }
            let user = session.update_profile(&update).await?;
            println!("{}", output::user_summary(&user));
        }
        Command::Groups => {
            let groups = session.with_api(|api| async move { api.fetch_groups().await }).await?;
            if groups.is_empty() {
                println!("You are not in any savings groups yet.");
            }
            for group in &groups {
                println!("{}", output::group_row(group));
            }
        }
        Command::Group { id } => {
            let group = session.with_api(|api| async move { api.fetch_group(id).await }).await?;
            println!("{}", output::group_detail(&group));
        }
        Command::CreateGroup {
            name,
            target,
            description,
        } => {
            let new_group = NewGroup {
                name,
                description,
                target_amount: target,
            };
            let group = session
                .with_api(|api| async move { api.create_group(&new_group).await })
                .await?;
            session.notifier().success(format!("Group \"{}\" created", group.name));
            println!("{}", output::group_detail(&group));
        }
        Command::UpdateGroup {
            id,
            name,
            target,
            description,
        } => {
            let update = GroupUpdate {
                name,
                description,
                target_amount: target,
            };
            if update.is_empty() {
                bail!("Nothing to update. Pass --name, --target or --description.");
            }
            let group = session
                .with_api(|api| async move { api.update_group(id, &update).await })
                .await?;
            session.notifier().success(format!("Group \"{}\" updated", group.name));
            println!("{}", output::group_detail(&group));
        }
        Command::Join { id } => {
            let joined = session.with_api(|api| async move { api.join_group(id).await }).await?;
            session
                .notifier()
                .success(joined.message.unwrap_or_else(|| "Joined group".to_string()));
        }
        Command::Leave { id } => {
            let left = session.with_api(|api| async move { api.leave_group(id).await }).await?;
            session
                .notifier()
                .success(left.message.unwrap_or_else(|| "Left group".to_string()));
        }
        Command::DeleteGroup { id } => {
            let deleted = session.with_api(|api| async move { api.delete_group(id).await }).await?;
            session
                .notifier()
                .success(deleted.message.unwrap_or_else(|| "Group deleted".to_string()));
        }
        Command::Contribute {
            group,
            amount,
            description,
        } => {
            let contribution = NewTransaction {
                group_id: group,
                amount,
                description,
            };
            let tx = session
                .with_api(|api| async move { api.create_contribution(&contribution).await })
                .await?;
            session.notifier().success("Contribution recorded");
            println!("{}", output::transaction_row(&tx));
        }
        Command::Withdraw {
            group,
            amount,
            description,
        } => {
            let withdrawal = NewTransaction {
                group_id: group,
                amount,
                description,
            };
            let tx = session
                .with_api(|api| async move { api.request_withdrawal(&withdrawal).await })
                .await?;
            session.notifier().success("Withdrawal requested. Awaiting approval.");
            println!("{}", output::transaction_row(&tx));
        }
        Command::Transactions { group } => {
            let history = session
                .with_api(|api| async move { api.fetch_group_transactions(group).await })
                .await?;
            if history.is_empty() {
                println!("No transactions yet.");
            }
            for tx in &history {
                println!("{}", output::transaction_row(tx));
            }
        }
        Command::Approve { transaction } => {
            set_withdrawal_status(&session, transaction, TransactionStatus::Approved).await?;
        }
        Command::Reject { transaction } => {
            set_withdrawal_status(&session, transaction, TransactionStatus::Rejected).await?;
        }
    }

    Ok(())
}

async fn set_withdrawal_status(
    session: &SessionStore,
    transaction: i64,
    status: TransactionStatus,
) -> Result<()> {
    let tx = session
        .with_api(|api| async move { api.update_withdrawal_status(transaction, status).await })
        .await?;
    session
        .notifier()
        .success(format!("Withdrawal {}", tx.status.to_string().to_lowercase()));
    println!("{}", output::transaction_row(&tx));
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read one line from stdin, offering `default` when given.
fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => eprint!("{} [{}]: ", label, d),
        None => eprint!("{}: ", label),
    }
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim();

    match (value.is_empty(), default) {
        (false, _) => Ok(value.to_string()),
        (true, Some(d)) => Ok(d.to_string()),
        (true, None) => Err(anyhow!("{} is required", label)),
    }
}

fn prompt_password(prompt: &str) -> Result<String> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}
