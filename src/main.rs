//! medport — clinic portal client CLI
//!
//! Thin command-line front end over the medport client and flow crates,
//! talking to the clinic-management backend over HTTP JSON.
//!
//! Usage:
//!   medport --token <bearer> tenants            # List reachable clinics
//!   medport --token <bearer> select <clinic>    # Select a clinic
//!   medport watch                               # Poll a blocked clinic
//!
//! The session (credential, relationship, fallback clinic id) is snapshotted
//! to a JSON file between invocations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use medport_client::{ApiClient, HttpTransport, SessionEvent, SessionStore};
use medport_flows::{AccessGuard, GuardOutcome, GuardState, GuardTiming, Selection, SelectionFlow};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "medport", about = "Medport — clinic portal client")]
struct Cli {
    /// Backend base URL
    #[arg(long, default_value = "http://127.0.0.1:8080/api/")]
    base_url: Url,

    /// Bearer token for this session (persisted into the session file)
    #[arg(long)]
    token: Option<String>,

    /// Session snapshot file (defaults to ~/.medport/session.json)
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the clinics reachable by the current credential
    Tenants,
    /// Select a clinic and establish the tenant context
    Select { clinic_id: String },
    /// Poll a blocked clinic until access clears
    Watch,
}

fn default_session_file() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".medport/session.json")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let session_file = cli.session_file.unwrap_or_else(default_session_file);
    let store = Arc::new(SessionStore::load_from(&session_file).await);
    if let Some(token) = cli.token {
        store.set_credential(token);
    }

    let transport = Arc::new(HttpTransport::new(cli.base_url));
    let api = Arc::new(ApiClient::new(transport, store.clone()));

    // The web client navigates to the login page on forced re-login; the CLI
    // prints a warning instead.
    let mut events = api.subscribe();
    tokio::spawn(async move {
        while let Ok(SessionEvent::ForceLogin) = events.recv().await {
            warn!("session expired, log in again");
        }
    });

    match cli.command {
        Command::Tenants => {
            let flow = SelectionFlow::new(api);
            let clinics = flow
                .list_clinics()
                .await
                .context("listing clinics failed")?
                .unwrap_or_default();
            if clinics.is_empty() {
                println!("No clinics reachable with this credential.");
            }
            for clinic in clinics {
                let marker = if clinic.active { "" } else { " (inactive)" };
                println!("{}  {}{}", clinic.id, clinic.name, marker);
            }
        }

        Command::Select { clinic_id } => {
            let flow = SelectionFlow::new(api);
            match flow
                .select_clinic(&clinic_id)
                .await
                .context("selection failed")?
            {
                Selection::Entered => println!("Selected {clinic_id}; clinic is active."),
                Selection::Blocked(status) => {
                    println!(
                        "Selected {clinic_id}; access blocked ({status:?}). Run `medport watch`."
                    );
                }
                Selection::ProfileSetupRequired => {
                    println!("Selected {clinic_id}; edit the clinic profile before entry.");
                }
            }
        }

        Command::Watch => {
            let mut guard = AccessGuard::spawn(api, GuardTiming::default());
            let mut states = guard.subscribe();
            tokio::spawn(async move {
                while states.changed().await.is_ok() {
                    let state = *states.borrow();
                    if let GuardState::Blocked | GuardState::Promoting = state {
                        println!("  … {state:?}");
                    }
                }
            });
            match guard.outcome().await {
                GuardOutcome::Enter => println!("Access restored; session promoted."),
                GuardOutcome::Login => println!("No usable session; log in and select a clinic."),
            }
        }
    }

    store
        .persist_to(&session_file)
        .await
        .context("persisting session snapshot failed")?;
    Ok(())
}
