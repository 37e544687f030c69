//! Handraise CLI entry point

use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tracing::debug;

use boardstore::StoreHandle;
use handraise::cli::{Cli, Command};
use handraise::config::Config;
use handraise::domain::Severity;
use handraise::events::create_event_bus;
use handraise::identity::Principal;
use handraise::role::RoleResolver;
use handraise::session::Session;
use handraise::triage::TriageEntry;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref())?;

    let config = Config::load(cli.config.as_ref())?;
    config.validate()?;

    match cli.command {
        Some(Command::ResolveRole { email }) => {
            let resolver = RoleResolver::new(&config.domains);
            println!("{}", resolver.resolve(&email));
            Ok(())
        }
        Some(Command::Demo) | None => run_demo(config).await,
    }
}

/// Scripted simulation: one responder, two requesters, a few transitions
///
/// Exercises the whole synchronization core against an in-process store
/// and prints the responder's triage order after each step.
async fn run_demo(config: Config) -> Result<()> {
    debug!("run_demo: starting");
    let store = StoreHandle::spawn();
    let events = create_event_bus(config.store.event_capacity);

    let suffix = |name: &str, s: &str| {
        if s.starts_with('@') {
            format!("{}{}", name, s)
        } else {
            format!("{}@{}", name, s)
        }
    };

    let ada = Principal::with_id(
        "resp-ada",
        "Ada",
        suffix("ada", &config.domains.responder_suffix),
    );
    let sam = Principal::with_id("req-sam", "Sam", suffix("sam", &config.domains.requester_suffix));
    let kim = Principal::with_id("req-kim", "Kim", suffix("kim", &config.domains.requester_suffix));

    let responder = Session::start(store.clone(), events.clone(), &config, ada).await?;
    let mut sam_session = Session::start(store.clone(), events.clone(), &config, sam).await?;
    let mut kim_session = Session::start(store.clone(), events.clone(), &config, kim).await?;

    let roster = sam_session.roster()?;
    settle().await;
    println!("Responders online:");
    for entry in roster.borrow().iter() {
        println!("  {} <{}>", entry.record.display_name, entry.record.email);
    }

    sam_session.select_responder("resp-ada").await?;
    kim_session.select_responder("resp-ada").await?;
    kim_session.set_severity(Severity::High).await?;
    kim_session.set_note("projector is smoking").await?;
    sam_session.set_note("question about lab 3").await?;

    let order = responder.triage()?;
    settle().await;
    print_board("After both requests", &order.borrow());

    sam_session.set_severity(Severity::High).await?;
    settle().await;
    print_board("After Sam escalates (oldest update wins within a band)", &order.borrow());

    sam_session.deselect_responder().await?;
    settle().await;
    print_board("After Sam withdraws", &order.borrow());

    kim_session.sign_out().await?;
    sam_session.sign_out().await?;
    responder.sign_out().await?;
    store.shutdown().await;
    println!("All sessions signed out.");
    Ok(())
}

/// Let in-flight snapshots land before reading a watch channel
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn print_board(label: &str, entries: &[TriageEntry]) {
    println!("{}:", label);
    if entries.is_empty() {
        println!("  (no open requests)");
    }
    for entry in entries {
        println!(
            "  [{}] {} <{}> {}",
            entry.record.severity, entry.record.requester_name, entry.record.requester_email, entry.record.note
        );
    }
}
