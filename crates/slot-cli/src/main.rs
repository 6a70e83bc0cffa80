//! `slots` CLI — query reservation availability from a location snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Start times for a party of 2 (snapshot from a file)
//! slots starts -l location.json --date 2026-03-16 --party-size 2
//!
//! # Same, reading the snapshot from stdin and pinning "now"
//! cat location.json | slots starts --date 2026-03-16 --party-size 2 --now 2026-03-16T17:00:00Z
//!
//! # Editing an existing reservation with a one-hour lookback
//! slots starts -l location.json --date 2026-03-16 --party-size 2 --editing r1 --lookback-hours 1
//!
//! # End times for a chosen start
//! slots ends -l location.json --date 2026-03-16 --party-size 2 --start 19:00
//!
//! # Effective schedule for a date
//! slots schedule -l location.json --date 2026-12-25
//!
//! # Validate a snapshot
//! slots validate -l location.json
//! ```
//!
//! Logs go to stderr. Verbosity follows `RUST_LOG`, or `-v` / `-vv`.

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use slot_engine::{AvailabilityRequest, LocationSnapshot, TimeSlot};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Reservation slot availability CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace); ignored when RUST_LOG is set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List start-time options for a date
    Starts {
        #[command(flatten)]
        query: Query,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List end-time options for a chosen start
    Ends {
        #[command(flatten)]
        query: Query,
        /// Chosen start slot (HH:MM)
        #[arg(long)]
        start: TimeSlot,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the schedule in force on a date
    Schedule {
        /// Location snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        location: Option<String>,
        /// Calendar date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Check a snapshot for configuration errors
    Validate {
        /// Location snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        location: Option<String>,
    },
}

#[derive(Args)]
struct Query {
    /// Location snapshot JSON (reads from stdin if omitted)
    #[arg(short, long)]
    location: Option<String>,
    /// Calendar date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,
    /// Number of guests
    #[arg(long, default_value_t = 2)]
    party_size: u32,
    /// Id of a reservation in the snapshot being edited
    #[arg(long)]
    editing: Option<String>,
    /// Current instant (RFC 3339); defaults to the system clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Privileged lookback in hours, honoured only with --editing
    #[arg(long, requires = "editing")]
    lookback_hours: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Starts { query, output } => {
            let snapshot = load_snapshot(query.location.as_deref())?;
            let request = build_request(&snapshot, &query)?;
            let availability =
                slot_engine::compute_start_slots(&snapshot.location, &snapshot.ledger(), &request)
                    .context("Failed to compute start slots")?;
            write_output(output.as_deref(), &serde_json::to_string_pretty(&availability)?)?;
        }
        Commands::Ends {
            query,
            start,
            output,
        } => {
            let snapshot = load_snapshot(query.location.as_deref())?;
            let request = build_request(&snapshot, &query)?;
            let ends = slot_engine::compute_end_slots(
                &snapshot.location,
                &snapshot.ledger(),
                &request,
                start,
            )
            .context("Failed to compute end slots")?;
            write_output(output.as_deref(), &serde_json::to_string_pretty(&ends)?)?;
        }
        Commands::Schedule { location, date } => {
            let snapshot = load_snapshot(location.as_deref())?;
            let schedule = snapshot
                .location
                .day_schedule(date)
                .with_context(|| format!("Failed to resolve schedule for {}", date))?;
            write_output(None, &serde_json::to_string_pretty(&schedule)?)?;
        }
        Commands::Validate { location } => {
            let snapshot = load_snapshot(location.as_deref())?;
            println!(
                "Location {} is valid ({} reservations, timezone {}, {}-minute slots)",
                snapshot.location.id,
                snapshot.reservations.len(),
                snapshot.location.timezone,
                snapshot.location.slot_interval.minutes()
            );
            tracing::debug!(location = %snapshot.location.id, "snapshot validated");
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_request(snapshot: &LocationSnapshot, query: &Query) -> Result<AvailabilityRequest> {
    let now = query.now.unwrap_or_else(Utc::now);
    let mut request = AvailabilityRequest::new(query.date, query.party_size, now);
    request.lookback_hours = query.lookback_hours;

    if let Some(id) = &query.editing {
        let reservation = snapshot
            .find_reservation(id)
            .with_context(|| format!("Reservation '{}' not found in snapshot", id))?;
        request.editing = Some(reservation.clone());
    }

    Ok(request)
}

fn load_snapshot(path: Option<&str>) -> Result<LocationSnapshot> {
    let json = read_input(path)?;
    LocationSnapshot::from_json(&json).context("Failed to load location snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
