//! `calendar` CLI — run the calendar engine over JSON from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Expand event definitions in a window (stdin → stdout)
//! calendar expand < events.json
//!
//! # Check a resource for a cell, file to file
//! calendar available -i query.json -o answer.json
//!
//! # Month-row layout with at most 3 bars per cell
//! calendar layout-grid --max-rows 3 -i month.json
//!
//! # Day column layout
//! calendar layout-day -i day.json
//!
//! # Visible time-axis hours
//! calendar visible-hours --start 8 --end 18
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use calendar_engine::layout::grid::GridMetrics;
use calendar_engine::occurrence::parse_timezone;
use calendar_engine::{
    AvailabilityQuery, DayWindow, EventDefinition, GridWindow, Occurrence, Resource, TimeWindow,
    VisibleHours,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "calendar",
    version,
    about = "Occurrence expansion, resource availability and event layout for calendar views"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand event definitions into the occurrences inside a window
    Expand {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check whether a resource can be booked in a cell
    Available {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Bin-pack occurrences into a day or hour grid
    LayoutGrid {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        /// Maximum number of rows per cell
        #[arg(long, default_value_t = 3)]
        max_rows: usize,
    },
    /// Lay out the timed occurrences of one day along its time axis
    LayoutDay {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the hours shown on the time axis
    VisibleHours {
        /// First visible hour (0-24)
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i32>,
        /// End hour, exclusive (0-24)
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i32>,
    },
}

#[derive(Deserialize)]
struct ExpandRequest {
    window: TimeWindow,
    events: Vec<EventDefinition>,
}

#[derive(Deserialize)]
struct AvailabilityRequest {
    resource: Resource,
    date: NaiveDate,
    #[serde(default)]
    hour: Option<u32>,
    #[serde(default)]
    minute: u32,
    /// IANA name; UTC when omitted.
    #[serde(default)]
    timezone: Option<String>,
}

#[derive(Serialize)]
struct AvailabilityAnswer<'a> {
    available: bool,
    blocked: bool,
    time_offs: Vec<&'a calendar_engine::availability::TimeOff>,
}

#[derive(Deserialize)]
struct GridRequest {
    occurrences: Vec<Occurrence>,
    window: GridWindow,
    #[serde(default)]
    metrics: GridMetrics,
}

#[derive(Deserialize)]
struct DayRequest {
    occurrences: Vec<Occurrence>,
    window: DayWindow,
}

#[derive(Serialize)]
struct VisibleHoursAnswer {
    hours: Vec<u32>,
    count: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Expand { input, output } => {
            let request: ExpandRequest = parse_input(input.as_deref())?;
            let expansion = calendar_engine::expand_all(&request.events, &request.window);
            tracing::debug!(
                occurrences = expansion.occurrences.len(),
                diagnostics = expansion.diagnostics.len(),
                "Expanded events"
            );
            write_json(output.as_deref(), &expansion)?;
        }
        Commands::Available { input, output } => {
            let request: AvailabilityRequest = parse_input(input.as_deref())?;
            let mut query = match request.hour {
                Some(hour) => AvailabilityQuery::at(request.date, hour, request.minute),
                None => AvailabilityQuery::day(request.date),
            };
            if let Some(name) = request.timezone.as_deref() {
                let tz = parse_timezone(name).context("Failed to read query timezone")?;
                query = query.in_timezone(tz);
            }
            let answer = AvailabilityAnswer {
                available: calendar_engine::is_available(&request.resource, &query),
                blocked: calendar_engine::is_blocked_slot(&request.resource, &query),
                time_offs: calendar_engine::time_offs_for_slot(&request.resource, &query),
            };
            write_json(output.as_deref(), &answer)?;
        }
        Commands::LayoutGrid {
            input,
            output,
            max_rows,
        } => {
            let request: GridRequest = parse_input(input.as_deref())?;
            let layout = calendar_engine::layout_grid_with(
                &request.occurrences,
                &request.window,
                max_rows,
                &request.metrics,
            );
            if !layout.dropped.is_empty() {
                tracing::info!(
                    dropped = layout.dropped.len(),
                    "Some occurrences did not fit the grid"
                );
            }
            write_json(output.as_deref(), &layout)?;
        }
        Commands::LayoutDay { input, output } => {
            let request: DayRequest = parse_input(input.as_deref())?;
            let positioned = calendar_engine::layout_day(&request.occurrences, &request.window);
            write_json(output.as_deref(), &positioned)?;
        }
        Commands::VisibleHours { start, end } => {
            let visible = VisibleHours {
                start_time: start,
                end_time: end,
            };
            let answer = VisibleHoursAnswer {
                hours: visible.hours(),
                count: visible.count(),
            };
            write_json(None, &answer)?;
        }
    }

    Ok(())
}

fn parse_input<T: DeserializeOwned>(path: Option<&str>) -> Result<T> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("Failed to parse input JSON")
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

fn write_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    content.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
