//! CLI command definitions and dispatch.

pub mod hold;
pub mod plan;
pub mod price;
pub mod schedule;
pub mod seats;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use apollo_booking::SeatMap;
use apollo_core::{Clock, SessionStore, SystemClock};
use apollo_planner::DraftPlan;
use apollo_shared::SeatCoord;
use apollo_store::{Config, RestClient};
use clap::{Parser, Subcommand};
use serde::Serialize;

/// Cinema box office: seat holds, ticket prices and showtime planning
#[derive(Debug, Parser)]
#[command(name = "apollo", version, about, long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the seat map of a showtime
    Seats(seats::SeatsArgs),
    /// Hold seats, then wait for expiry or check out
    Hold(hold::HoldArgs),
    /// Quote ticket prices for a showtime
    Price(price::PriceArgs),
    /// Plan showtimes for a day
    Plan(plan::PlanArgs),
    /// Change an existing showtime
    Schedule(schedule::ScheduleArgs),
}

impl Cli {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let ctx = Context::new(config, self.json)?;
        match &self.command {
            Commands::Seats(args) => seats::execute(args, &ctx).await,
            Commands::Hold(args) => hold::execute(args, &ctx).await,
            Commands::Price(args) => price::execute(args, &ctx).await,
            Commands::Plan(args) => plan::execute(args, &ctx).await,
            Commands::Schedule(args) => schedule::execute(args, &ctx).await,
        }
    }
}

/// Shared state for one CLI invocation.
pub struct Context {
    pub config: Config,
    pub client: Arc<RestClient>,
    pub clock: Arc<dyn Clock>,
    json: bool,
}

impl Context {
    fn new(config: Config, json: bool) -> anyhow::Result<Self> {
        let session = Arc::new(SessionStore::new());
        if let Some(token) = &config.api.token {
            session.start(token.clone());
        }
        let client = RestClient::new(&config.api, session).context("Failed to build API client")?;

        Ok(Self {
            config,
            client: Arc::new(client),
            clock: Arc::new(SystemClock),
            json,
        })
    }

    /// Print `value` as JSON with `--json`, otherwise the text rendering.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Seat grid of the configured venue, nothing blocked yet.
    pub fn seat_map(&self) -> SeatMap {
        let venue = &self.config.venue;
        SeatMap::with_dimensions(venue.rows, venue.cols, &venue.unavailable)
    }
}

/// `ROW:COL`, zero-based.
pub fn parse_seat(raw: &str) -> Result<SeatCoord, String> {
    let (row, col) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:COL, got '{}'", raw))?;
    let row = row.trim().parse().map_err(|_| format!("bad row in '{}'", raw))?;
    let col = col.trim().parse().map_err(|_| format!("bad column in '{}'", raw))?;
    Ok(SeatCoord::new(row, col))
}

/// Read a draft plan from a JSON file, or start an empty one.
pub fn load_plan(path: Option<&Path>, halls: &[u32]) -> anyhow::Result<DraftPlan> {
    let mut plan = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read plan {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid plan {}", path.display()))?
        }
        None => DraftPlan::default(),
    };
    plan.ensure_halls(halls);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seat() {
        assert_eq!(parse_seat("3:7"), Ok(SeatCoord::new(3, 7)));
        assert_eq!(parse_seat(" 0 : 1 "), Ok(SeatCoord::new(0, 1)));
        assert!(parse_seat("B7").is_err());
        assert!(parse_seat("1:-2").is_err());
    }

    #[test]
    fn test_cli_parses_plan_copy() {
        let cli = Cli::try_parse_from([
            "apollo", "plan", "copy", "2025-03-15", "--halls", "1,2", "--dates", "2025-03-16,2025-03-18",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Plan(_)));
    }
}
