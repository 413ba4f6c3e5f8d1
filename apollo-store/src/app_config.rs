use apollo_planner::PlannerSettings;
use apollo_shared::SeatCoord;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub venue: VenueConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Bearer token to start the session with.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_timeout() -> u64 { 10 }

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BookingConfig {
    pub max_seats: usize,
    pub poll_secs: u64,
    pub countdown_secs: u64,
    pub default_ticket_type: String,
    /// Skip the payment provider and accept every checkout.
    pub mock_payments: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_seats: 10,
            poll_secs: 20,
            countdown_secs: 1,
            default_ticket_type: "normalny".to_string(),
            mock_payments: false,
        }
    }
}

/// Seat grid used when the API does not describe the hall.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VenueConfig {
    pub rows: u32,
    pub cols: u32,
    pub unavailable: Vec<SeatCoord>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self { rows: 10, cols: 12, unavailable: Vec::new() }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `APOLLO__API__BASE_URL=http://cinema:8000/api`
            .add_source(config::Environment::with_prefix("APOLLO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
