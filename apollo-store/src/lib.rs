pub mod app_config;
pub mod rest;

pub use app_config::{ApiConfig, BookingConfig, Config, VenueConfig};
pub use rest::RestClient;
