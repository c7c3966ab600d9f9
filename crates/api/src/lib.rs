//! Read-only REST API over a historical weather dataset.
//!
//! The interesting part lives in [`db`] (the time-series store) and
//! [`queries`] (the four analytical operations); everything else is routing
//! and startup plumbing.

pub mod db;
pub mod queries;
pub mod routes;
mod startup;
mod utils;

pub use db::{
    ClimateAccess, ClimateData, PrecipitationReading, StationRow, TemperatureReading,
    TemperatureStats, ISO_DATE, MEASUREMENTS_FILE, STATIONS_FILE,
};
pub use queries::{QueryError, TemperatureSummary, WindowField};
pub use routes::*;
pub use startup::{app, build_app_state, AppState};
pub use utils::{get_config_info, get_log_level, setup_logger, Cli};
