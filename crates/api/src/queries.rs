//! The four analytical operations exposed by the service.
//!
//! Every function here is a pure, stateless read over an immutable store:
//! it takes parsed inputs (date parsing is the only string handling done
//! here), orchestrates the store, and returns either a structured result or
//! a distinguishable error. Missing data is never reported as zeros.

use serde::Serialize;
use time::{Date, Duration};

use crate::db::{self, ClimateData, PrecipitationReading, ISO_DATE};

/// Length of the date-relative window: exactly 365 calendar days back from
/// the station's most recent recorded date (an interval subtraction, so leap
/// days are not skipped over)
const WINDOW_DAYS: i64 = 365;

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("invalid date, expected an ISO-8601 calendar date: {0}")]
    InvalidDate(String),
    #[error("no stations recorded in the dataset")]
    NoMatchingStation,
    #[error("no data in the requested range")]
    NoDataInRange,
    #[error(transparent)]
    Store(#[from] db::Error),
}

/// One cell of the flattened year-window output: the flat sequence alternates
/// date strings and temperature observations, preserving pairwise order
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum WindowField {
    Date(String),
    Temperature(Option<f64>),
}

/// Min/avg/max temperature summary, emitted in that order
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl TemperatureSummary {
    /// The wire shape: a 3-element sequence ordered min, avg, max
    pub fn as_triple(&self) -> [f64; 3] {
        [self.min, self.avg, self.max]
    }
}

/// Every stored precipitation row, unmodified. Rows sharing a date across
/// stations each keep their own entry, nothing is merged.
pub async fn precipitation_dump(
    store: &dyn ClimateData,
) -> Result<Vec<PrecipitationReading>, QueryError> {
    Ok(store.all_precipitation().await?)
}

/// All stations flattened into `[id_1, name_1, id_2, name_2, ...]`
pub async fn station_listing(store: &dyn ClimateData) -> Result<Vec<String>, QueryError> {
    let stations = store.all_stations().await?;
    let mut flat = Vec::with_capacity(stations.len() * 2);
    for station in stations {
        flat.push(station.station_id);
        flat.push(station.name);
    }
    Ok(flat)
}

/// The last 365 days of temperature observations for the most-active station,
/// flattened into `[date_1, tobs_1, date_2, tobs_2, ...]`.
///
/// The window is anchored on that station's own latest date, not the global
/// maximum across all stations.
pub async fn active_station_window(
    store: &dyn ClimateData,
) -> Result<Vec<WindowField>, QueryError> {
    let station_id = store
        .most_active_station()
        .await?
        .ok_or(QueryError::NoMatchingStation)?;
    let latest = store
        .latest_date(Some(&station_id))
        .await?
        .ok_or(QueryError::NoDataInRange)?;
    let window_start = latest - Duration::days(WINDOW_DAYS);

    let readings = store
        .measurements_in_range(Some(&station_id), Some(window_start), None)
        .await?;

    let mut flat = Vec::with_capacity(readings.len() * 2);
    for reading in readings {
        flat.push(WindowField::Date(reading.date));
        flat.push(WindowField::Temperature(reading.tobs));
    }
    Ok(flat)
}

/// Temperature summary over `date >= start`, and `date <= end` when an end
/// bound is given. An unparseable date is a caller error, never a silent
/// empty range; a range matching zero rows is an explicit no-data result.
pub async fn temperature_summary(
    store: &dyn ClimateData,
    start: &str,
    end: Option<&str>,
) -> Result<TemperatureSummary, QueryError> {
    let start = parse_date(start)?;
    let end = end.map(parse_date).transpose()?;

    let stats = store
        .temperature_aggregate(Some(start), end)
        .await?
        .ok_or(QueryError::NoDataInRange)?;
    Ok(TemperatureSummary {
        min: stats.min,
        avg: stats.avg,
        max: stats.max,
    })
}

fn parse_date(raw: &str) -> Result<Date, QueryError> {
    Date::parse(raw, ISO_DATE).map_err(|_| QueryError::InvalidDate(raw.to_owned()))
}
