use async_trait::async_trait;
use climate_api_core::path_exists;
use duckdb::{
    arrow::array::{Array, Float64Array, Int64Array, RecordBatch, StringArray},
    params_from_iter, Connection,
};
use regex::Regex;
use scooby::postgres::{select, Aliasable, Parameters, Select};
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};
use utoipa::ToSchema;

/// Calendar-date format used everywhere in the dataset (ISO-8601, no time
/// component). Dates in this format order identically as strings and as
/// calendar dates, so the store may compare them lexicographically.
pub const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Filename of the measurements table inside the data directory
pub const MEASUREMENTS_FILE: &str = "measurements.parquet";
/// Filename of the stations table inside the data directory
pub const STATIONS_FILE: &str = "stations.parquet";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query duckdb: {0}")]
    Query(#[from] duckdb::Error),
    #[error("Failed to format date: {0}")]
    DateFormat(#[from] time::error::Format),
    #[error("Failed to parse date: {0}")]
    DateParse(#[from] time::error::Parse),
    #[error("Dataset file not found: {0}")]
    MissingDataset(String),
}

/// One measurement row's date and precipitation reading. A missing reading
/// stays `None`, it is never coerced to zero.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PrecipitationReading {
    pub date: String,
    pub prcp: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct StationRow {
    pub station_id: String,
    pub name: String,
}

/// One measurement row's date and temperature observation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TemperatureReading {
    pub date: String,
    pub tobs: Option<f64>,
}

/// Summary statistics over the temperature observations of a filtered subset
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, ToSchema)]
pub struct TemperatureStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// Read-only access to the measurement and station tables.
///
/// The dataset is immutable once the service is up, so every operation is a
/// pure read and callers may run them concurrently without coordination.
#[async_trait]
pub trait ClimateData: Send + Sync {
    /// Every measurement's date and precipitation value, one entry per stored
    /// row, in file order (stable across calls)
    async fn all_precipitation(&self) -> Result<Vec<PrecipitationReading>, Error>;
    /// Every station once, ordered by station id
    async fn all_stations(&self) -> Result<Vec<StationRow>, Error>;
    /// The station with the greatest number of measurement rows. Ties resolve
    /// to the lexicographically smallest station id, so the result is a pure
    /// function of the dataset. `None` when the dataset is empty.
    async fn most_active_station(&self) -> Result<Option<String>, Error>;
    /// The maximum measurement date, optionally restricted to one station
    async fn latest_date(&self, station_id: Option<&str>) -> Result<Option<Date>, Error>;
    /// Dates and temperature observations matching the given filters, each
    /// applied only when present: `station_id ==`, `date >= start`,
    /// `date <= end`. Ordered by date.
    async fn measurements_in_range(
        &self,
        station_id: Option<&str>,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<TemperatureReading>, Error>;
    /// Min/avg/max over non-null temperature observations within the date
    /// filters. `None` when no row qualifies; zero rows never produce a
    /// zero-filled result.
    async fn temperature_aggregate(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Option<TemperatureStats>, Error>;
}

pub struct ClimateAccess {
    measurements_path: String,
    stations_path: String,
}

impl ClimateAccess {
    /// Point the store at a data directory holding `measurements.parquet`
    /// and `stations.parquet`. Both files must exist before the first query
    /// is served.
    pub fn new(data_dir: &str) -> Result<Self, Error> {
        let measurements_path = Path::new(data_dir)
            .join(MEASUREMENTS_FILE)
            .to_string_lossy()
            .into_owned();
        let stations_path = Path::new(data_dir)
            .join(STATIONS_FILE)
            .to_string_lossy()
            .into_owned();
        for path in [&measurements_path, &stations_path] {
            if !path_exists(path) {
                return Err(Error::MissingDataset(path.clone()));
            }
        }
        Ok(Self {
            measurements_path,
            stations_path,
        })
    }

    /// Creates a new in-memory connection per query, so every query gets a
    /// fresh slate and the connection is released when it goes out of scope
    fn open_connection(&self) -> Result<Connection, duckdb::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("INSTALL parquet; LOAD parquet;")?;
        Ok(conn)
    }

    async fn query(
        &self,
        select: Select,
        params: Vec<String>,
    ) -> Result<Vec<RecordBatch>, duckdb::Error> {
        let re = Regex::new(r"\$(\d+)").unwrap();
        let binding = select.to_string();
        let fixed_params = re.replace_all(&binding, "?");
        let conn = self.open_connection()?;
        let mut stmt = conn.prepare(&fixed_params)?;
        let sql_params = params_from_iter(params.iter());
        Ok(stmt.query_arrow(sql_params)?.collect())
    }

    fn measurements_source(&self) -> String {
        format!("read_parquet('{}')", self.measurements_path)
    }

    fn stations_source(&self) -> String {
        format!("read_parquet('{}')", self.stations_path)
    }
}

#[async_trait]
impl ClimateData for ClimateAccess {
    async fn all_precipitation(&self) -> Result<Vec<PrecipitationReading>, Error> {
        let query = select(("date", "prcp")).from(self.measurements_source());
        let records = self.query(query, vec![]).await?;

        let readings: PrecipitationReadings = records
            .iter()
            .map(|record| record.into())
            .fold(PrecipitationReadings::new(), |mut acc, batch| {
                acc.merge(batch);
                acc
            });
        Ok(readings.values)
    }

    async fn all_stations(&self) -> Result<Vec<StationRow>, Error> {
        let query = select(("station_id", "name"))
            .from(self.stations_source())
            .order_by("station_id");
        let records = self.query(query, vec![]).await?;

        let stations: StationRows = records
            .iter()
            .map(|record| record.into())
            .fold(StationRows::new(), |mut acc, batch| {
                acc.merge(batch);
                acc
            });
        Ok(stations.values)
    }

    async fn most_active_station(&self) -> Result<Option<String>, Error> {
        let query = select("station_id")
            .from(self.measurements_source())
            .group_by("station_id")
            .order_by(("count(*) DESC", "station_id ASC"))
            .limit(1);
        let records = self.query(query, vec![]).await?;

        for record in &records {
            if record.num_rows() == 0 {
                continue;
            }
            let station_id_arr = record
                .column(0)
                .as_any()
                .downcast_ref::<StringArray>()
                .expect("Expected StringArray in column 0");
            return Ok(Some(station_id_arr.value(0).to_owned()));
        }
        Ok(None)
    }

    async fn latest_date(&self, station_id: Option<&str>) -> Result<Option<Date>, Error> {
        let mut placeholders = Parameters::new();
        let mut values: Vec<String> = vec![];

        let mut query = select("max(date)".as_("latest")).from(self.measurements_source());
        if let Some(station_id) = station_id {
            query = query.where_(format!("station_id = {}", placeholders.next()));
            values.push(station_id.to_owned());
        }
        let records = self.query(query, values).await?;

        for record in &records {
            if record.num_rows() == 0 {
                continue;
            }
            let latest_arr = record
                .column(0)
                .as_any()
                .downcast_ref::<StringArray>()
                .expect("Expected StringArray in column 0");
            // max() over an empty table yields a single NULL row
            if latest_arr.is_null(0) {
                return Ok(None);
            }
            let latest = Date::parse(latest_arr.value(0), ISO_DATE)?;
            return Ok(Some(latest));
        }
        Ok(None)
    }

    async fn measurements_in_range(
        &self,
        station_id: Option<&str>,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<TemperatureReading>, Error> {
        let mut placeholders = Parameters::new();
        let mut values: Vec<String> = vec![];

        let mut query = select(("date", "tobs")).from(self.measurements_source());
        if let Some(station_id) = station_id {
            query = query.where_(format!("station_id = {}", placeholders.next()));
            values.push(station_id.to_owned());
        }
        if let Some(start) = start {
            query = query.where_(format!("date >= {}", placeholders.next()));
            values.push(start.format(ISO_DATE)?);
        }
        if let Some(end) = end {
            query = query.where_(format!("date <= {}", placeholders.next()));
            values.push(end.format(ISO_DATE)?);
        }
        let query = query.order_by("date");
        let records = self.query(query, values).await?;

        let readings: TemperatureReadings = records
            .iter()
            .map(|record| record.into())
            .fold(TemperatureReadings::new(), |mut acc, batch| {
                acc.merge(batch);
                acc
            });
        Ok(readings.values)
    }

    async fn temperature_aggregate(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Option<TemperatureStats>, Error> {
        let mut placeholders = Parameters::new();
        let mut values: Vec<String> = vec![];

        let mut query = select((
            "min(tobs)".as_("temp_min"),
            "avg(tobs)".as_("temp_avg"),
            "max(tobs)".as_("temp_max"),
            "count(tobs)".as_("samples"),
        ))
        .from(self.measurements_source());
        if let Some(start) = start {
            query = query.where_(format!("date >= {}", placeholders.next()));
            values.push(start.format(ISO_DATE)?);
        }
        if let Some(end) = end {
            query = query.where_(format!("date <= {}", placeholders.next()));
            values.push(end.format(ISO_DATE)?);
        }
        let records = self.query(query, values).await?;

        for record in &records {
            if record.num_rows() == 0 {
                continue;
            }
            let samples_arr = record
                .column(3)
                .as_any()
                .downcast_ref::<Int64Array>()
                .expect("Expected Int64Array in column 3");
            // count() ignores NULL observations, so zero means no usable rows
            if samples_arr.value(0) == 0 {
                return Ok(None);
            }
            let min_arr = record
                .column(0)
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("Expected Float64Array in column 0");
            let avg_arr = record
                .column(1)
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("Expected Float64Array in column 1");
            let max_arr = record
                .column(2)
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("Expected Float64Array in column 2");
            return Ok(Some(TemperatureStats {
                min: min_arr.value(0),
                avg: avg_arr.value(0),
                max: max_arr.value(0),
            }));
        }
        Ok(None)
    }
}

struct PrecipitationReadings {
    values: Vec<PrecipitationReading>,
}

impl PrecipitationReadings {
    fn new() -> Self {
        PrecipitationReadings { values: Vec::new() }
    }

    fn merge(&mut self, readings: PrecipitationReadings) -> &PrecipitationReadings {
        self.values.extend(readings.values);
        self
    }
}

impl From<&RecordBatch> for PrecipitationReadings {
    fn from(record_batch: &RecordBatch) -> Self {
        let mut readings = Vec::new();
        let date_arr = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Expected StringArray in column 0");
        let prcp_arr = record_batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .expect("Expected Float64Array in column 1");

        for row_index in 0..record_batch.num_rows() {
            let date = date_arr.value(row_index).to_owned();
            let prcp = if prcp_arr.is_null(row_index) {
                None
            } else {
                Some(prcp_arr.value(row_index))
            };
            readings.push(PrecipitationReading { date, prcp });
        }

        Self { values: readings }
    }
}

struct StationRows {
    values: Vec<StationRow>,
}

impl StationRows {
    fn new() -> Self {
        StationRows { values: Vec::new() }
    }

    fn merge(&mut self, stations: StationRows) -> &StationRows {
        self.values.extend(stations.values);
        self
    }
}

impl From<&RecordBatch> for StationRows {
    fn from(record_batch: &RecordBatch) -> Self {
        let mut stations = Vec::new();
        let station_id_arr = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Expected StringArray in column 0");
        let name_arr = record_batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Expected StringArray in column 1");

        for row_index in 0..record_batch.num_rows() {
            stations.push(StationRow {
                station_id: station_id_arr.value(row_index).to_owned(),
                name: name_arr.value(row_index).to_owned(),
            });
        }

        Self { values: stations }
    }
}

struct TemperatureReadings {
    values: Vec<TemperatureReading>,
}

impl TemperatureReadings {
    fn new() -> Self {
        TemperatureReadings { values: Vec::new() }
    }

    fn merge(&mut self, readings: TemperatureReadings) -> &TemperatureReadings {
        self.values.extend(readings.values);
        self
    }
}

impl From<&RecordBatch> for TemperatureReadings {
    fn from(record_batch: &RecordBatch) -> Self {
        let mut readings = Vec::new();
        let date_arr = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Expected StringArray in column 0");
        let tobs_arr = record_batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .expect("Expected Float64Array in column 1");

        for row_index in 0..record_batch.num_rows() {
            let date = date_arr.value(row_index).to_owned();
            let tobs = if tobs_arr.is_null(row_index) {
                None
            } else {
                Some(tobs_arr.value(row_index))
            };
            readings.push(TemperatureReading { date, tobs });
        }

        Self { values: readings }
    }
}
