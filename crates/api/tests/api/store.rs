//! Store tests over real DuckDB: the dataset is written out as the two
//! Parquet files the service reads at runtime, then every store operation is
//! exercised against it.

use climate_api::{ClimateAccess, ClimateData};
use duckdb::Connection;
use std::path::Path;
use tempfile::TempDir;
use time::macros::date;

fn seed_dataset(dir: &Path) {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE measurements (station_id VARCHAR, date VARCHAR, prcp DOUBLE, tobs DOUBLE);
        INSERT INTO measurements VALUES
            ('USC00519281', '2016-08-20', 0.05, 79.0),
            ('USC00519281', '2016-08-23', 0.00, 76.0),
            ('USC00519281', '2016-12-01', NULL, 73.0),
            ('USC00519281', '2017-01-01', 0.00, 72.0),
            ('USC00519281', '2017-01-01', 0.03, 70.0),
            ('USC00519281', '2017-03-15', 0.10, NULL),
            ('USC00519281', '2017-05-10', 0.02, 75.0),
            ('USC00519281', '2017-07-04', NULL, 80.0),
            ('USC00519281', '2017-08-22', 0.00, 82.0),
            ('USC00519281', '2017-08-23', 0.45, 81.0),
            ('USC00516128', '2016-01-01', 0.60, 65.0),
            ('USC00516128', '2017-08-24', 1.20, 74.0),
            ('USC00516128', '2017-08-25', NULL, NULL);
        COPY measurements TO '{dir}/measurements.parquet' (FORMAT PARQUET);

        CREATE TABLE stations (station_id VARCHAR, name VARCHAR, latitude DOUBLE, longitude DOUBLE, elevation DOUBLE);
        INSERT INTO stations VALUES
            ('USC00519281', 'WAIHEE 837.5, HI US', 21.45167, -157.84889, 32.9),
            ('USC00516128', 'MANOA LYON ARBO 785.2, HI US', 21.3331, -157.8025, 152.4);
        COPY stations TO '{dir}/stations.parquet' (FORMAT PARQUET);
        "#,
        dir = dir.display()
    ))
    .unwrap();
}

fn open_store(dir: &TempDir) -> ClimateAccess {
    ClimateAccess::new(dir.path().to_str().unwrap()).unwrap()
}

#[test]
fn missing_dataset_files_are_rejected_at_startup() {
    let dir = TempDir::new().unwrap();
    assert!(ClimateAccess::new(dir.path().to_str().unwrap()).is_err());
}

#[tokio::test]
async fn all_precipitation_keeps_every_row_and_nulls() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    let readings = store.all_precipitation().await.unwrap();
    assert_eq!(readings.len(), 13);
    assert_eq!(readings.iter().filter(|r| r.prcp.is_none()).count(), 3);
    // Zero readings stay distinct from missing ones
    assert!(readings.iter().any(|r| r.prcp == Some(0.0)));
}

#[tokio::test]
async fn all_stations_is_ordered_by_station_id() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    let stations = store.all_stations().await.unwrap();
    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].station_id, "USC00516128");
    assert_eq!(stations[1].station_id, "USC00519281");
    assert_eq!(stations[1].name, "WAIHEE 837.5, HI US");
}

#[tokio::test]
async fn most_active_station_picks_the_busiest_and_is_deterministic() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    // 10 rows vs 3 rows
    let first = store.most_active_station().await.unwrap();
    let second = store.most_active_station().await.unwrap();
    assert_eq!(first.as_deref(), Some("USC00519281"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn most_active_station_ties_resolve_to_smallest_id() {
    let dir = TempDir::new().unwrap();
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE measurements (station_id VARCHAR, date VARCHAR, prcp DOUBLE, tobs DOUBLE);
        INSERT INTO measurements VALUES
            ('S0002', '2017-01-01', 0.1, 70.0),
            ('S0002', '2017-01-02', 0.2, 71.0),
            ('S0001', '2017-01-01', 0.3, 72.0),
            ('S0001', '2017-01-02', 0.4, 73.0);
        COPY measurements TO '{dir}/measurements.parquet' (FORMAT PARQUET);

        CREATE TABLE stations (station_id VARCHAR, name VARCHAR, latitude DOUBLE, longitude DOUBLE, elevation DOUBLE);
        INSERT INTO stations VALUES
            ('S0001', 'First', 0.0, 0.0, 0.0),
            ('S0002', 'Second', 0.0, 0.0, 0.0);
        COPY stations TO '{dir}/stations.parquet' (FORMAT PARQUET);
        "#,
        dir = dir.path().display()
    ))
    .unwrap();
    let store = open_store(&dir);

    let resolved = store.most_active_station().await.unwrap();
    assert_eq!(resolved.as_deref(), Some("S0001"));
}

#[tokio::test]
async fn latest_date_can_be_restricted_to_one_station() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    let global = store.latest_date(None).await.unwrap();
    assert_eq!(global, Some(date!(2017 - 08 - 25)));

    let restricted = store.latest_date(Some("USC00519281")).await.unwrap();
    assert_eq!(restricted, Some(date!(2017 - 08 - 23)));
}

#[tokio::test]
async fn measurements_in_range_applies_all_filters() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    // Station + lower bound only: 2016-08-20 falls out, everything later stays
    let windowed = store
        .measurements_in_range(Some("USC00519281"), Some(date!(2016 - 08 - 23)), None)
        .await
        .unwrap();
    assert_eq!(windowed.len(), 9);
    assert_eq!(windowed.first().unwrap().date, "2016-08-23");
    assert_eq!(windowed.last().unwrap().date, "2017-08-23");

    // start == end covers exactly that single date's rows
    let single_day = store
        .measurements_in_range(None, Some(date!(2017 - 01 - 01)), Some(date!(2017 - 01 - 01)))
        .await
        .unwrap();
    assert_eq!(single_day.len(), 2);
    assert!(single_day.iter().all(|r| r.date == "2017-01-01"));
}

#[tokio::test]
async fn temperature_aggregate_orders_min_avg_max() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    let stats = store
        .temperature_aggregate(Some(date!(2017 - 08 - 22)), Some(date!(2017 - 08 - 23)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.min, 81.0);
    assert_eq!(stats.max, 82.0);
    assert!((stats.avg - 81.5).abs() < f64::EPSILON);
    assert!(stats.min <= stats.avg && stats.avg <= stats.max);
}

#[tokio::test]
async fn aggregate_over_null_only_rows_is_no_data() {
    let dir = TempDir::new().unwrap();
    seed_dataset(dir.path());
    let store = open_store(&dir);

    // The only row on this date has a NULL observation
    let stats = store
        .temperature_aggregate(Some(date!(2017 - 08 - 25)), Some(date!(2017 - 08 - 25)))
        .await
        .unwrap();
    assert!(stats.is_none());

    let empty = store
        .temperature_aggregate(Some(date!(2030 - 01 - 01)), None)
        .await
        .unwrap();
    assert!(empty.is_none());
}
