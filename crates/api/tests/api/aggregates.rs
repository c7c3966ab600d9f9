use crate::helpers::{spawn_app, MockClimateAccess};
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use climate_api::TemperatureStats;
use hyper::Method;
use serde_json::from_slice;
use std::sync::Arc;
use time::macros::date;
use tower::ServiceExt;

#[tokio::test]
async fn start_only_aggregate_emits_min_avg_max() {
    let mut climate_db = MockClimateAccess::new();
    climate_db
        .expect_temperature_aggregate()
        .withf(|start, end| *start == Some(date!(2017 - 01 - 01)) && end.is_none())
        .times(1)
        .returning(|_, _| {
            Ok(Some(TemperatureStats {
                min: 62.0,
                avg: 74.1,
                max: 87.0,
            }))
        });

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/2017-01-01")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let triple: [f64; 3] = from_slice(&body).unwrap();
    assert_eq!(triple, [62.0, 74.1, 87.0]);
    assert!(triple[0] <= triple[1] && triple[1] <= triple[2]);
}

#[tokio::test]
async fn range_aggregate_applies_end_as_upper_bound() {
    let mut climate_db = MockClimateAccess::new();
    // start == end must cover exactly that single date
    climate_db
        .expect_temperature_aggregate()
        .withf(|start, end| {
            *start == Some(date!(2017 - 01 - 01)) && *end == Some(date!(2017 - 01 - 01))
        })
        .times(1)
        .returning(|_, _| {
            Ok(Some(TemperatureStats {
                min: 66.0,
                avg: 70.0,
                max: 73.0,
            }))
        });

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/2017-01-01/2017-01-01")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let triple: [f64; 3] = from_slice(&body).unwrap();
    assert_eq!(triple, [66.0, 70.0, 73.0]);
}

#[tokio::test]
async fn invalid_start_date_is_a_client_error() {
    let climate_db = MockClimateAccess::new();
    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/23-08-2017")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), 400);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let message = String::from_utf8(body.to_vec()).unwrap();
    assert!(message.contains("invalid date"));
}

#[tokio::test]
async fn empty_range_is_an_explicit_no_data_result() {
    let mut climate_db = MockClimateAccess::new();
    climate_db
        .expect_temperature_aggregate()
        .times(1)
        .returning(|_, _| Ok(None));

    let test_app = spawn_app(Arc::new(climate_db)).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1.0/2030-01-01/2030-12-31")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");
    // Never a zero-filled or null-filled triple
    assert_eq!(response.status(), 404);
}
