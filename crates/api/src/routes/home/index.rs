use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::AppState;

/// Welcome page listing the available API routes
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let base = &state.remote_url;
    Html(format!(
        "Available Routes<br/>\
         {base}/api/v1.0/precipitation<br/>\
         {base}/api/v1.0/stations<br/>\
         {base}/api/v1.0/tobs<br/>\
         {base}/api/v1.0/{{start}}<br/>\
         {base}/api/v1.0/{{start}}/{{end}}"
    ))
}
