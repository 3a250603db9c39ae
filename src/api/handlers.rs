use axum::{
    Json,
    extract::{OriginalUri, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;

use crate::domains::{CarSearch, FlightSearch, HotelSearch};
use crate::error::SearchError;
use crate::pipeline::{SearchDomain, SearchOutcome};

use super::AppState;
use super::models::{ErrorResponse, MessageResponse, SearchResponse};

pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to sky scanner backend".to_string(),
    })
}

pub async fn not_found_handler(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            message: format!("Not Found - {}", uri.path()),
        }),
    )
}

pub async fn flight_details_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    search(&state, &FlightSearch, body).await
}

pub async fn hotel_details_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    search(&state, &HotelSearch, body).await
}

pub async fn car_details_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    search(&state, &CarSearch, body).await
}

/// Runs one search and builds the response. The search log is queued only
/// after the response exists and its outcome never changes it.
async fn search<D: SearchDomain>(
    state: &AppState,
    domain: &D,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return SearchError::BadRequest(rejection.body_text()).into_response();
        }
    };

    let outcome = AssertUnwindSafe(state.pipeline.run(domain, &body))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(SearchOutcome { results, log })) => {
            let response = Json(SearchResponse::ok(results)).into_response();
            state.search_logs.enqueue(log);
            response
        }
        Ok(Err(err)) => err.into_response(),
        Err(_) => SearchError::Unexpected {
            message: domain.unexpected_message().to_string(),
            source: anyhow::anyhow!("{} search panicked", domain.name()),
        }
        .into_response(),
    }
}
