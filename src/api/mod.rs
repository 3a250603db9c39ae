use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::pipeline::SearchPipeline;
use crate::search_log::SearchLogWriter;

pub mod handlers;
pub mod models;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SearchPipeline>,
    pub search_logs: SearchLogWriter,
}

pub fn create_router(state: AppState, front_end_origin: Option<&str>) -> Router {
    // CORS configuration
    let origin = match front_end_origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::from(Any),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root_handler))
        .route(
            "/api/booking/flight/unified-details",
            post(handlers::flight_details_handler),
        )
        .route(
            "/api/booking/hotel/unified-details",
            post(handlers::hotel_details_handler),
        )
        .route(
            "/api/booking/car/unified-details",
            post(handlers::car_details_handler),
        )
        .fallback(handlers::not_found_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
