use async_trait::async_trait;
use chrono_tz::Tz;
use serde_json::Value;

use super::PROVIDER_CURRENCY;
use crate::data_models::{FlightSearchLog, SearchLogRecord, TravelerCounts};
use crate::error::{SearchError, UpstreamStatus, ValidationErrors};
use crate::normalizer::{FlightResult, NormalizeContext, normalize_flight};
use crate::offers::FlightOffer;
use crate::pipeline::SearchDomain;
use crate::provider::{FlightOfferQuery, ProviderGateway};
use crate::validator::{DATE_FORMAT, FlightSearchRequest, validate_flight};

/// Offers requested per flight search.
const MAX_FLIGHT_OFFERS: u32 = 5;
const SERVICE: &str = "flight provider";

pub struct FlightSearch;

#[async_trait]
impl SearchDomain for FlightSearch {
    type Request = FlightSearchRequest;
    type Offer = FlightOffer;
    type Output = FlightResult;

    fn name(&self) -> &'static str {
        "flight"
    }

    fn validate(&self, body: &Value) -> Result<FlightSearchRequest, ValidationErrors> {
        validate_flight(body)
    }

    fn check(&self, request: &FlightSearchRequest) -> Result<(), SearchError> {
        match request.return_date {
            Some(ret) if ret < request.departure_date => Err(SearchError::BadRequest(
                "Return date must be after departure date".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn query(
        &self,
        gateway: &dyn ProviderGateway,
        request: &FlightSearchRequest,
    ) -> Result<Vec<FlightOffer>, SearchError> {
        let query = FlightOfferQuery {
            origin_location_code: request.from_location.clone(),
            destination_location_code: request.to_location.clone(),
            departure_date: request.departure_date.format(DATE_FORMAT).to_string(),
            return_date: request
                .return_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
            adults: request.travelers.adults,
            max: MAX_FLIGHT_OFFERS,
            currency_code: PROVIDER_CURRENCY.to_string(),
        };

        gateway.search_flight_offers(&query).await.map_err(|e| {
            SearchError::upstream(
                e,
                SERVICE,
                "Failed to fetch flight data from the flight provider.",
                UpstreamStatus::BadGateway,
            )
        })
    }

    fn not_found_message(&self) -> &'static str {
        "No flight offers found for the selected route and dates."
    }

    fn unexpected_message(&self) -> &'static str {
        "Unexpected server error while fetching flight details."
    }

    fn timezone(&self, request: &FlightSearchRequest) -> Tz {
        request.user_timezone
    }

    async fn normalize(&self, offer: &FlightOffer, ctx: &NormalizeContext) -> FlightResult {
        normalize_flight(offer, ctx).await
    }

    fn log_record(&self, request: &FlightSearchRequest) -> SearchLogRecord {
        SearchLogRecord::Flight(FlightSearchLog::new(
            request.from_location.clone(),
            request.to_location.clone(),
            request.departure_date.format(DATE_FORMAT).to_string(),
            request
                .return_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
            TravelerCounts {
                adults: request.travelers.adults,
                children: request.travelers.children.clone(),
            },
            request.user.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::RateLookup;
    use crate::domains::testing::StubGateway;
    use crate::pipeline::SearchPipeline;
    use crate::provider::ProviderError;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    struct HalfRate;

    #[async_trait]
    impl RateLookup for HalfRate {
        async fn rate_to_reference(&self, currency: Option<&str>) -> f64 {
            if currency == Some("EUR") { 1.0 } else { 0.5 }
        }
    }

    fn body(return_date: Option<&str>) -> Value {
        let mut body = json!({
            "fromLocation": "JFK",
            "toLocation": "LHR",
            "departureDate": "2025-06-10",
            "userTimezone": "UTC",
            "traverlerDetails": { "adults": 2, "children": [] }
        });
        if let Some(date) = return_date {
            body["returnDate"] = json!(date);
        }
        body
    }

    fn offer() -> FlightOffer {
        serde_json::from_value(json!({
            "id": "1",
            "itineraries": [{
                "duration": "PT7H",
                "segments": [{
                    "departure": { "iataCode": "JFK", "at": "2025-06-10T19:00:00" },
                    "arrival": { "iataCode": "LHR", "at": "2025-06-11T07:00:00" }
                }]
            }],
            "price": { "total": "500.00", "currency": "USD" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_return_before_departure_never_reaches_provider() {
        let gateway = Arc::new(StubGateway {
            flights: Some(Ok(vec![offer()])),
            ..Default::default()
        });
        let pipeline = SearchPipeline::new(gateway.clone(), Arc::new(HalfRate));

        let err = pipeline
            .run(&FlightSearch, &body(Some("2025-06-09")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Return date must be after departure date");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_same_day_return_is_allowed() {
        let gateway = Arc::new(StubGateway {
            flights: Some(Ok(vec![offer()])),
            ..Default::default()
        });
        let pipeline = SearchPipeline::new(gateway.clone(), Arc::new(HalfRate));

        let outcome = pipeline
            .run(&FlightSearch, &body(Some("2025-06-10")))
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].rate_to_eur, 0.5);
        assert_eq!(outcome.results[0].number_of_stops, Some(0));

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains(r#""returnDate":"2025-06-10""#));
        assert!(calls[0].contains(r#""max":5"#));
        assert!(calls[0].contains(r#""currencyCode":"EUR""#));
        assert!(calls[0].contains(r#""adults":2"#));
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream_error() {
        let gateway = Arc::new(StubGateway {
            flights: Some(Err(ProviderError::transport("timed out"))),
            ..Default::default()
        });
        let pipeline = SearchPipeline::new(gateway, Arc::new(HalfRate));

        let err = pipeline.run(&FlightSearch, &body(None)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.to_string(),
            "Failed to fetch flight data from the flight provider."
        );
    }

    #[tokio::test]
    async fn test_provider_client_errors_are_bad_gateway() {
        for (status, message) in [
            (401, "Authentication with flight provider failed. Please contact support."),
            (404, "Failed to fetch flight data from the flight provider."),
        ] {
            let gateway = Arc::new(StubGateway {
                flights: Some(Err(ProviderError::with_status(status, None, "denied"))),
                ..Default::default()
            });
            let pipeline = SearchPipeline::new(gateway, Arc::new(HalfRate));

            let err = pipeline.run(&FlightSearch, &body(None)).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_GATEWAY, "provider {status}");
            assert_eq!(err.to_string(), message);
        }
    }

    struct CountingRates {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl RateLookup for CountingRates {
        async fn rate_to_reference(&self, _currency: Option<&str>) -> f64 {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            0.92
        }
    }

    #[tokio::test]
    async fn test_same_currency_offers_share_one_rate_lookup() {
        let gateway = Arc::new(StubGateway {
            flights: Some(Ok(vec![offer(); 5])),
            ..Default::default()
        });
        let rates = Arc::new(CountingRates {
            calls: Default::default(),
        });
        let pipeline = SearchPipeline::new(gateway, rates.clone());

        let outcome = pipeline.run(&FlightSearch, &body(None)).await.unwrap();
        assert_eq!(outcome.results.len(), 5);
        assert!(outcome.results.iter().all(|r| r.rate_to_eur == 0.92));
        assert_eq!(rates.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_offers_is_not_found() {
        let gateway = Arc::new(StubGateway::default());
        let pipeline = SearchPipeline::new(gateway, Arc::new(HalfRate));

        let err = pipeline.run(&FlightSearch, &body(None)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_log_record_keeps_search_parameters() {
        let request = validate_flight(&body(Some("2025-06-20"))).unwrap();
        match FlightSearch.log_record(&request) {
            SearchLogRecord::Flight(log) => {
                assert_eq!(log.from, "JFK");
                assert_eq!(log.return_date.as_deref(), Some("2025-06-20"));
                assert_eq!(log.traveler_details.adults, 2);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
