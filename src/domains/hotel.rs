use async_trait::async_trait;
use serde_json::Value;

use super::PROVIDER_CURRENCY;
use crate::data_models::{HotelSearchLog, SearchLogRecord, TravelerCounts};
use crate::error::{SearchError, UpstreamStatus, ValidationErrors};
use crate::normalizer::{HotelResult, NormalizeContext, normalize_hotel};
use crate::offers::HotelOffer;
use crate::pipeline::SearchDomain;
use crate::provider::{HotelOfferQuery, ProviderGateway};
use crate::validator::{DATE_FORMAT, HotelSearchRequest, validate_hotel};

/// Hotels of the destination that offers are requested for.
const MAX_HOTELS_PER_SEARCH: usize = 25;
const SERVICE: &str = "hotel provider";

pub struct HotelSearch;

#[async_trait]
impl SearchDomain for HotelSearch {
    type Request = HotelSearchRequest;
    type Offer = HotelOffer;
    type Output = HotelResult;

    fn name(&self) -> &'static str {
        "hotel"
    }

    fn validate(&self, body: &Value) -> Result<HotelSearchRequest, ValidationErrors> {
        validate_hotel(body)
    }

    fn check(&self, request: &HotelSearchRequest) -> Result<(), SearchError> {
        if request.check_in >= request.check_out {
            return Err(SearchError::BadRequest(
                "Check-in date must be before check-out date.".to_string(),
            ));
        }
        Ok(())
    }

    /// Two provider calls: hotels in the city, then offers for those hotels.
    async fn query(
        &self,
        gateway: &dyn ProviderGateway,
        request: &HotelSearchRequest,
    ) -> Result<Vec<HotelOffer>, SearchError> {
        let hotels = gateway
            .hotels_by_city(&request.destination)
            .await
            .map_err(|e| {
                SearchError::upstream(
                    e,
                    SERVICE,
                    "Failed to fetch hotel locations from external provider.",
                    UpstreamStatus::BadGateway,
                )
            })?;

        let hotel_ids: Vec<&str> = hotels
            .iter()
            .filter_map(|h| h.hotel_id.as_deref())
            .take(MAX_HOTELS_PER_SEARCH)
            .collect();
        if hotel_ids.is_empty() {
            return Err(SearchError::NotFound(
                "No hotels found for the provided destination.".to_string(),
            ));
        }

        let query = HotelOfferQuery {
            hotel_ids: hotel_ids.join(","),
            check_in_date: request.check_in.format(DATE_FORMAT).to_string(),
            check_out_date: request.check_out.format(DATE_FORMAT).to_string(),
            adults: request.guests.adults,
            children: request.guests.children.len() as u32,
            room_quantity: request.guests.rooms,
            currency: PROVIDER_CURRENCY.to_string(),
        };

        gateway.search_hotel_offers(&query).await.map_err(|e| {
            SearchError::upstream(
                e,
                SERVICE,
                "Failed to fetch hotel offers. Please try again later.",
                UpstreamStatus::BadGateway,
            )
        })
    }

    fn not_found_message(&self) -> &'static str {
        "No hotel offers available for the selected dates."
    }

    fn unexpected_message(&self) -> &'static str {
        "Internal server error while processing hotel details."
    }

    async fn normalize(&self, offer: &HotelOffer, ctx: &NormalizeContext) -> HotelResult {
        normalize_hotel(offer, ctx).await
    }

    fn log_record(&self, request: &HotelSearchRequest) -> SearchLogRecord {
        SearchLogRecord::Hotel(HotelSearchLog::new(
            request.destination.clone(),
            request.check_in.format(DATE_FORMAT).to_string(),
            request.check_out.format(DATE_FORMAT).to_string(),
            TravelerCounts {
                adults: request.guests.adults,
                children: request.guests.children.clone(),
            },
            request.guests.rooms,
            request.room_type.clone(),
            request.user.clone(),
        ))
    }
}
