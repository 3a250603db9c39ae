use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

use super::PROVIDER_CURRENCY;
use crate::data_models::{CarSearchLog, SearchLogRecord};
use crate::error::{SearchError, UpstreamStatus, ValidationErrors};
use crate::normalizer::{CarResult, NormalizeContext, normalize_car};
use crate::offers::TransferOffer;
use crate::pipeline::SearchDomain;
use crate::provider::{ProviderGateway, TransferOfferQuery};
use crate::validator::{CarSearchRequest, validate_car};

pub const MIN_RENTAL_MINUTES: i64 = 60;
pub const MAX_RENTAL_DAYS: i64 = 30;
const SERVICE: &str = "transfer provider";
const TRANSFER_TYPE: &str = "PRIVATE";
const PROVIDER_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct CarSearch;

/// Pick-up and drop-off instants, once both parse and the rental length is
/// within bounds.
pub fn rental_window(
    request: &CarSearchRequest,
) -> Result<(NaiveDateTime, NaiveDateTime), SearchError> {
    let (Some(pick_up), Some(drop_off)) = (request.pick_up_at(), request.drop_off_at()) else {
        return Err(SearchError::BadRequest(
            "Invalid pick-up or drop-off date/time format.".to_string(),
        ));
    };

    if pick_up >= drop_off {
        return Err(SearchError::BadRequest(
            "Pick-up date/time must be earlier than drop-off date/time.".to_string(),
        ));
    }

    let minutes = (drop_off - pick_up).num_minutes();
    if minutes < MIN_RENTAL_MINUTES {
        return Err(SearchError::BadRequest(
            "Minimum rental duration is 1 hour.".to_string(),
        ));
    }
    if minutes > MAX_RENTAL_DAYS * 24 * 60 {
        return Err(SearchError::BadRequest(format!(
            "Maximum rental duration is {MAX_RENTAL_DAYS} days."
        )));
    }

    Ok((pick_up, drop_off))
}

#[async_trait]
impl SearchDomain for CarSearch {
    type Request = CarSearchRequest;
    type Offer = TransferOffer;
    type Output = CarResult;

    fn name(&self) -> &'static str {
        "car"
    }

    fn validate(&self, body: &Value) -> Result<CarSearchRequest, ValidationErrors> {
        validate_car(body)
    }

    fn check(&self, request: &CarSearchRequest) -> Result<(), SearchError> {
        rental_window(request).map(|_| ())
    }

    async fn query(
        &self,
        gateway: &dyn ProviderGateway,
        request: &CarSearchRequest,
    ) -> Result<Vec<TransferOffer>, SearchError> {
        let (pick_up, drop_off) = rental_window(request)?;
        let query = TransferOfferQuery {
            start_location_code: request.pick_up_location.clone(),
            end_location_code: request.drop_off_location.clone(),
            start_date_time: pick_up.format(PROVIDER_DATE_TIME_FORMAT).to_string(),
            end_date_time: drop_off.format(PROVIDER_DATE_TIME_FORMAT).to_string(),
            transfer_type: TRANSFER_TYPE.to_string(),
            currency_code: PROVIDER_CURRENCY.to_string(),
        };

        gateway.search_transfer_offers(&query).await.map_err(|e| {
            SearchError::upstream(
                e,
                SERVICE,
                "Unable to fetch transfer offers. Please try again later.",
                UpstreamStatus::ForwardClientErrors,
            )
        })
    }

    fn not_found_message(&self) -> &'static str {
        "No available cars found for the selected route and time."
    }

    fn unexpected_message(&self) -> &'static str {
        "Something went wrong while processing the car booking request."
    }

    async fn normalize(&self, offer: &TransferOffer, ctx: &NormalizeContext) -> CarResult {
        normalize_car(offer, ctx).await
    }

    fn log_record(&self, request: &CarSearchRequest) -> SearchLogRecord {
        SearchLogRecord::Car(CarSearchLog::new(
            request.pick_up_location.clone(),
            request.pick_up_date.clone(),
            request.pick_up_time.clone(),
            request.drop_off_location.clone(),
            request.drop_off_date.clone(),
            request.drop_off_time.clone(),
            request.user.clone(),
        ))
    }
}
