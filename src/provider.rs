use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::offers::{FlightOffer, HotelLocation, HotelOffer, TransferOffer, null_as_empty};

/// Failure of a call to the inventory provider.
///
/// Only `code` and `detail` are safe to show to clients; `status` drives the
/// HTTP status and message picked for the response.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("provider error (status {status:?}, code {code:?}): {detail}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub detail: String,
}

impl ProviderError {
    /// Network failure, timeout, or anything else without an HTTP status.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            detail: detail.into(),
        }
    }

    pub fn with_status(status: u16, code: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code,
            detail: detail.into(),
        }
    }

    /// Builds the error from a non-2xx provider response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            errors: Vec<ErrorEntry>,
        }

        #[derive(Deserialize)]
        struct ErrorEntry {
            code: Option<serde_json::Value>,
            title: Option<String>,
            detail: Option<String>,
        }

        let first = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.errors.into_iter().next());

        match first {
            Some(entry) => {
                let code = entry.code.map(|c| match c {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                });
                let detail = entry
                    .detail
                    .or(entry.title)
                    .unwrap_or_else(|| "Unknown error occurred".to_string());
                Self::with_status(status, code, detail)
            }
            None => Self::with_status(status, None, "Unknown error occurred"),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // the url carries query parameters that must not reach clients
        let err = err.without_url();
        match err.status() {
            Some(status) => Self::with_status(status.as_u16(), None, err.to_string()),
            None => Self::transport(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOfferQuery {
    pub origin_location_code: String,
    pub destination_location_code: String,
    pub departure_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    pub adults: u32,
    pub max: u32,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelOfferQuery {
    /// Comma-separated provider hotel ids.
    pub hotel_ids: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub adults: u32,
    pub children: u32,
    pub room_quantity: u32,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOfferQuery {
    pub start_location_code: String,
    pub end_location_code: String,
    pub start_date_time: String,
    pub end_date_time: String,
    pub transfer_type: String,
    pub currency_code: String,
}

/// The third-party inventory search API.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn search_flight_offers(
        &self,
        query: &FlightOfferQuery,
    ) -> Result<Vec<FlightOffer>, ProviderError>;

    async fn hotels_by_city(&self, city_code: &str) -> Result<Vec<HotelLocation>, ProviderError>;

    async fn search_hotel_offers(
        &self,
        query: &HotelOfferQuery,
    ) -> Result<Vec<HotelOffer>, ProviderError>;

    async fn search_transfer_offers(
        &self,
        query: &TransferOfferQuery,
    ) -> Result<Vec<TransferOffer>, ProviderError>;
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct DataEnvelope<T> {
    #[serde(default, deserialize_with = "null_as_empty")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Tokens are refreshed this long before the provider says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// REST client for the Amadeus self-service APIs.
pub struct AmadeusGateway {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusGateway {
    pub fn new(
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(self.url("/v1/security/oauth2/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_response(status.as_u16(), &body));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        tracing::debug!("refreshed provider access token");
        Ok(token.access_token)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<T>, ProviderError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_response(status.as_u16(), &body));
        }

        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ProviderGateway for AmadeusGateway {
    async fn search_flight_offers(
        &self,
        query: &FlightOfferQuery,
    ) -> Result<Vec<FlightOffer>, ProviderError> {
        let request = self
            .client
            .get(self.url("/v2/shopping/flight-offers"))
            .query(query);
        self.fetch(request).await
    }

    async fn hotels_by_city(&self, city_code: &str) -> Result<Vec<HotelLocation>, ProviderError> {
        let request = self
            .client
            .get(self.url("/v1/reference-data/locations/hotels/by-city"))
            .query(&[("cityCode", city_code)]);
        self.fetch(request).await
    }

    async fn search_hotel_offers(
        &self,
        query: &HotelOfferQuery,
    ) -> Result<Vec<HotelOffer>, ProviderError> {
        let request = self
            .client
            .get(self.url("/v3/shopping/hotel-offers"))
            .query(query);
        self.fetch(request).await
    }

    async fn search_transfer_offers(
        &self,
        query: &TransferOfferQuery,
    ) -> Result<Vec<TransferOffer>, ProviderError> {
        let request = self
            .client
            .post(self.url("/v1/shopping/transfer-offers"))
            .json(query);
        self.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_provider_body() {
        let body = r#"{"errors":[{"status":400,"code":477,"title":"INVALID FORMAT","detail":"invalid date"}]}"#;
        let err = ProviderError::from_response(400, body);
        assert_eq!(err.status, Some(400));
        assert_eq!(err.code.as_deref(), Some("477"));
        assert_eq!(err.detail, "invalid date");
    }

    #[test]
    fn test_error_from_unparseable_body() {
        let err = ProviderError::from_response(503, "<html>gateway</html>");
        assert_eq!(err.status, Some(503));
        assert_eq!(err.code, None);
        assert_eq!(err.detail, "Unknown error occurred");
    }

    #[test]
    fn test_flight_query_params() {
        let query = FlightOfferQuery {
            origin_location_code: "JFK".into(),
            destination_location_code: "LHR".into(),
            departure_date: "2025-06-01".into(),
            return_date: None,
            adults: 1,
            max: 5,
            currency_code: "EUR".into(),
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["originLocationCode"], "JFK");
        assert!(value.get("returnDate").is_none());
    }

    #[tokio::test]
    async fn test_transport_error_hides_request_url() {
        // nothing listens on port 1
        let err = Client::new()
            .get("http://127.0.0.1:1/v2/shopping/flight-offers?originLocationCode=JFK")
            .send()
            .await
            .unwrap_err();

        let err = ProviderError::from(err);
        assert_eq!(err.status, None);
        assert!(!err.detail.contains("127.0.0.1"), "{}", err.detail);
        assert!(!err.detail.contains("originLocationCode"), "{}", err.detail);
    }
}
