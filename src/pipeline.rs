use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::currency::{RateLookup, RateMemo};
use crate::data_models::SearchLogRecord;
use crate::error::{SearchError, ValidationErrors};
use crate::normalizer::NormalizeContext;
use crate::provider::ProviderGateway;

/// Domain-specific steps of a search: validate, query, normalize, log.
///
/// [`SearchPipeline::run`] drives these in order and owns the shared rules:
/// an empty provider answer is a not-found outcome and offers keep the order
/// the provider returned them in.
#[async_trait]
pub trait SearchDomain: Send + Sync {
    type Request: Send + Sync;
    type Offer: Send + Sync;
    type Output: Serialize + Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn validate(&self, body: &Value) -> Result<Self::Request, ValidationErrors>;

    /// Cross-field rules checked before the provider is called.
    fn check(&self, _request: &Self::Request) -> Result<(), SearchError> {
        Ok(())
    }

    async fn query(
        &self,
        gateway: &dyn ProviderGateway,
        request: &Self::Request,
    ) -> Result<Vec<Self::Offer>, SearchError>;

    fn not_found_message(&self) -> &'static str;

    /// Message sent to the client for failures nothing else accounted for.
    fn unexpected_message(&self) -> &'static str;

    fn timezone(&self, _request: &Self::Request) -> Tz {
        Tz::UTC
    }

    async fn normalize(&self, offer: &Self::Offer, ctx: &NormalizeContext) -> Self::Output;

    fn log_record(&self, request: &Self::Request) -> SearchLogRecord;
}

/// Successful search: results for the client plus the audit record to be
/// written once the response is out.
#[derive(Debug)]
pub struct SearchOutcome<T> {
    pub results: Vec<T>,
    pub log: SearchLogRecord,
}

pub struct SearchPipeline {
    gateway: Arc<dyn ProviderGateway>,
    rates: Arc<dyn RateLookup>,
}

impl SearchPipeline {
    pub fn new(gateway: Arc<dyn ProviderGateway>, rates: Arc<dyn RateLookup>) -> Self {
        Self { gateway, rates }
    }

    pub async fn run<D: SearchDomain>(
        &self,
        domain: &D,
        body: &Value,
    ) -> Result<SearchOutcome<D::Output>, SearchError> {
        let start = Instant::now();

        let request = domain.validate(body)?;
        domain.check(&request)?;

        let offers = domain.query(self.gateway.as_ref(), &request).await?;
        if offers.is_empty() {
            tracing::info!("{} search returned no offers", domain.name());
            return Err(SearchError::NotFound(domain.not_found_message().to_string()));
        }

        let ctx = NormalizeContext::new(
            RateMemo::new(self.rates.clone()),
            domain.timezone(&request),
        );
        let results = futures::future::join_all(
            offers.iter().map(|offer| domain.normalize(offer, &ctx)),
        )
        .await;

        tracing::info!(
            "{} search normalized {} offers in {}ms",
            domain.name(),
            results.len(),
            start.elapsed().as_millis()
        );

        Ok(SearchOutcome {
            results,
            log: domain.log_record(&request),
        })
    }
}
