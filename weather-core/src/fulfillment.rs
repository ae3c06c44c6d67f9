//! Entry point for one webhook turn.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::Value;

use crate::{
    aggregate::aggregate,
    date_range::resolve,
    error::{FulfillmentError, ProviderError},
    model::ForecastReport,
    payload::WebhookRequest,
    provider::ForecastProvider,
    response::{FulfillmentResponse, ResponseComposer},
};

/// Drives a request from the raw agent payload to the reply.
#[derive(Debug, Clone)]
pub struct Fulfillment {
    provider: Arc<dyn ForecastProvider>,
    composer: ResponseComposer,
}

impl Fulfillment {
    pub fn new(provider: Arc<dyn ForecastProvider>, composer: ResponseComposer) -> Self {
        Self { provider, composer }
    }

    /// Answer a webhook payload using today's local date.
    pub async fn handle(&self, payload: Value) -> FulfillmentResponse {
        self.handle_on(payload, Local::now().date_naive()).await
    }

    /// Answer a webhook payload as if today were `today`.
    ///
    /// Never fails: every error, including a panic while processing, becomes
    /// one of the canned fallback replies.
    pub async fn handle_on(&self, payload: Value, today: NaiveDate) -> FulfillmentResponse {
        let this = self.clone();
        let task = tokio::spawn(async move { this.fulfill(payload, today).await });

        match task.await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => fallback_for(&err),
            Err(join_err) => {
                tracing::error!(error = %join_err, "fulfillment task aborted");
                fallback_for(&FulfillmentError::UnexpectedFault(join_err.to_string()))
            }
        }
    }

    /// The fallible pipeline behind [`Fulfillment::handle_on`].
    pub async fn fulfill(
        &self,
        payload: Value,
        today: NaiveDate,
    ) -> Result<FulfillmentResponse, FulfillmentError> {
        let query = WebhookRequest::query_result_from(payload)?;
        tracing::info!(
            query_text = query.query_text.as_deref().unwrap_or_default(),
            action = query.action.as_deref().unwrap_or_default(),
            "fulfillment request"
        );

        let city = query.city().ok_or(FulfillmentError::MissingCity)?;
        let interval = resolve(&query.time_parameter(), today).into_interval()?;

        let feed = self.provider.forecast(&city).await?;

        let filter = query.attribute_filter();
        let days = aggregate(&feed.points, interval, filter.as_ref());
        if days.is_empty() {
            return Err(ProviderError::NoCoverage {
                start: interval.start(),
                end: interval.end(),
            }
            .into());
        }

        let report = ForecastReport {
            location: feed.location,
            days,
        };
        tracing::info!(location = %report.location, days = report.days.len(), "forecast composed");

        Ok(self.composer.compose(&report))
    }
}

/// Canned reply for a failed turn.
pub fn fallback_for(err: &FulfillmentError) -> FulfillmentResponse {
    match err {
        FulfillmentError::MissingCity => {
            tracing::info!("no city detected, asking for one");
            ResponseComposer::missing_city()
        }
        FulfillmentError::PastDate => {
            tracing::info!("start date is in the past");
            ResponseComposer::past_date()
        }
        FulfillmentError::FutureTooFar => {
            tracing::info!("end date is beyond the forecast horizon");
            ResponseComposer::future_too_far()
        }
        FulfillmentError::MalformedInput(reason) => {
            tracing::warn!(reason, "malformed request");
            ResponseComposer::generic_error()
        }
        FulfillmentError::Provider(err) => {
            tracing::warn!(error = %err, "forecast unavailable");
            ResponseComposer::generic_error()
        }
        FulfillmentError::UnexpectedFault(reason) => {
            tracing::error!(reason, "unexpected fault");
            ResponseComposer::generic_error()
        }
    }
}
