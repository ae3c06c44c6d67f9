use chrono::NaiveDate;
use thiserror::Error;

/// Failures talking to the forecast provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider response contained no forecast data")]
    Empty,

    #[error("forecast has no data between {start} and {end}")]
    NoCoverage { start: NaiveDate, end: NaiveDate },
}

/// Every way a fulfillment turn can end without a forecast.
///
/// The first four are normal conversational states. `Provider` and
/// `UnexpectedFault` are real faults and are answered with the generic error
/// message.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("no city in request")]
    MissingCity,

    #[error("requested start date is in the past")]
    PastDate,

    #[error("requested end date is beyond the forecast horizon")]
    FutureTooFar,

    #[error("malformed request: {0}")]
    MalformedInput(String),

    #[error("forecast provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("unexpected fault: {0}")]
    UnexpectedFault(String),
}
