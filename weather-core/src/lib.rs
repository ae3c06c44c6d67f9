//! Core library for the weather fulfillment webhook.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The forecast provider abstraction and its OpenWeather client
//! - Date resolution, per-day aggregation and reply composition
//! - [`Fulfillment`], which turns one agent request into one reply
//!
//! It is used by `weather-webhook`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod date_range;
pub mod emoji;
pub mod error;
pub mod fulfillment;
pub mod model;
pub mod payload;
pub mod provider;
pub mod response;

pub use config::Config;
pub use date_range::{RawTimeParameter, ValidationOutcome};
pub use error::{FulfillmentError, ProviderError};
pub use fulfillment::Fulfillment;
pub use model::{
    AttributeFilter, DateInterval, DaySummary, FilterKind, ForecastFeed, ForecastPoint,
    ForecastReport,
};
pub use provider::{ForecastProvider, provider_from_config};
pub use response::{FulfillmentResponse, ResponseComposer, ResponseFormat};
