//! Rendering forecast reports and canned replies into Dialogflow fulfillment
//! responses.

use std::fmt;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::model::{DaySummary, ForecastReport};

/// Value a field may carry when the provider had nothing to say.
pub const UNKNOWN: &str = "Unknown";

const RICH_CONTENT_TITLE: &str = "Weather Forecast";
const PLATFORM_UNSPECIFIED: &str = "PLATFORM_UNSPECIFIED";

pub const MISSING_CITY_REPLIES: &[&str] = &[
    "Which city do you want the weather for? 🌍",
    "Tell me a city, and I'll fetch the forecast! ☀️🌧",
    "Where should I check the weather for? 🏙️",
    "Which location are you curious about? 🌎",
    "Enter a city name, and I'll do the rest! ⛅",
    "Where are we checking the weather today? 📍",
    "Tell me your city, and I'll bring the latest forecast! 🌦",
    "Which city's weather would you like to see? 🌤️",
    "Just type a city, and I'll get the forecast! 🌍",
    "Drop a city name, and I'll fetch the forecast! 🌦",
    "Type a location, and I'll show you the weather! 📍",
    "Give me a city, and I'll handle the rest! 🌎",
    "Share a city name, and I'll pull up the weather! 🌤",
    "Let me know a city, and I'll check the forecast! 🌧",
];

pub const PAST_DATE_REPLIES: &[&str] = &[
    "I'm sorry, I can't provide weather data for the past.",
    "I can only give forecasts for today and the next 5 days. ☀️🌧️",
    "I can only provide weather data for today and up to 5 days ahead. ⏳",
    "I only have forecasts for today and the next 5 days. Ask away! 😊",
    "Need a forecast? I cover today and the next 5 days! 🌍",
];

pub const FUTURE_TOO_FAR_REPLIES: &[&str] = &[
    "I'm sorry, but I can only provide weather forecasts for the next 5 days. Let me know if you'd like a forecast within that range!",
    "Unfortunately, I can't predict the weather beyond 5 days. However, I can give you an accurate forecast for the next 5 days if you'd like!",
    "I can only provide forecasts for up to 5 days ahead. If you need weather details within that timeframe, just let me know!",
    "I'm sorry, but my forecast limit is 5 days ahead. Would you like the weather for any day within that range?",
];

pub const GENERIC_ERROR_REPLIES: &[&str] = &[
    "I'm sorry, I couldn't fetch the weather. Can you please try again?",
    "Oops! Something went wrong while fetching the weather. Let's try again.",
    "I'm having trouble fetching the weather. Can you please try again?",
    "I can't seem to get the weather right now. Let's try again.",
    "There was an error while fetching the weather. Can you try again?",
    "I'm sorry, I couldn't get the weather. Let's try again.",
    "There was a problem while fetching the weather. Can you try again?",
];

/// Shape of the rendered forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Flat text in `fulfillmentText` / `displayText`.
    #[default]
    Text,
    /// Dialogflow Messenger rich content card.
    Rich,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Text => "text",
            ResponseFormat::Rich => "rich",
        }
    }

    pub const fn all() -> &'static [ResponseFormat] {
        &[ResponseFormat::Text, ResponseFormat::Rich]
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ResponseFormat {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(ResponseFormat::Text),
            "rich" => Ok(ResponseFormat::Rich),
            _ => Err(anyhow::anyhow!(
                "Unknown response format '{value}'. Supported formats: text, rich."
            )),
        }
    }
}

/// Body returned to the agent for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FulfillmentResponse {
    Rich {
        #[serde(rename = "fulfillmentText")]
        fulfillment_text: String,
        #[serde(rename = "fulfillmentMessages")]
        fulfillment_messages: Vec<FulfillmentMessage>,
    },
    Text {
        #[serde(rename = "fulfillmentText")]
        fulfillment_text: String,
        #[serde(rename = "displayText")]
        display_text: String,
    },
}

impl FulfillmentResponse {
    pub fn text(message: impl Into<String>) -> Self {
        let message = message.into();
        FulfillmentResponse::Text {
            fulfillment_text: message.clone(),
            display_text: message,
        }
    }

    /// The plain text every channel can show.
    pub fn fulfillment_text(&self) -> &str {
        match self {
            FulfillmentResponse::Rich { fulfillment_text, .. }
            | FulfillmentResponse::Text { fulfillment_text, .. } => fulfillment_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentMessage {
    pub platform: String,
    pub payload: RichPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichPayload {
    #[serde(rename = "richContent")]
    pub rich_content: Vec<Vec<RichContentItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub text: Vec<String>,
}

/// Renders reports and fallback replies in the configured format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseComposer {
    format: ResponseFormat,
}

impl ResponseComposer {
    pub fn new(format: ResponseFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    pub fn compose(&self, report: &ForecastReport) -> FulfillmentResponse {
        let header = format!("📍 {}", report.location);
        let blocks: Vec<String> = report.days.iter().map(render_day).collect();

        let text = std::iter::once(header.as_str())
            .chain(blocks.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n\n");

        match self.format {
            ResponseFormat::Text => FulfillmentResponse::text(text),
            ResponseFormat::Rich => {
                let lines = std::iter::once(header).chain(blocks).collect();
                FulfillmentResponse::Rich {
                    fulfillment_text: text,
                    fulfillment_messages: vec![FulfillmentMessage {
                        platform: PLATFORM_UNSPECIFIED.to_string(),
                        payload: RichPayload {
                            rich_content: vec![vec![RichContentItem {
                                kind: "description".to_string(),
                                title: RICH_CONTENT_TITLE.to_string(),
                                text: lines,
                            }]],
                        },
                    }],
                }
            }
        }
    }

    pub fn missing_city() -> FulfillmentResponse {
        FulfillmentResponse::text(pick(MISSING_CITY_REPLIES))
    }

    pub fn past_date() -> FulfillmentResponse {
        FulfillmentResponse::text(pick(PAST_DATE_REPLIES))
    }

    pub fn future_too_far() -> FulfillmentResponse {
        FulfillmentResponse::text(pick(FUTURE_TOO_FAR_REPLIES))
    }

    pub fn generic_error() -> FulfillmentResponse {
        FulfillmentResponse::text(pick(GENERIC_ERROR_REPLIES))
    }
}

fn pick(pool: &'static [&'static str]) -> &'static str {
    pool.choose(&mut rand::rng()).copied().unwrap_or(pool[0])
}

fn render_day(day: &DaySummary) -> String {
    let date = day.date.format("%A, %b %d, %Y").to_string();
    let fields = [
        ("📅", None, Some(date.as_str())),
        ("⛅", Some("Weather"), day.weather.as_deref()),
        ("🌡️", Some("Temperature"), day.temperature.as_deref()),
        ("💨", Some("Wind Speed"), day.wind_speed.as_deref()),
    ];

    fields
        .into_iter()
        .filter_map(|(glyph, label, value)| {
            let value = value.filter(|v| !v.is_empty() && *v != UNKNOWN)?;
            Some(match label {
                Some(label) => format!("{glyph} {label}: {value}"),
                None => format!("{glyph} {value}"),
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn report() -> ForecastReport {
        ForecastReport {
            location: "Berlin".to_string(),
            days: vec![
                DaySummary {
                    date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                    weather: Some("Light Rain".to_string()),
                    temperature: Some("🔽 10.0°C → 🔼 22.5°C".to_string()),
                    wind_speed: Some("3.6 m/s".to_string()),
                },
                DaySummary {
                    date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
                    weather: Some(UNKNOWN.to_string()),
                    temperature: Some("🔽 12.0°C → 🔼 18.0°C".to_string()),
                    wind_speed: None,
                },
            ],
        }
    }

    #[test]
    fn text_response_renders_header_and_days() {
        let response = ResponseComposer::new(ResponseFormat::Text).compose(&report());
        let FulfillmentResponse::Text { fulfillment_text, display_text } = response else {
            panic!("expected a text response");
        };

        assert_eq!(fulfillment_text, display_text);
        assert!(fulfillment_text.starts_with("📍 Berlin\n\n📅 Monday, Jun 02, 2025"));
        assert!(fulfillment_text.contains("⛅ Weather: Light Rain"));
        assert!(fulfillment_text.contains("🌡️ Temperature: 🔽 10.0°C → 🔼 22.5°C"));
        assert!(fulfillment_text.contains("💨 Wind Speed: 3.6 m/s"));
        assert!(fulfillment_text.contains("📅 Tuesday, Jun 03, 2025\n🌡️ Temperature"));
    }

    #[test]
    fn unknown_and_missing_fields_are_skipped() {
        let response = ResponseComposer::new(ResponseFormat::Text).compose(&report());
        let text = response.fulfillment_text();

        assert!(!text.contains(UNKNOWN));
        assert_eq!(text.matches("Wind Speed").count(), 1);
    }

    #[test]
    fn day_with_only_a_date_is_kept() {
        let mut report = report();
        report.days[1].temperature = None;
        let response = ResponseComposer::new(ResponseFormat::Text).compose(&report);

        assert!(
            response
                .fulfillment_text()
                .ends_with("💨 Wind Speed: 3.6 m/s\n\n📅 Tuesday, Jun 03, 2025")
        );
    }

    #[test]
    fn rich_response_carries_same_lines() {
        let text = ResponseComposer::new(ResponseFormat::Text).compose(&report());
        let rich = ResponseComposer::new(ResponseFormat::Rich).compose(&report());

        assert_eq!(rich.fulfillment_text(), text.fulfillment_text());

        let FulfillmentResponse::Rich { fulfillment_messages, .. } = &rich else {
            panic!("expected a rich response");
        };
        let item = &fulfillment_messages[0].payload.rich_content[0][0];
        assert_eq!(item.title, "Weather Forecast");
        assert_eq!(item.text.len(), 3);
        assert_eq!(item.text.join("\n\n"), text.fulfillment_text());
    }

    #[test]
    fn rich_response_serializes_dialogflow_shape() {
        let rich = ResponseComposer::new(ResponseFormat::Rich).compose(&report());
        let value = serde_json::to_value(&rich).unwrap();

        assert_eq!(value["fulfillmentMessages"][0]["platform"], json!("PLATFORM_UNSPECIFIED"));
        assert_eq!(
            value["fulfillmentMessages"][0]["payload"]["richContent"][0][0]["type"],
            json!("description")
        );
        assert_eq!(
            value["fulfillmentMessages"][0]["payload"]["richContent"][0][0]["text"][0],
            json!("📍 Berlin")
        );
    }

    #[test]
    fn text_response_serializes_both_fields() {
        let value = serde_json::to_value(FulfillmentResponse::text("hi")).unwrap();
        assert_eq!(value, json!({"fulfillmentText": "hi", "displayText": "hi"}));
    }

    #[test]
    fn fallbacks_come_from_their_pools() {
        for _ in 0..50 {
            for (response, pool) in [
                (ResponseComposer::missing_city(), MISSING_CITY_REPLIES),
                (ResponseComposer::past_date(), PAST_DATE_REPLIES),
                (ResponseComposer::future_too_far(), FUTURE_TOO_FAR_REPLIES),
                (ResponseComposer::generic_error(), GENERIC_ERROR_REPLIES),
            ] {
                let FulfillmentResponse::Text { fulfillment_text, display_text } = response else {
                    panic!("fallbacks are plain text");
                };
                assert!(!fulfillment_text.is_empty());
                assert_eq!(fulfillment_text, display_text);
                assert!(pool.contains(&fulfillment_text.as_str()));
            }
        }
    }

    #[test]
    fn pools_are_large_enough() {
        for pool in [
            MISSING_CITY_REPLIES,
            PAST_DATE_REPLIES,
            FUTURE_TOO_FAR_REPLIES,
            GENERIC_ERROR_REPLIES,
        ] {
            assert!(pool.len() >= 3);
        }
    }

    #[test]
    fn response_format_parses_case_insensitively() {
        for format in ResponseFormat::all() {
            assert_eq!(ResponseFormat::try_from(format.as_str()).unwrap(), *format);
        }
        assert_eq!(ResponseFormat::try_from(" RICH ").unwrap(), ResponseFormat::Rich);

        let err = ResponseFormat::try_from("html").unwrap_err();
        assert!(err.to_string().contains("Unknown response format"));
    }
}
