use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One three-hourly sample returned by the forecast provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub temp_celsius: f64,
    pub wind_speed_mps: f64,
}

impl ForecastPoint {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Everything the provider returned for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastFeed {
    pub location: String,
    pub points: Vec<ForecastPoint>,
}

/// Inclusive calendar range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Condition,
    Temperature,
    WindSpeed,
}

/// Attribute the user asked about, e.g. "is it going to rain".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub kind: FilterKind,
    pub values: Vec<String>,
}

impl AttributeFilter {
    pub fn new(kind: FilterKind, values: Vec<String>) -> Self {
        Self { kind, values }
    }
}

/// Summary of one forecast day. Which fields are set depends on the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<String>,
}

impl DaySummary {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weather: None,
            temperature: None,
            wind_speed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub location: String,
    pub days: Vec<DaySummary>,
}
