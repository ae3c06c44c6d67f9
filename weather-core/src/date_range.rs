//! Turning the agent's `date-time` slot into a validated calendar range.
//!
//! The slot arrives in several shapes depending on how the user phrased the
//! question: a single timestamp, a list of one or two timestamps, or an
//! object with `startDate`/`endDate` style keys (sometimes nested one level
//! deeper than expected). [`RawTimeParameter`] captures the shape once at the
//! boundary and [`resolve`] collapses it into a [`ValidationOutcome`].

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::{error::FulfillmentError, model::DateInterval};

/// The provider only forecasts this many days past today.
pub const FORECAST_HORIZON_DAYS: u64 = 5;

const START_KEYS: [&str; 3] = ["startDate", "startDateTime", "date_time"];
const END_KEYS: [&str; 3] = ["endDate", "endDateTime", "date_time"];
const NESTED_END_KEYS: [&str; 2] = ["endDate", "startDate"];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

/// The `date-time` slot as sent by the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimeParameter {
    Absent,
    Text(String),
    Fields(BTreeMap<String, RawTimeParameter>),
    List(Vec<RawTimeParameter>),
    /// Numbers, booleans and anything else with no date meaning.
    Unrecognized,
}

impl RawTimeParameter {
    /// Empty strings, lists and objects count as "not provided".
    pub fn is_provided(&self) -> bool {
        match self {
            RawTimeParameter::Absent => false,
            RawTimeParameter::Text(s) => !s.is_empty(),
            RawTimeParameter::Fields(fields) => !fields.is_empty(),
            RawTimeParameter::List(items) => !items.is_empty(),
            RawTimeParameter::Unrecognized => true,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            RawTimeParameter::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&Value> for RawTimeParameter {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawTimeParameter::Absent,
            Value::String(s) => RawTimeParameter::Text(s.clone()),
            Value::Array(items) => {
                RawTimeParameter::List(items.iter().map(RawTimeParameter::from).collect())
            }
            Value::Object(map) => RawTimeParameter::Fields(
                map.iter()
                    .map(|(k, v)| (k.clone(), RawTimeParameter::from(v)))
                    .collect(),
            ),
            Value::Bool(_) | Value::Number(_) => RawTimeParameter::Unrecognized,
        }
    }
}

impl From<Option<&Value>> for RawTimeParameter {
    fn from(value: Option<&Value>) -> Self {
        value.map_or(RawTimeParameter::Absent, RawTimeParameter::from)
    }
}

/// Result of validating a requested range against today's forecast window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(DateInterval),
    PastDate,
    FutureTooFar,
    MalformedInput,
}

impl ValidationOutcome {
    pub fn into_interval(self) -> Result<DateInterval, FulfillmentError> {
        match self {
            ValidationOutcome::Valid(interval) => Ok(interval),
            ValidationOutcome::PastDate => Err(FulfillmentError::PastDate),
            ValidationOutcome::FutureTooFar => Err(FulfillmentError::FutureTooFar),
            ValidationOutcome::MalformedInput => Err(FulfillmentError::MalformedInput(
                "unusable date-time parameter".to_string(),
            )),
        }
    }
}

enum Extracted<'a> {
    Today,
    Bounds {
        start: Option<&'a RawTimeParameter>,
        end: Option<&'a RawTimeParameter>,
    },
}

/// Resolve the slot into a range and classify it relative to `today`.
pub fn resolve(raw: &RawTimeParameter, today: NaiveDate) -> ValidationOutcome {
    let (start, end) = match extract(raw) {
        Extracted::Today => (today, today),
        Extracted::Bounds { start, end } => {
            let end = end.and_then(collapse_nested_end);

            let (Some(start_str), Some(end_str)) = (
                start.and_then(RawTimeParameter::as_text),
                end.and_then(RawTimeParameter::as_text),
            ) else {
                tracing::warn!(?raw, "no usable start or end date in date-time parameter");
                return ValidationOutcome::MalformedInput;
            };

            tracing::debug!(start = start_str, end = end_str, "extracted date strings");

            match (parse_calendar_date(start_str), parse_calendar_date(end_str)) {
                (Some(start), Some(end)) => (start, end),
                _ => {
                    tracing::warn!(start = start_str, end = end_str, "failed to parse dates");
                    return ValidationOutcome::MalformedInput;
                }
            }
        }
    };

    let outcome = classify(start, end, today);
    tracing::info!(%start, %end, %today, ?outcome, "date validation outcome");
    outcome
}

/// Classify an already parsed pair. Past dates take priority over the
/// horizon check.
pub fn classify(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> ValidationOutcome {
    let max_end = today
        .checked_add_days(Days::new(FORECAST_HORIZON_DAYS))
        .unwrap_or(NaiveDate::MAX);

    if start < today {
        ValidationOutcome::PastDate
    } else if end > max_end {
        ValidationOutcome::FutureTooFar
    } else {
        DateInterval::new(start, end).map_or(ValidationOutcome::MalformedInput, ValidationOutcome::Valid)
    }
}

fn extract(raw: &RawTimeParameter) -> Extracted<'_> {
    match raw {
        RawTimeParameter::Fields(fields) => bounds_from_fields(fields),
        RawTimeParameter::List(items) => match items.as_slice() {
            [] => Extracted::Today,
            [RawTimeParameter::Fields(fields)] => bounds_from_fields(fields),
            [single @ RawTimeParameter::Text(_)] => Extracted::Bounds {
                start: Some(single),
                end: Some(single),
            },
            [_] => Extracted::Today,
            [start, end, ..] => Extracted::Bounds {
                start: Some(start),
                end: Some(end),
            },
        },
        RawTimeParameter::Text(_) => Extracted::Bounds {
            start: Some(raw),
            end: Some(raw),
        },
        RawTimeParameter::Absent | RawTimeParameter::Unrecognized => Extracted::Today,
    }
}

fn bounds_from_fields(fields: &BTreeMap<String, RawTimeParameter>) -> Extracted<'_> {
    Extracted::Bounds {
        start: first_provided(fields, &START_KEYS),
        end: first_provided(fields, &END_KEYS),
    }
}

// Some agent versions wrap a collapsed range as `{endDate: {startDate, endDate}}`.
fn collapse_nested_end(end: &RawTimeParameter) -> Option<&RawTimeParameter> {
    match end {
        RawTimeParameter::Fields(fields) => first_provided(fields, &NESTED_END_KEYS),
        other => Some(other),
    }
}

fn first_provided<'a>(
    fields: &'a BTreeMap<String, RawTimeParameter>,
    keys: &[&str],
) -> Option<&'a RawTimeParameter> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| value.is_provided())
}

/// Parse a loosely formatted date or timestamp, dropping the time of day.
///
/// Timestamps carrying an offset keep the calendar date of that offset.
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NAIVE_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 6, 1)
    }

    fn resolve_json(value: Value) -> ValidationOutcome {
        resolve(&RawTimeParameter::from(&value), today())
    }

    fn valid(start: NaiveDate, end: NaiveDate) -> ValidationOutcome {
        ValidationOutcome::Valid(DateInterval::new(start, end).unwrap())
    }

    #[test]
    fn past_range_in_fields_is_past_date() {
        let outcome = resolve_json(json!({"startDate": "2025-01-01", "endDate": "2025-01-01"}));
        assert_eq!(outcome, ValidationOutcome::PastDate);
    }

    #[test]
    fn single_string_within_horizon_is_valid() {
        let outcome = resolve_json(json!("2025-06-03"));
        assert_eq!(outcome, valid(date(2025, 6, 3), date(2025, 6, 3)));
    }

    #[test]
    fn list_ending_after_horizon_is_too_far() {
        let outcome = resolve_json(json!(["2025-06-01", "2025-06-10"]));
        assert_eq!(outcome, ValidationOutcome::FutureTooFar);
    }

    #[test]
    fn empty_list_defaults_to_today() {
        assert_eq!(resolve_json(json!([])), valid(today(), today()));
    }

    #[test]
    fn absent_and_unrecognized_default_to_today() {
        assert_eq!(resolve(&RawTimeParameter::Absent, today()), valid(today(), today()));
        assert_eq!(resolve_json(json!(42)), valid(today(), today()));
        assert_eq!(resolve_json(json!([true])), valid(today(), today()));
    }

    #[test]
    fn past_date_wins_over_future_too_far() {
        let outcome = resolve_json(json!(["2025-05-30", "2025-07-01"]));
        assert_eq!(outcome, ValidationOutcome::PastDate);
    }

    #[test]
    fn horizon_is_inclusive() {
        assert_eq!(
            resolve_json(json!(["2025-06-02", "2025-06-06"])),
            valid(date(2025, 6, 2), date(2025, 6, 6))
        );
        assert_eq!(
            resolve_json(json!(["2025-06-02", "2025-06-07"])),
            ValidationOutcome::FutureTooFar
        );
    }

    #[test]
    fn fields_fall_back_through_key_names() {
        let outcome = resolve_json(json!({
            "startDateTime": "2025-06-02T09:00:00+02:00",
            "endDateTime": "2025-06-03T18:00:00+02:00"
        }));
        assert_eq!(outcome, valid(date(2025, 6, 2), date(2025, 6, 3)));

        let outcome = resolve_json(json!({"date_time": "2025-06-04T12:00:00Z"}));
        assert_eq!(outcome, valid(date(2025, 6, 4), date(2025, 6, 4)));
    }

    #[test]
    fn empty_field_values_are_skipped() {
        let outcome = resolve_json(json!({
            "startDate": "",
            "startDateTime": "2025-06-02T00:00:00",
            "endDate": "2025-06-03"
        }));
        assert_eq!(outcome, valid(date(2025, 6, 2), date(2025, 6, 3)));
    }

    #[test]
    fn nested_end_object_is_collapsed() {
        let outcome = resolve_json(json!({
            "startDate": "2025-06-02",
            "endDate": {"startDate": "2025-06-03", "endDate": "2025-06-04"}
        }));
        assert_eq!(outcome, valid(date(2025, 6, 2), date(2025, 6, 4)));

        let outcome = resolve_json(json!({
            "startDate": "2025-06-02",
            "endDate": {"startDate": "2025-06-05"}
        }));
        assert_eq!(outcome, valid(date(2025, 6, 2), date(2025, 6, 5)));
    }

    #[test]
    fn single_element_list_shapes() {
        assert_eq!(
            resolve_json(json!([{"startDate": "2025-06-02", "endDate": "2025-06-03"}])),
            valid(date(2025, 6, 2), date(2025, 6, 3))
        );
        assert_eq!(
            resolve_json(json!(["2025-06-05T10:00:00"])),
            valid(date(2025, 6, 5), date(2025, 6, 5))
        );
    }

    #[test]
    fn extra_list_elements_are_ignored() {
        let outcome = resolve_json(json!(["2025-06-02", "2025-06-03", "2030-01-01"]));
        assert_eq!(outcome, valid(date(2025, 6, 2), date(2025, 6, 3)));
    }

    #[test]
    fn missing_end_is_malformed() {
        assert_eq!(
            resolve_json(json!({"startDate": "2025-06-02"})),
            ValidationOutcome::MalformedInput
        );
        assert_eq!(resolve_json(json!({"foo": "bar"})), ValidationOutcome::MalformedInput);
        assert_eq!(resolve_json(json!("")), ValidationOutcome::MalformedInput);
    }

    #[test]
    fn non_string_bounds_are_malformed() {
        assert_eq!(
            resolve_json(json!([{"startDate": "2025-06-02"}, "2025-06-03"])),
            ValidationOutcome::MalformedInput
        );
        assert_eq!(
            resolve_json(json!({"startDate": 5, "endDate": "2025-06-03"})),
            ValidationOutcome::MalformedInput
        );
    }

    #[test]
    fn unparseable_text_is_malformed() {
        assert_eq!(resolve_json(json!("next blue moon")), ValidationOutcome::MalformedInput);
        assert_eq!(
            resolve_json(json!(["2025-06-02", "2025-13-45"])),
            ValidationOutcome::MalformedInput
        );
    }

    #[test]
    fn reversed_range_is_malformed() {
        assert_eq!(
            resolve_json(json!(["2025-06-04", "2025-06-02"])),
            ValidationOutcome::MalformedInput
        );
    }

    #[test]
    fn parses_common_formats() {
        let expected = date(2025, 6, 3);
        for input in [
            "2025-06-03",
            "2025/06/03",
            "03.06.2025",
            "2025-06-03T12:00:00+02:00",
            "2025-06-03T23:30:00-05:00",
            "2025-06-03T12:00:00Z",
            "2025-06-03T12:00:00.123+0200",
            "2025-06-03T12:00:00",
            "2025-06-03 12:00:00",
            "2025-06-03T12:00",
            "Tue, 03 Jun 2025 12:00:00 +0000",
            "June 3, 2025",
            "Jun 3 2025",
            "3 June 2025",
            "  2025-06-03  ",
        ] {
            assert_eq!(parse_calendar_date(input), Some(expected), "input: {input}");
        }
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "   ", "tomorrow-ish", "2025-02-30", "06/03"] {
            assert_eq!(parse_calendar_date(input), None, "input: {input}");
        }
    }

    #[test]
    fn outcome_maps_to_fulfillment_errors() {
        assert!(matches!(
            ValidationOutcome::PastDate.into_interval(),
            Err(FulfillmentError::PastDate)
        ));
        assert!(matches!(
            ValidationOutcome::FutureTooFar.into_interval(),
            Err(FulfillmentError::FutureTooFar)
        ));
        assert!(matches!(
            ValidationOutcome::MalformedInput.into_interval(),
            Err(FulfillmentError::MalformedInput(_))
        ));
        let interval = DateInterval::single(today());
        assert_eq!(ValidationOutcome::Valid(interval).into_interval().unwrap(), interval);
    }
}
