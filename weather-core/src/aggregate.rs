//! Per-day reduction of the provider's three-hourly forecast.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    emoji::condition_emoji,
    model::{AttributeFilter, DateInterval, DaySummary, FilterKind, ForecastPoint},
};

/// The 5 day / 3 hour feed spans at most six calendar dates.
pub const MAX_FORECAST_DAYS: usize = 6;

pub type DailyBuckets<'a> = BTreeMap<NaiveDate, Vec<&'a ForecastPoint>>;

/// Group points by calendar date, keeping the earliest [`MAX_FORECAST_DAYS`] dates.
pub fn bucket_by_day(points: &[ForecastPoint]) -> DailyBuckets<'_> {
    let mut buckets: DailyBuckets<'_> = BTreeMap::new();
    for point in points {
        buckets.entry(point.date()).or_default().push(point);
    }

    buckets.into_iter().take(MAX_FORECAST_DAYS).collect()
}

/// Keep the buckets the interval asks for. A single-day interval selects
/// exactly that date, or nothing when the feed doesn't cover it.
pub fn select_days<'a>(
    buckets: DailyBuckets<'a>,
    interval: DateInterval,
) -> Vec<(NaiveDate, Vec<&'a ForecastPoint>)> {
    buckets
        .into_iter()
        .filter(|(date, entries)| {
            let wanted = if interval.is_single_day() {
                *date == interval.start()
            } else {
                interval.contains(*date)
            };
            wanted && !entries.is_empty()
        })
        .collect()
}

/// Summarize the forecast for every selected day.
///
/// Without a filter each day gets the dominant description, the temperature
/// span and the most common wind speed. With a filter only the matching
/// field is produced. Aggregation is deterministic for a given input.
pub fn aggregate(
    points: &[ForecastPoint],
    interval: DateInterval,
    filter: Option<&AttributeFilter>,
) -> Vec<DaySummary> {
    let filter = filter.and_then(active_filter);
    let days = select_days(bucket_by_day(points), interval);

    tracing::debug!(
        points = points.len(),
        days = days.len(),
        filter = ?filter.as_ref().map(|f| f.kind),
        "aggregating forecast"
    );

    days.into_iter()
        .filter_map(|(date, entries)| match &filter {
            None => summarize_full(date, &entries),
            Some(f) => match f.kind {
                FilterKind::Condition => summarize_condition(date, &entries, &f.values),
                FilterKind::Temperature => summarize_temperature(date, &entries),
                FilterKind::WindSpeed => summarize_wind(date, &entries),
            },
        })
        .collect()
}

fn summarize_full(date: NaiveDate, entries: &[&ForecastPoint]) -> Option<DaySummary> {
    let weather = mode(entries.iter().map(|p| title_case(&p.description)))?;
    let (min_temp, max_temp) = min_max(entries.iter().map(|p| p.temp_celsius))?;
    // Mode of the raw readings rather than a span; see DESIGN.md.
    let wind = mode(entries.iter().map(|p| p.wind_speed_mps))?;

    Some(DaySummary {
        weather: Some(weather),
        temperature: Some(format_temperature_span(min_temp, max_temp)),
        wind_speed: Some(format!("{} m/s", format_speed(wind))),
        ..DaySummary::new(date)
    })
}

/// Trimmed copy of `filter` with blank values removed; `None` when nothing is left.
fn active_filter(filter: &AttributeFilter) -> Option<AttributeFilter> {
    let values: Vec<String> = filter
        .values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    (!values.is_empty()).then(|| AttributeFilter::new(filter.kind, values))
}

fn summarize_condition(
    date: NaiveDate,
    entries: &[&ForecastPoint],
    keywords: &[String],
) -> Option<DaySummary> {
    let mut recorded = Vec::with_capacity(entries.len() * keywords.len());
    for point in entries {
        let description = point.description.to_lowercase();
        for keyword in keywords {
            if description.contains(&keyword.to_lowercase()) {
                recorded.push(title_case(&point.description));
            } else {
                recorded.push(format!("No {keyword}"));
            }
        }
    }

    let dominant = mode(recorded)?;
    let weather = match keywords.first().and_then(|k| condition_emoji(k)) {
        Some(glyph) => format!("{glyph} {dominant}"),
        None => dominant,
    };

    Some(DaySummary {
        weather: Some(weather),
        ..DaySummary::new(date)
    })
}

fn summarize_temperature(date: NaiveDate, entries: &[&ForecastPoint]) -> Option<DaySummary> {
    let (min_temp, max_temp) = min_max(entries.iter().map(|p| p.temp_celsius))?;

    Some(DaySummary {
        temperature: Some(format_temperature_span(min_temp, max_temp)),
        ..DaySummary::new(date)
    })
}

fn summarize_wind(date: NaiveDate, entries: &[&ForecastPoint]) -> Option<DaySummary> {
    let (min_wind, max_wind) = min_max(entries.iter().map(|p| p.wind_speed_mps))?;

    Some(DaySummary {
        wind_speed: Some(format!("🔽 {min_wind:.1} m/s → 🔼 {max_wind:.1} m/s")),
        ..DaySummary::new(date)
    })
}

fn format_temperature_span(min: f64, max: f64) -> String {
    format!("🔽 {min:.1}°C → 🔼 {max:.1}°C")
}

/// Shortest representation, but always with a decimal part (`4.0`, `3.25`).
fn format_speed(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Most frequent value; ties go to the value seen first.
fn mode<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        let better = match &best {
            Some((_, best_count)) => count > *best_count,
            None => true,
        };
        if better {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Capitalize the first letter of every word, lowercase the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
