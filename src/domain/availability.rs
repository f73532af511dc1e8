use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PositioningError, Result};

pub const DEFAULT_MIN_NIGHTS: u32 = 1;
pub const DEFAULT_MAX_NIGHTS: u32 = 365;

/// Booking metadata for a single calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub available: bool,
    pub min_nights: u32,
    pub max_nights: u32,
}

/// Per-date availability for one room, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityIndex {
    days: BTreeMap<NaiveDate, CalendarDay>,
}

impl AvailabilityIndex {
    pub fn get(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.get(&date)
    }

    /// Dates missing from the index count as unavailable.
    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.days.get(&date).is_some_and(|d| d.available)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.days.values().filter(|d| d.available).count()
    }

    /// Available days strictly after `today`, ascending.
    pub fn available_after(&self, today: NaiveDate) -> impl Iterator<Item = &CalendarDay> {
        self.days
            .range((Bound::Excluded(today), Bound::Unbounded))
            .map(|(_, day)| day)
            .filter(|d| d.available)
    }

    pub fn insert(&mut self, day: CalendarDay) {
        self.days.insert(day.date, day);
    }
}

impl FromIterator<CalendarDay> for AvailabilityIndex {
    fn from_iter<I: IntoIterator<Item = CalendarDay>>(iter: I) -> Self {
        let mut index = Self::default();
        for day in iter {
            index.insert(day);
        }
        index
    }
}

/// Build the availability index from a raw calendar payload (a list of month blocks).
///
/// Only a payload that is not a list at all is an error. Month blocks that are not
/// objects, day records without a parseable date and malformed fields degrade to
/// skipping or to the documented defaults.
pub fn build_availability(raw_calendar: &Value) -> Result<AvailabilityIndex> {
    let months = raw_calendar
        .as_array()
        .ok_or_else(|| PositioningError::MalformedCalendar {
            reason: format!("expected a list of months, got {}", json_kind(raw_calendar)),
        })?;

    let mut index = AvailabilityIndex::default();
    let mut skipped = 0usize;

    for month in months {
        let Some(days) = month.get("days").and_then(Value::as_array) else {
            continue;
        };
        for day in days {
            match parse_day(day) {
                Some(parsed) => index.insert(parsed),
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped calendar days without a parseable date");
    }
    tracing::debug!(
        days = index.len(),
        available = index.available_count(),
        "Availability index built"
    );

    Ok(index)
}

fn parse_day(day: &Value) -> Option<CalendarDay> {
    let date = day
        .get("calendarDate")
        .or_else(|| day.get("calendar_date"))
        .or_else(|| day.get("date"))
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())?;

    let available = day
        .get("available")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let min_nights = positive_u32(day.get("minNights").or_else(|| day.get("min_nights")))
        .unwrap_or(DEFAULT_MIN_NIGHTS);
    let max_nights = positive_u32(day.get("maxNights").or_else(|| day.get("max_nights")))
        .unwrap_or(DEFAULT_MAX_NIGHTS);

    Some(CalendarDay {
        date,
        available,
        min_nights,
        max_nights,
    })
}

fn positive_u32(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    let n = value
        .as_u64()
        .or_else(|| value.as_f64().and_then(integral))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn integral(f: f64) -> Option<u64> {
    (f.fract() == 0.0 && f >= 1.0 && f <= f64::from(u32::MAX)).then_some(f as u64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
