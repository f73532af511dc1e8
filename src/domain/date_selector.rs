use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::availability::{AvailabilityIndex, CalendarDay};
use crate::domain::probe::SearchProbe;

/// Which months the per-month selection walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthPolicy {
    /// Skip the current month and start at the next calendar month.
    #[default]
    NextMonth,
    /// Start at the current month, inclusive.
    CurrentMonth,
}

/// How many nights each probe books.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightsPolicy {
    /// The check-in date's minimum stay.
    FixedMinimum,
    /// The longest fully available stay of at most `max_nights`, never below the minimum stay.
    FlexibleMaximum { max_nights: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSelection {
    pub dates_per_month: u32,
    pub months_to_check: u32,
    pub month_policy: MonthPolicy,
    pub nights_policy: NightsPolicy,
}

/// Select up to `dates_per_month` check-in dates in each target month.
///
/// Only dates strictly after `today` that are marked available are candidates. Within a
/// month the earliest dates win, so the result is fully determined by the index, the
/// selection and `today`.
pub fn select_probes(
    index: &AvailabilityIndex,
    selection: &ProbeSelection,
    today: NaiveDate,
) -> Vec<SearchProbe> {
    let mut by_month: BTreeMap<(i32, u32), Vec<&CalendarDay>> = BTreeMap::new();
    for day in index.available_after(today) {
        by_month
            .entry((day.date.year(), day.date.month()))
            .or_default()
            .push(day);
    }

    let per_month = usize::try_from(selection.dates_per_month).unwrap_or(usize::MAX);
    let mut probes = Vec::new();

    for month in target_months(today, selection.months_to_check, selection.month_policy) {
        let Some(days) = by_month.get(&month) else {
            tracing::debug!(year = month.0, month = month.1, "No available dates in month");
            continue;
        };
        // available_after already yields ascending dates
        for day in days.iter().take(per_month) {
            if let Some(probe) = probe_for(index, day, selection.nights_policy) {
                probes.push(probe);
            }
        }
    }

    probes
}

/// Take the first `max_days` available future dates, regardless of month.
pub fn select_first_available(
    index: &AvailabilityIndex,
    max_days: u32,
    nights_policy: NightsPolicy,
    today: NaiveDate,
) -> Vec<SearchProbe> {
    index
        .available_after(today)
        .take(usize::try_from(max_days).unwrap_or(usize::MAX))
        .filter_map(|day| probe_for(index, day, nights_policy))
        .collect()
}

/// The `(year, month)` buckets to draw dates from, in order.
pub fn target_months(today: NaiveDate, count: u32, policy: MonthPolicy) -> Vec<(i32, u32)> {
    let mut current = (today.year(), today.month());
    if policy == MonthPolicy::NextMonth {
        current = next_month(current);
    }
    let mut months = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
    for _ in 0..count {
        months.push(current);
        current = next_month(current);
    }
    months
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn probe_for(index: &AvailabilityIndex, day: &CalendarDay, policy: NightsPolicy) -> Option<SearchProbe> {
    SearchProbe::starting(day.date, nights_for(index, day, policy))
}

/// Nights for a check-in under `policy`.
pub fn nights_for(index: &AvailabilityIndex, day: &CalendarDay, policy: NightsPolicy) -> u32 {
    let min_nights = day.min_nights.max(1);
    match policy {
        NightsPolicy::FixedMinimum => min_nights,
        NightsPolicy::FlexibleMaximum { max_nights } => {
            let ceiling = max_nights.min(day.max_nights);
            (min_nights..=ceiling)
                .rev()
                .find(|&nights| is_run_available(index, day.date, nights))
                .unwrap_or(min_nights)
        }
    }
}

/// Whether every night in `[check_in, check_in + nights)` is available.
fn is_run_available(index: &AvailabilityIndex, check_in: NaiveDate, nights: u32) -> bool {
    (0..u64::from(nights)).all(|offset| {
        check_in
            .checked_add_days(Days::new(offset))
            .is_some_and(|date| index.is_available(date))
    })
}
