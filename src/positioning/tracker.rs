use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::availability::build_availability;
use crate::domain::date_selector::{ProbeSelection, select_first_available, select_probes};
use crate::domain::probe::SearchProbe;
use crate::domain::rank::{locate, page_price_range};
use crate::domain::report::{RankFinding, RunSummary};
use crate::domain::search_criteria::SearchCriteria;
use crate::error::{PositioningError, Result};
use crate::ports::calendar_provider::CalendarProvider;
use crate::ports::page_fetcher::PageFetcher;

use super::aggregator::{AggregationSettings, aggregate_search};

/// Where the probes of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeSource {
    /// Select probes from the room's availability calendar.
    Calendar,
    /// A single, explicitly given stay.
    Manual(SearchProbe),
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub selection: ProbeSelection,
    /// When non-zero, take the first `max_days` available dates instead of the
    /// per-month selection.
    pub max_days: u32,
    pub calendar_months: u32,
    pub aggregation: AggregationSettings,
    /// Pause between probes.
    pub probe_delay: Duration,
}

pub struct PositionTracker {
    calendar: Arc<dyn CalendarProvider>,
    fetcher: Arc<dyn PageFetcher>,
    settings: TrackerSettings,
}

impl PositionTracker {
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        fetcher: Arc<dyn PageFetcher>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            calendar,
            fetcher,
            settings,
        }
    }

    /// Fetch the room's calendar and select the probes to run.
    ///
    /// Fails with `MalformedCalendar` when the payload is unusable and with
    /// `NoAvailability` when no future date is open.
    pub async fn plan_probes(&self, room_id: &str, today: NaiveDate) -> Result<Vec<SearchProbe>> {
        let raw = self
            .calendar
            .get_calendar(room_id, self.settings.calendar_months)
            .await?;
        let index = build_availability(&raw)?;

        let open_days = index.available_after(today).count();
        info!(room_id, days = index.len(), available = open_days, "Calendar loaded");
        if open_days == 0 {
            return Err(PositioningError::NoAvailability {
                room_id: room_id.to_string(),
            });
        }

        let probes = if self.settings.max_days > 0 {
            select_first_available(
                &index,
                self.settings.max_days,
                self.settings.selection.nights_policy,
                today,
            )
        } else {
            select_probes(&index, &self.settings.selection, today)
        };

        info!(
            room_id,
            probes = probes.len(),
            dates_per_month = self.settings.selection.dates_per_month,
            months_to_check = self.settings.selection.months_to_check,
            "Probes selected"
        );
        Ok(probes)
    }

    /// Run every probe in order. A failed probe is recorded and the run moves on.
    pub async fn run_probes(
        &self,
        room_id: &str,
        criteria: &SearchCriteria,
        probes: &[SearchProbe],
    ) -> Vec<RankFinding> {
        let mut findings = Vec::with_capacity(probes.len());
        for (i, probe) in probes.iter().enumerate() {
            if i > 0 && !self.settings.probe_delay.is_zero() {
                tokio::time::sleep(self.settings.probe_delay).await;
            }
            info!(probe = %probe, n = i + 1, of = probes.len(), "Running probe");
            let finding = self.run_probe(room_id, criteria, probe).await;
            findings.push(finding);
        }
        findings
    }

    async fn run_probe(
        &self,
        room_id: &str,
        criteria: &SearchCriteria,
        probe: &SearchProbe,
    ) -> RankFinding {
        let aggregation = &self.settings.aggregation;
        let aggregate = aggregate_search(
            self.fetcher.as_ref(),
            criteria,
            probe,
            Some(room_id),
            aggregation,
        )
        .await;

        if let Some(failure) = aggregate.failure {
            let mut finding = RankFinding::failed(*probe, aggregate.listings.len(), failure);
            finding.pages_fetched = aggregate.pages_fetched;
            return finding;
        }

        let position = locate(&aggregate.listings, room_id, aggregation.page_size);
        let mut finding = RankFinding::new(*probe, position, aggregate.listings.len());
        finding.pages_fetched = aggregate.pages_fetched;
        finding.terminated_early = aggregate.terminated_early;

        match position {
            Some(position) => {
                finding.target_name = aggregate
                    .listings
                    .get(position.rank - 1)
                    .map(|l| l.display_name.clone());
                finding.page_price_range =
                    page_price_range(&aggregate.listings, &position, aggregation.page_size);
                info!(
                    probe = %probe,
                    rank = position.rank,
                    page = position.page,
                    position = position.position_on_page,
                    listings = aggregate.listings.len(),
                    "Listing found"
                );
            }
            None => info!(
                probe = %probe,
                listings = aggregate.listings.len(),
                "Listing not found"
            ),
        }
        finding
    }

    /// Plan and run a full positioning pass.
    ///
    /// Only a malformed calendar is returned as an error. A calendar that cannot be
    /// fetched, or has no open dates, ends the run with an empty summary and a notice.
    pub async fn run(
        &self,
        room_id: &str,
        criteria: &SearchCriteria,
        source: &ProbeSource,
        today: NaiveDate,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new(
            room_id,
            criteria.to_string(),
            self.settings.aggregation.page_size,
        );

        let probes = match source {
            ProbeSource::Manual(probe) => vec![*probe],
            ProbeSource::Calendar => match self.plan_probes(room_id, today).await {
                Ok(probes) => probes,
                Err(e @ PositioningError::NoAvailability { .. }) => {
                    warn!(room_id, "No available dates, nothing to probe");
                    summary.notice = Some(e.to_string());
                    return Ok(summary);
                }
                Err(e @ PositioningError::MalformedCalendar { .. }) => return Err(e),
                Err(e) => {
                    warn!(room_id, error = %e, "Calendar unavailable, nothing to probe");
                    summary.notice = Some(format!("Calendar fetch failed: {e}"));
                    return Ok(summary);
                }
            },
        };

        if probes.is_empty() {
            warn!(room_id, "No dates selected in the target months");
            summary.notice = Some("No available dates in the target months".into());
            return Ok(summary);
        }

        summary.findings = self.run_probes(room_id, criteria, &probes).await;
        Ok(summary)
    }
}
