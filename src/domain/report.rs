#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use crate::domain::probe::SearchProbe;
use crate::domain::rank::{PriceBucket, RankPosition};

const NAME_WIDTH: usize = 50;

/// The outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankFinding {
    pub probe: SearchProbe,
    pub found: bool,
    pub rank: Option<usize>,
    pub page: Option<usize>,
    pub position_on_page: Option<usize>,
    pub total_listings: usize,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub page_price_range: Option<PriceBucket>,
    #[serde(default)]
    pub pages_fetched: u32,
    #[serde(default)]
    pub terminated_early: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl RankFinding {
    pub fn new(probe: SearchProbe, position: Option<RankPosition>, total_listings: usize) -> Self {
        Self {
            probe,
            found: position.is_some(),
            rank: position.map(|p| p.rank),
            page: position.map(|p| p.page),
            position_on_page: position.map(|p| p.position_on_page),
            total_listings,
            target_name: None,
            page_price_range: None,
            pages_fetched: 0,
            terminated_early: false,
            error: None,
        }
    }

    /// A probe whose search could not complete.
    pub fn failed(probe: SearchProbe, total_listings: usize, error: impl Into<String>) -> Self {
        Self {
            terminated_early: true,
            error: Some(error.into()),
            ..Self::new(probe, None, total_listings)
        }
    }
}

/// Aggregated rank statistics over the probes that found the listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankStats {
    pub probes: usize,
    pub found: usize,
    pub failed: usize,
    pub average_rank: Option<f64>,
    pub best_rank: Option<usize>,
    pub worst_rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub room_id: String,
    pub search: String,
    pub page_size: usize,
    pub findings: Vec<RankFinding>,
    #[serde(default)]
    pub notice: Option<String>,
}

impl RunSummary {
    pub fn new(room_id: impl Into<String>, search: impl Into<String>, page_size: usize) -> Self {
        Self {
            room_id: room_id.into(),
            search: search.into(),
            page_size,
            findings: Vec::new(),
            notice: None,
        }
    }

    pub fn stats(&self) -> RankStats {
        let ranks: Vec<usize> = self.findings.iter().filter_map(|f| f.rank).collect();
        let average_rank = if ranks.is_empty() {
            None
        } else {
            Some(ranks.iter().sum::<usize>() as f64 / ranks.len() as f64)
        };
        RankStats {
            probes: self.findings.len(),
            found: self.findings.iter().filter(|f| f.found).count(),
            failed: self.findings.iter().filter(|f| f.error.is_some()).count(),
            average_rank,
            best_rank: ranks.iter().copied().min(),
            worst_rank: ranks.iter().copied().max(),
        }
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut short: String = name.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

impl std::fmt::Display for RankFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.probe)?;
        if let Some(ref error) = self.error {
            return write!(
                f,
                "ERROR after {} listings ({error})",
                self.total_listings
            );
        }
        match (self.rank, self.page, self.position_on_page) {
            (Some(rank), Some(page), Some(pos)) => {
                write!(
                    f,
                    "FOUND #{rank} (page {page}, position {pos}) of {} listings",
                    self.total_listings
                )?;
                if let Some(ref name) = self.target_name {
                    write!(f, " \"{}\"", truncate(name, NAME_WIDTH))?;
                }
                if let Some(bucket) = self.page_price_range {
                    write!(
                        f,
                        " | page prices {:.0}-{:.0}",
                        bucket.min_price, bucket.max_price
                    )?;
                }
            }
            _ => write!(f, "NOT FOUND in {} listings", self.total_listings)?,
        }
        if self.terminated_early {
            write!(f, " (stopped after {} pages)", self.pages_fetched)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "{rule}")?;
        writeln!(f, "Positioning report for room {}", self.room_id)?;
        writeln!(f, "Search: {}", self.search)?;
        writeln!(f, "Page size: {}", self.page_size)?;
        writeln!(f, "{rule}")?;
        if let Some(ref notice) = self.notice {
            writeln!(f, "{notice}")?;
        }
        let total = self.findings.len();
        for (i, finding) in self.findings.iter().enumerate() {
            writeln!(f, "[{}/{total}] {finding}", i + 1)?;
        }
        writeln!(f, "{}", "-".repeat(80))?;

        let stats = self.stats();
        writeln!(f, "Found: {}/{} probes", stats.found, stats.probes)?;
        if stats.failed > 0 {
            writeln!(f, "Failed: {}", stats.failed)?;
        }
        if let (Some(avg), Some(best), Some(worst)) =
            (stats.average_rank, stats.best_rank, stats.worst_rank)
        {
            writeln!(f, "Average rank: #{avg:.1}")?;
            writeln!(f, "Best rank: #{best}")?;
            writeln!(f, "Worst rank: #{worst}")?;
        }
        Ok(())
    }
}
