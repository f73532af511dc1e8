use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PositioningError, Result};

/// One (check-in, check-out, nights) test case submitted to the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProbe {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
}

impl SearchProbe {
    /// Build a probe of `nights` nights starting at `check_in`.
    ///
    /// Returns `None` when `nights` is zero or the check-out date overflows the calendar.
    pub fn starting(check_in: NaiveDate, nights: u32) -> Option<Self> {
        if nights == 0 {
            return None;
        }
        let check_out = check_in.checked_add_days(Days::new(u64::from(nights)))?;
        Some(Self {
            check_in,
            check_out,
            nights,
        })
    }

    /// Build a probe from explicit dates, as given on the command line.
    pub fn between(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        let nights = (check_out - check_in).num_days();
        if nights <= 0 {
            return Err(PositioningError::InvalidParams {
                reason: format!("checkout {check_out} must be after checkin {check_in}"),
            });
        }
        let nights = u32::try_from(nights).map_err(|_| PositioningError::InvalidParams {
            reason: format!("stay from {check_in} to {check_out} is too long"),
        })?;
        Ok(Self {
            check_in,
            check_out,
            nights,
        })
    }
}

impl std::fmt::Display for SearchProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = if self.nights == 1 { "night" } else { "nights" };
        write!(
            f,
            "{} -> {} ({} {unit})",
            self.check_in, self.check_out, self.nights
        )
    }
}
