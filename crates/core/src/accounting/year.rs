//! Fiscal years.

use chrono::NaiveDate;
use compta_shared::types::{ChartId, YearId};
use serde::{Deserialize, Serialize};

/// A fiscal year bound to one chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Year {
    /// Year id.
    pub id: YearId,
    /// Human label.
    pub label: String,
    /// First day, inclusive.
    pub start_date: NaiveDate,
    /// Last day, inclusive.
    pub end_date: NaiveDate,
    /// Closed years reject every write.
    pub closed: bool,
    /// Chart used by this year.
    pub id_chart: ChartId,
}

impl Year {
    /// Returns true if `date` falls within the year, bounds included.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}
