//! Cycle entity

use crate::config::Frequency;
use crate::ids::CycleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_store::Entity;

/// Business period scenarios are grouped by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    id: CycleId,
    frequency: Frequency,
    creation_date: DateTime<Utc>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    name: String,
}

impl Cycle {
    /// Create cycle covering `[start_date, end_date)`
    #[must_use]
    pub fn new(frequency: Frequency, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            id: CycleId::generate(frequency.as_str()),
            frequency,
            creation_date: Utc::now(),
            start_date,
            end_date,
            name: format!("{} {}", frequency, start_date.format("%Y-%m-%d")),
        }
    }

    /// Check if `date` falls inside the period
    #[must_use]
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start_date <= date && date < self.end_date
    }

    /// Id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &CycleId {
        &self.id
    }

    /// Frequency
    #[inline]
    #[must_use]
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Inclusive period start
    #[inline]
    #[must_use]
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// Exclusive period end
    #[inline]
    #[must_use]
    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    /// Display name, e.g. `monthly 2024-05-01`
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Cycle {
    const KIND: &'static str = "cycle";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn config_id(&self) -> &str {
        self.frequency.as_str()
    }
}
