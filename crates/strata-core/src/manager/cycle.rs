//! Cycle manager

use crate::config::Frequency;
use crate::entities::Cycle;
use crate::error::{OrchestratorError, Result};
use crate::ids::CycleId;
use crate::manager::EntityManager;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use strata_store::{KeyIndex, Repository};

/// One cycle per frequency and period start
#[derive(Debug)]
pub struct CycleManager {
    store: EntityManager<Cycle>,
    keys: KeyIndex<(Frequency, DateTime<Utc>)>,
}

impl CycleManager {
    /// Create manager
    #[must_use]
    pub fn new(repository: Arc<dyn Repository<Cycle>>) -> Self {
        Self {
            store: EntityManager::new(repository),
            keys: KeyIndex::new(),
        }
    }

    /// The cycle of `frequency` whose period contains `date`, created on
    /// first request.
    ///
    /// A cycle already in the store for the same period is adopted, so a
    /// reopened filesystem store keeps its cycles.
    ///
    /// # Errors
    /// `InvalidCycleDate` if the period is not representable, or a store failure
    pub fn get_or_create(&self, frequency: Frequency, date: DateTime<Utc>) -> Result<Cycle> {
        let (start, end) =
            frequency
                .period(date)
                .ok_or_else(|| OrchestratorError::InvalidCycleDate {
                    date: date.to_rfc3339(),
                })?;

        let registration = self.keys.get_or_try_insert_with(
            (frequency, start),
            |id| self.store.exists(id),
            || {
                let stored = self.store.get_all_by(&|c: &Cycle| {
                    c.frequency() == frequency && c.start_date() == start
                })?;
                if let Some(cycle) = stored.into_iter().next() {
                    return Ok(cycle.id().to_string());
                }
                let cycle = Cycle::new(frequency, start, end);
                self.store.set(&cycle)?;
                tracing::debug!(cycle_id = %cycle.id(), name = cycle.name(), "cycle created");
                Ok(cycle.id().to_string())
            },
        )?;
        self.store.get(registration.id())
    }

    /// Load cycle
    ///
    /// # Errors
    /// `NonExistingCycle` if not stored
    pub fn get(&self, id: &CycleId) -> Result<Cycle> {
        self.store.get(id.as_str())
    }

    /// Check if stored
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn exists(&self, id: &CycleId) -> Result<bool> {
        self.store.exists(id.as_str())
    }

    /// Every cycle
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<Cycle>> {
        self.store.get_all()
    }

    /// Save, replacing the stored copy
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, cycle: &Cycle) -> Result<()> {
        self.store.set(cycle)
    }

    /// Delete the cycle entity only
    ///
    /// # Errors
    /// `NonExistingCycle` if not stored
    pub fn delete(&self, id: &CycleId) -> Result<()> {
        self.keys.remove_id(id.as_str());
        self.store.delete(id.as_str())
    }

    /// Clear the store
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_all(&self) -> Result<()> {
        self.keys.clear();
        self.store.delete_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use strata_store::InMemoryRepository;

    fn manager() -> CycleManager {
        CycleManager::new(Arc::new(InMemoryRepository::new()))
    }

    #[test]
    fn dates_in_one_period_share_a_cycle() {
        let cycles = manager();
        let monday = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 0).unwrap();
        let next_monday = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();

        let a = cycles.get_or_create(Frequency::Weekly, monday).unwrap();
        let b = cycles.get_or_create(Frequency::Weekly, sunday).unwrap();
        let c = cycles.get_or_create(Frequency::Weekly, next_monday).unwrap();

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert!(a.contains(sunday));
        assert!(!a.contains(next_monday));
        assert_eq!(cycles.get_all().unwrap().len(), 2);
    }

    #[test]
    fn frequencies_do_not_share_cycles() {
        let cycles = manager();
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let daily = cycles.get_or_create(Frequency::Daily, date).unwrap();
        let yearly = cycles.get_or_create(Frequency::Yearly, date).unwrap();
        assert_ne!(daily.id(), yearly.id());
        assert_eq!(daily.start_date(), yearly.start_date());
    }

    #[test]
    fn stored_cycle_is_adopted() {
        let repository: Arc<dyn Repository<Cycle>> = Arc::new(InMemoryRepository::new());
        let date = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        let first = CycleManager::new(Arc::clone(&repository))
            .get_or_create(Frequency::Monthly, date)
            .unwrap();

        let again = CycleManager::new(repository)
            .get_or_create(Frequency::Monthly, date)
            .unwrap();
        assert_eq!(first.id(), again.id());
    }

    #[test]
    fn deleted_cycle_is_recreated() {
        let cycles = manager();
        let date = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        let first = cycles.get_or_create(Frequency::Daily, date).unwrap();
        cycles.delete(first.id()).unwrap();

        assert!(matches!(
            cycles.get(first.id()),
            Err(OrchestratorError::NonExistingCycle { .. })
        ));
        let second = cycles.get_or_create(Frequency::Daily, date).unwrap();
        assert_ne!(first.id(), second.id());
    }
}
