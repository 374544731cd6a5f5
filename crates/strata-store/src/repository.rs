//! Repository contract
//!
//! A repository owns the persisted copies of one entity kind. It carries no
//! business logic: managers decide what to store, repositories only store it.

use crate::entity::Entity;
use crate::error::StoreError;
use std::fmt::Debug;

/// Storage backend for a single entity kind
pub trait Repository<E: Entity>: Send + Sync + Debug {
    /// Load an entity by id, `None` when absent
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn load(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Load every stored entity
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn load_all(&self) -> Result<Vec<E>, StoreError>;

    /// Save an entity, fully replacing any entity stored under the same id
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn save(&self, entity: &E) -> Result<(), StoreError>;

    /// Delete an entity, returning whether it existed
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Delete every stored entity
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn delete_all(&self) -> Result<(), StoreError>;

    /// Load every entity matching `predicate`
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn load_all_by(&self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<E>, StoreError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|e| predicate(e))
            .collect())
    }

    /// Delete several entities, returning how many existed
    ///
    /// # Errors
    /// Returns error on the first failed deletion
    fn delete_many(&self, ids: &[&str]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for id in ids {
            if self.delete(id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Check whether an entity is stored under `id`
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.load(id)?.is_some())
    }
}
