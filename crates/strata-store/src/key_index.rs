//! Context key registration
//!
//! Maps a derived context key to the id of the entity realized for it. The
//! check-then-create sequence runs while the key's shard is locked, so two
//! concurrent callers resolving the same key can never both create.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;

/// Outcome of [`KeyIndex::get_or_try_insert_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A live entity was already registered under the key
    Existing(String),
    /// The entity was created and registered by this call
    Created(String),
}

impl Registration {
    /// Registered entity id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Existing(id) | Self::Created(id) => id,
        }
    }

    /// Whether the call created the entity
    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Concurrent key → entity id index
#[derive(Debug)]
pub struct KeyIndex<K: Eq + Hash> {
    entries: DashMap<K, String>,
}

impl<K: Eq + Hash + Clone> KeyIndex<K> {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Id registered under `key`, if any
    #[must_use]
    pub fn get(&self, key: &K) -> Option<String> {
        self.entries.get(key).map(|id| id.value().clone())
    }

    /// Resolve `key`, creating and registering the entity when absent.
    ///
    /// `is_live` is asked whether a registered id still refers to a stored
    /// entity; a stale registration is replaced as if the key were absent.
    /// When `create` fails nothing is registered.
    ///
    /// Must not be re-entered for the same index from inside `create`.
    ///
    /// # Errors
    /// Propagates the first error from `is_live` or `create`
    pub fn get_or_try_insert_with<Err>(
        &self,
        key: K,
        is_live: impl FnOnce(&str) -> Result<bool, Err>,
        create: impl FnOnce() -> Result<String, Err>,
    ) -> Result<Registration, Err> {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if is_live(occupied.get())? {
                    return Ok(Registration::Existing(occupied.get().clone()));
                }
                let id = create()?;
                occupied.insert(id.clone());
                Ok(Registration::Created(id))
            }
            Entry::Vacant(vacant) => {
                let id = create()?;
                vacant.insert(id.clone());
                Ok(Registration::Created(id))
            }
        }
    }

    /// Drop every key registered for `id`, returning how many were removed
    pub fn remove_id(&self, id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, registered| registered != id);
        before - self.entries.len()
    }

    /// Remove all registrations
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of registered keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
