//! In-memory repository
//!
//! Keeps entities in insertion order so listings are reproducible, which the
//! schedulers and tests rely on.

use crate::entity::Entity;
use crate::error::StoreError;
use crate::repository::Repository;
use indexmap::IndexMap;
use parking_lot::RwLock;

/// Process-local repository backed by an ordered map
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity> {
    entities: RwLock<IndexMap<String, E>>,
}

impl<E: Entity> InMemoryRepository<E> {
    /// Create empty repository
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(IndexMap::new()),
        }
    }

    /// Number of stored entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Check if repository is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    fn load(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.entities.read().get(id).cloned())
    }

    fn load_all(&self) -> Result<Vec<E>, StoreError> {
        Ok(self.entities.read().values().cloned().collect())
    }

    fn save(&self, entity: &E) -> Result<(), StoreError> {
        // Overwrites in place so an updated entity keeps its listing position
        self.entities
            .write()
            .insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.entities.write().shift_remove(id).is_some())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.entities.write().clear();
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.entities.read().contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        config_id: String,
        body: String,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }

        fn config_id(&self) -> &str {
            &self.config_id
        }
    }

    fn note(id: &str, config_id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            config_id: config_id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn save_and_load() {
        let repo = InMemoryRepository::<Note>::new();
        assert!(repo.load("n1").unwrap().is_none());

        repo.save(&note("n1", "cfg", "hello")).unwrap();
        assert_eq!(repo.load("n1").unwrap(), Some(note("n1", "cfg", "hello")));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn save_overwrites_every_field() {
        let repo = InMemoryRepository::<Note>::new();
        repo.save(&note("n1", "cfg_a", "first")).unwrap();
        repo.save(&note("n1", "cfg_b", "second")).unwrap();

        let loaded = repo.load("n1").unwrap().unwrap();
        assert_eq!(loaded.config_id, "cfg_b");
        assert_eq!(loaded.body, "second");
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn load_all_keeps_insertion_order() {
        let repo = InMemoryRepository::<Note>::new();
        repo.save(&note("b", "cfg", "")).unwrap();
        repo.save(&note("a", "cfg", "")).unwrap();
        repo.save(&note("c", "other", "")).unwrap();

        let ids: Vec<String> = repo.load_all().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        let by_cfg = repo.load_all_by(&|n: &Note| n.config_id == "cfg").unwrap();
        assert_eq!(by_cfg.len(), 2);
    }

    #[test]
    fn delete_and_delete_many() {
        let repo = InMemoryRepository::<Note>::new();
        for id in ["a", "b", "c"] {
            repo.save(&note(id, "cfg", "")).unwrap();
        }

        assert!(repo.delete("a").unwrap());
        assert!(!repo.delete("a").unwrap());
        assert_eq!(repo.delete_many(&["b", "c", "missing"]).unwrap(), 2);
        assert!(repo.is_empty());
    }

    #[test]
    fn delete_all_clears() {
        let repo = InMemoryRepository::<Note>::new();
        repo.save(&note("a", "cfg", "")).unwrap();
        repo.delete_all().unwrap();
        assert!(!repo.exists("a").unwrap());
    }
}
