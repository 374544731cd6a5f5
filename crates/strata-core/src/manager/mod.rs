//! Entity managers
//!
//! [`EntityManager`] carries the behavior every kind shares (load, list,
//! save, delete) over an injected repository. The typed managers add
//! realization, submission and cascading deletion on top of it.

pub mod cycle;
pub mod data;
pub mod job;
pub mod pipeline;
pub mod scenario;
pub mod task;

pub use cycle::CycleManager;
pub use data::DataManager;
pub use job::JobManager;
pub use pipeline::PipelineManager;
pub use scenario::ScenarioManager;
pub use task::TaskManager;

use crate::entities::{Cycle, DataNode, Job, Pipeline, Scenario, Task};
use crate::error::{OrchestratorError, Result};
use crate::ids::{DataNodeId, TaskId};
use crate::scope::{ContextKey, Resolution};
use std::fmt;
use std::sync::Arc;
use strata_store::{Entity, KeyIndex, Registration, Repository};

/// Per-kind behavior the generic manager needs
pub trait ManagedEntity: Entity {
    /// Error reported when `id` is not stored
    fn not_found(id: &str) -> OrchestratorError;

    /// Pipeline, scenario or cycle owning the entity
    fn owner_id(&self) -> Option<&str> {
        None
    }
}

/// Entity realized for a [`ContextKey`] and carrying it in storage
pub(crate) trait KeyedEntity: ManagedEntity {
    fn context_key(&self) -> Option<&ContextKey>;

    fn set_context_key(&mut self, key: ContextKey);
}

macro_rules! keyed_entity {
    ($($kind:ty),*) => {
        $(
            impl KeyedEntity for $kind {
                fn context_key(&self) -> Option<&ContextKey> {
                    <$kind>::context_key(self)
                }

                fn set_context_key(&mut self, key: ContextKey) {
                    <$kind>::set_context_key(self, key);
                }
            }
        )*
    };
}

keyed_entity!(DataNode, Task, Pipeline);

impl ManagedEntity for DataNode {
    fn not_found(id: &str) -> OrchestratorError {
        OrchestratorError::NonExistingDataNode { id: id.to_string() }
    }

    fn owner_id(&self) -> Option<&str> {
        DataNode::owner_id(self)
    }
}

impl ManagedEntity for Task {
    fn not_found(id: &str) -> OrchestratorError {
        OrchestratorError::NonExistingTask { id: id.to_string() }
    }

    fn owner_id(&self) -> Option<&str> {
        Task::owner_id(self)
    }
}

impl ManagedEntity for Pipeline {
    fn not_found(id: &str) -> OrchestratorError {
        OrchestratorError::NonExistingPipeline { id: id.to_string() }
    }

    fn owner_id(&self) -> Option<&str> {
        Pipeline::owner_id(self)
    }
}

impl ManagedEntity for Job {
    fn not_found(id: &str) -> OrchestratorError {
        OrchestratorError::NonExistingJob { id: id.to_string() }
    }
}

impl ManagedEntity for Scenario {
    fn not_found(id: &str) -> OrchestratorError {
        OrchestratorError::NonExistingScenario { id: id.to_string() }
    }

    fn owner_id(&self) -> Option<&str> {
        self.cycle_id().map(|c| c.as_str())
    }
}

impl ManagedEntity for Cycle {
    fn not_found(id: &str) -> OrchestratorError {
        OrchestratorError::NonExistingCycle { id: id.to_string() }
    }
}

/// Generic manager over one entity kind
pub struct EntityManager<E: ManagedEntity> {
    repository: Arc<dyn Repository<E>>,
}

impl<E: ManagedEntity> EntityManager<E> {
    /// Create manager over `repository`
    #[inline]
    #[must_use]
    pub fn new(repository: Arc<dyn Repository<E>>) -> Self {
        Self { repository }
    }

    /// Load entity
    ///
    /// # Errors
    /// The kind's `NonExisting*` error if `id` is not stored
    pub fn get(&self, id: &str) -> Result<E> {
        self.find(id)?.ok_or_else(|| E::not_found(id))
    }

    /// Load entity, `None` if absent
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn find(&self, id: &str) -> Result<Option<E>> {
        Ok(self.repository.load(id)?)
    }

    /// Check if `id` is stored
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.repository.exists(id)?)
    }

    /// Every stored entity
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<E>> {
        Ok(self.repository.load_all()?)
    }

    /// Entities matching `predicate`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by(&self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<E>> {
        Ok(self.repository.load_all_by(predicate)?)
    }

    /// Entities realized from `config_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_config_id(&self, config_id: &str) -> Result<Vec<E>> {
        self.get_all_by(&|e: &E| e.config_id() == config_id)
    }

    /// Entities owned by `owner_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<E>> {
        self.get_all_by(&|e: &E| e.owner_id() == Some(owner_id))
    }

    /// Save, fully replacing any entity stored under the same id
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, entity: &E) -> Result<()> {
        Ok(self.repository.save(entity)?)
    }

    /// Delete entity
    ///
    /// # Errors
    /// The kind's `NonExisting*` error if `id` is not stored
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.remove(id)? {
            Ok(())
        } else {
            Err(E::not_found(id))
        }
    }

    /// Delete entity, returning whether it existed
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.repository.delete(id)?)
    }

    /// Delete several entities, returning how many existed
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_many(&self, ids: &[&str]) -> Result<usize> {
        Ok(self.repository.delete_many(ids)?)
    }

    /// Clear the store
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_all(&self) -> Result<()> {
        Ok(self.repository.delete_all()?)
    }
}

impl<E: ManagedEntity> fmt::Debug for EntityManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("kind", &E::KIND)
            .field("repository", &self.repository)
            .finish()
    }
}

/// Entities one realization call created, deleted again if the call fails
#[derive(Debug, Default)]
pub(crate) struct Created {
    pub(crate) tasks: Vec<TaskId>,
    pub(crate) data_nodes: Vec<DataNodeId>,
}

/// Entity returned by a realization, with whether it was reused
#[derive(Debug, Clone)]
pub(crate) struct Realized<E> {
    pub(crate) entity: E,
    pub(crate) reused: bool,
}

/// Return the entity registered for `resolution`, or create, save and
/// register one.
///
/// An unregistered key is first looked up among stored entities, so an entity
/// saved by an earlier process is adopted rather than duplicated. The entity
/// is saved before its key is published, so a registered key always refers to
/// a stored entity. Keys of non-reusable resolutions are never registered.
pub(crate) fn realize<E, F>(
    store: &EntityManager<E>,
    keys: &KeyIndex<ContextKey>,
    resolution: Resolution,
    create: F,
) -> Result<Realized<E>>
where
    E: KeyedEntity,
    F: FnOnce() -> Result<E>,
{
    if !resolution.reuse {
        let entity = create()?;
        store.set(&entity)?;
        return Ok(Realized {
            entity,
            reused: false,
        });
    }

    let key = resolution.key;
    let mut created = None;
    let registration = keys.get_or_try_insert_with(
        key.clone(),
        |id| store.exists(id),
        || {
            if let Some(stored) = stored_for_key(store, &key)? {
                tracing::debug!(kind = E::KIND, id = %stored.id(), "adopted stored entity");
                return Ok(stored.id().to_string());
            }
            let mut entity = create()?;
            entity.set_context_key(key.clone());
            store.set(&entity)?;
            let id = entity.id().to_string();
            created = Some(entity);
            Ok(id)
        },
    )?;

    match (registration, created) {
        (Registration::Created(_), Some(entity)) => Ok(Realized {
            entity,
            reused: false,
        }),
        (registration, _) => Ok(Realized {
            entity: store.get(registration.id())?,
            reused: true,
        }),
    }
}

fn stored_for_key<E: KeyedEntity>(store: &EntityManager<E>, key: &ContextKey) -> Result<Option<E>> {
    Ok(store
        .get_all_by(&|e: &E| e.context_key() == Some(key))?
        .into_iter()
        .next())
}
