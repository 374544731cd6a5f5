//! Data node manager

use crate::config::DataNodeConfig;
use crate::connector::Connector;
use crate::entities::DataNode;
use crate::error::{OrchestratorError, Result};
use crate::ids::{DataNodeId, JobId};
use crate::manager::{realize, EntityManager, Realized};
use crate::registry::ConnectorRegistry;
use crate::scope::{self, ContextKey, ExecutionContext};
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use strata_store::{KeyIndex, Repository};

/// Realizes data node configs and gives access to their values
#[derive(Debug)]
pub struct DataManager {
    store: EntityManager<DataNode>,
    keys: KeyIndex<ContextKey>,
    connectors: Arc<ConnectorRegistry>,
    write_locks: DashMap<DataNodeId, Arc<Mutex<()>>>,
}

impl DataManager {
    /// Create manager
    #[must_use]
    pub fn new(repository: Arc<dyn Repository<DataNode>>, connectors: Arc<ConnectorRegistry>) -> Self {
        Self {
            store: EntityManager::new(repository),
            keys: KeyIndex::new(),
            connectors,
            write_locks: DashMap::new(),
        }
    }

    /// Reuse or create the data node for `config` in `context`.
    ///
    /// A created node receives the config's default data, if any. When the
    /// node cannot be saved its default value is removed again.
    ///
    /// # Errors
    /// `UnknownConnector` if the storage type is not registered, or a
    /// connector/store failure
    pub fn get_or_create(
        &self,
        config: &DataNodeConfig,
        context: &ExecutionContext,
    ) -> Result<DataNode> {
        Ok(self.realize_node(config, context)?.entity)
    }

    fn realize_node(
        &self,
        config: &DataNodeConfig,
        context: &ExecutionContext,
    ) -> Result<Realized<DataNode>> {
        let connector = self.connector(config.storage_type())?;
        let resolution = scope::resolve(config.id(), config.scope(), context);

        let mut written = None;
        let result = realize(&self.store, &self.keys, resolution, || {
            let mut node = DataNode::from_config(config, context.owner_for(config.scope()));
            if let Some(value) = config.default_data() {
                write_value(connector.as_ref(), &node, value.clone())?;
                written = Some(node.id().clone());
                node.record_edit(None);
            }
            Ok(node)
        });
        let realized = match result {
            Ok(realized) => realized,
            Err(e) => {
                if let Some(id) = written {
                    if let Err(remove) = connector.remove(&id) {
                        tracing::warn!(data_node_id = %id, error = %remove, "default value left behind");
                    }
                }
                return Err(e);
            }
        };

        tracing::debug!(
            data_node_id = %realized.entity.id(),
            config_id = config.id(),
            scope = %config.scope(),
            reused = realized.reused,
            "resolved data node"
        );
        Ok(realized)
    }

    /// Realize each distinct config once, keyed by config id in
    /// first-appearance order.
    ///
    /// Every storage type is checked before anything is created, and the
    /// nodes this call created are deleted again if a later one fails.
    ///
    /// # Errors
    /// `UnknownConnector`, or the first failure of
    /// [`DataManager::get_or_create`]
    pub fn get_or_create_many<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a Arc<DataNodeConfig>>,
        context: &ExecutionContext,
    ) -> Result<IndexMap<String, DataNode>> {
        let mut created = Vec::new();
        match self.realize_many(configs, context, &mut created) {
            Ok(nodes) => Ok(nodes),
            Err(e) => {
                self.discard(&created);
                Err(e)
            }
        }
    }

    /// [`DataManager::get_or_create_many`] without the rollback; ids of the
    /// nodes it creates are appended to `created`
    pub(crate) fn realize_many<'a>(
        &self,
        configs: impl IntoIterator<Item = &'a Arc<DataNodeConfig>>,
        context: &ExecutionContext,
        created: &mut Vec<DataNodeId>,
    ) -> Result<IndexMap<String, DataNode>> {
        let configs: Vec<&Arc<DataNodeConfig>> = configs.into_iter().collect();
        for config in &configs {
            self.connector(config.storage_type())?;
        }

        let mut nodes = IndexMap::new();
        for config in configs {
            if nodes.contains_key(config.id()) {
                continue;
            }
            let realized = self.realize_node(config, context)?;
            if !realized.reused {
                created.push(realized.entity.id().clone());
            }
            nodes.insert(config.id().to_string(), realized.entity);
        }
        Ok(nodes)
    }

    /// Delete nodes created by a failed realization
    pub(crate) fn discard(&self, ids: &[DataNodeId]) {
        for id in ids {
            match self.delete(id) {
                Ok(()) => tracing::debug!(data_node_id = %id, "discarded data node"),
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!(data_node_id = %id, error = %e, "cannot discard data node"),
            }
        }
    }

    /// Current value of a data node
    ///
    /// # Errors
    /// `NonExistingDataNode` if not stored, `NoData` if never written
    pub fn read(&self, id: &DataNodeId) -> Result<Value> {
        let node = self.get(id)?;
        let connector = self.connector(node.storage_type())?;
        connector
            .read(id)
            .map_err(|e| connector_error(&node, &e))?
            .ok_or_else(|| OrchestratorError::NoData { id: id.to_string() })
    }

    /// Write a value, recording the edit.
    ///
    /// Writes to one node are serialized, so concurrent writers never lose
    /// each other's edits.
    ///
    /// # Errors
    /// `NonExistingDataNode` if not stored, or a connector/store failure
    pub fn write(&self, id: &DataNodeId, value: Value, job_id: Option<&JobId>) -> Result<DataNode> {
        let lock = self.write_lock(id);
        let _guard = lock.lock();
        let mut node = self.get(id)?;
        let connector = self.connector(node.storage_type())?;
        write_value(connector.as_ref(), &node, value)?;
        node.record_edit(job_id.cloned());
        self.store.set(&node)?;
        Ok(node)
    }

    /// Load data node
    ///
    /// # Errors
    /// `NonExistingDataNode` if not stored
    pub fn get(&self, id: &DataNodeId) -> Result<DataNode> {
        self.store.get(id.as_str())
    }

    /// Load data node, `None` if absent
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn find(&self, id: &DataNodeId) -> Result<Option<DataNode>> {
        self.store.find(id.as_str())
    }

    /// Check if stored
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn exists(&self, id: &DataNodeId) -> Result<bool> {
        self.store.exists(id.as_str())
    }

    /// Every data node
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<DataNode>> {
        self.store.get_all()
    }

    /// Data nodes realized from `config_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_config_id(&self, config_id: &str) -> Result<Vec<DataNode>> {
        self.store.get_all_by_config_id(config_id)
    }

    /// Data nodes owned by `owner_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<DataNode>> {
        self.store.get_all_by_owner(owner_id)
    }

    /// Save, replacing the stored copy
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, node: &DataNode) -> Result<()> {
        self.store.set(node)
    }

    /// Delete a data node, its value and its key registration
    ///
    /// # Errors
    /// `NonExistingDataNode` if not stored
    pub fn delete(&self, id: &DataNodeId) -> Result<()> {
        let node = self.get(id)?;
        if let Some(connector) = self.connectors.get(node.storage_type()) {
            connector
                .remove(id)
                .map_err(|e| connector_error(&node, &e))?;
        }
        self.keys.remove_id(id.as_str());
        self.write_locks.remove(id);
        self.store.delete(id.as_str())
    }

    /// Delete several data nodes, skipping absent ones; returns how many existed
    ///
    /// # Errors
    /// First connector or store failure
    pub fn delete_many(&self, ids: &[DataNodeId]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            match self.delete(id) {
                Ok(()) => removed += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Delete every data node owned by `owner_id`
    ///
    /// # Errors
    /// First connector or store failure
    pub fn delete_by_owner(&self, owner_id: &str) -> Result<usize> {
        let ids: Vec<DataNodeId> = self
            .get_all_by_owner(owner_id)?
            .into_iter()
            .map(|n| n.id().clone())
            .collect();
        self.delete_many(&ids)
    }

    /// Delete every data node and value
    ///
    /// # Errors
    /// First connector or store failure
    pub fn delete_all(&self) -> Result<()> {
        let ids: Vec<DataNodeId> = self
            .get_all()?
            .into_iter()
            .map(|n| n.id().clone())
            .collect();
        self.delete_many(&ids)?;
        self.keys.clear();
        self.write_locks.clear();
        self.store.delete_all()
    }

    fn write_lock(&self, id: &DataNodeId) -> Arc<Mutex<()>> {
        Arc::clone(self.write_locks.entry(id.clone()).or_default().value())
    }

    fn connector(&self, storage_type: &str) -> Result<Arc<dyn Connector>> {
        self.connectors
            .get(storage_type)
            .ok_or_else(|| OrchestratorError::UnknownConnector {
                storage_type: storage_type.to_string(),
            })
    }
}

fn write_value(connector: &dyn Connector, node: &DataNode, value: Value) -> Result<()> {
    connector
        .write(node.id(), value)
        .map_err(|e| connector_error(node, &e))
}

fn connector_error(node: &DataNode, error: &anyhow::Error) -> OrchestratorError {
    OrchestratorError::Connector {
        storage_type: node.storage_type().to_string(),
        id: node.id().to_string(),
        message: format!("{error:#}"),
    }
}
