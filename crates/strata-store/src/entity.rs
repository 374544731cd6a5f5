//! Entity contract shared by every repository backend

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A persisted, id-addressable orchestration entity.
///
/// Repositories store whole entities: saving an entity whose id already
/// exists replaces every field of the stored copy.
pub trait Entity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Kind name, used for storage folders and diagnostics
    const KIND: &'static str;

    /// Unique generated id
    fn id(&self) -> &str;

    /// Id of the configuration this entity was realized from
    fn config_id(&self) -> &str;
}
