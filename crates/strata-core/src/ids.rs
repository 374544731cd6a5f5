//! Typed entity identifiers
//!
//! Generated ids have the shape `<PREFIX>_<config_id>_<uuid-v4>`, so an id
//! names its kind and configuration at a glance. Explicit ids can be built
//! from any string.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Kind prefix of generated ids
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh id for an entity realized from `config_id`
            #[must_use]
            pub fn generate(config_id: &str) -> Self {
                Self(format!("{}_{}_{}", Self::PREFIX, config_id, Uuid::new_v4()))
            }

            /// Id as string slice
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the underlying string
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(
    /// Data node identifier
    DataNodeId,
    "DATANODE"
);
entity_id!(
    /// Task identifier
    TaskId,
    "TASK"
);
entity_id!(
    /// Job identifier
    JobId,
    "JOB"
);
entity_id!(
    /// Pipeline identifier
    PipelineId,
    "PIPELINE"
);
entity_id!(
    /// Scenario identifier
    ScenarioId,
    "SCENARIO"
);
entity_id!(
    /// Cycle identifier
    CycleId,
    "CYCLE"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix_and_config() {
        let id = TaskId::generate("clean");
        assert!(id.as_str().starts_with("TASK_clean_"));
        assert_ne!(id, TaskId::generate("clean"));
    }

    #[test]
    fn explicit_ids_round_trip_as_plain_strings() {
        let id = PipelineId::from("p1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p1\"");
        assert_eq!(id.to_string(), "p1");
    }
}
