//! Strata Store
//!
//! Kind-agnostic persistence facade for orchestration entities.
//!
//! # Overview
//!
//! The store provides:
//! - **Entity**: the contract every persisted entity implements
//! - **Repository**: load/save/delete/list operations per entity kind
//! - **InMemoryRepository** / **FsRepository**: the two bundled backends
//! - **KeyIndex**: atomic create-if-absent registration of context keys
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_store::{InMemoryRepository, Repository};
//!
//! let repo = InMemoryRepository::<MyEntity>::new();
//! repo.save(&entity)?;
//! assert!(repo.load(entity.id())?.is_some());
//! ```

#![warn(missing_docs)]

pub mod entity;
pub mod error;
pub mod fs;
pub mod key_index;
pub mod memory;
pub mod repository;

// Re-exports
pub use entity::Entity;
pub use error::StoreError;
pub use fs::FsRepository;
pub use key_index::{KeyIndex, Registration};
pub use memory::InMemoryRepository;
pub use repository::Repository;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store operations
    pub use crate::{
        Entity, FsRepository, InMemoryRepository, KeyIndex, Registration, Repository, StoreError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
