//! Filesystem repository
//!
//! Stores one pretty-printed JSON document per entity under
//! `<root>/<kind>/<id>.json`. Writes go through a temporary file followed by
//! a rename so a reader never observes a half-written entity.

use crate::entity::Entity;
use crate::error::StoreError;
use crate::repository::Repository;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// Repository persisting entities as JSON files
#[derive(Debug)]
pub struct FsRepository<E: Entity> {
    dir: PathBuf,
    _kind: PhantomData<fn() -> E>,
}

impl<E: Entity> FsRepository<E> {
    /// Create repository rooted at `root`, creating `<root>/<kind>` if needed
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = root.as_ref().join(E::KIND);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self {
            dir,
            _kind: PhantomData,
        })
    }

    /// Directory holding this kind's documents
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let invalid = id.is_empty()
            || id.contains(['/', '\\'])
            || id == "."
            || id == ".."
            || id.starts_with('.');
        if invalid {
            return Err(StoreError::InvalidId {
                kind: E::KIND,
                id: id.to_string(),
            });
        }
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }

    fn read_file(&self, path: &Path, id: &str) -> Result<Option<E>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                kind: E::KIND,
                id: id.to_string(),
                source,
            })
    }

    fn document_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl<E: Entity> Repository<E> for FsRepository<E> {
    fn load(&self, id: &str) -> Result<Option<E>, StoreError> {
        let path = self.path_for(id)?;
        self.read_file(&path, id)
    }

    fn load_all(&self) -> Result<Vec<E>, StoreError> {
        let mut entities = Vec::new();
        for path in self.document_paths()? {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            // A concurrent delete between listing and reading is not an error
            if let Some(entity) = self.read_file(&path, &id)? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    fn save(&self, entity: &E) -> Result<(), StoreError> {
        let path = self.path_for(entity.id())?;
        let body =
            serde_json::to_vec_pretty(entity).map_err(|source| StoreError::Serialization {
                kind: E::KIND,
                id: entity.id().to_string(),
                source,
            })?;

        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, body).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
        tracing::trace!(kind = E::KIND, id = entity.id(), "saved entity");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        for path in self.document_paths()? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(id)?.is_file())
    }
}
