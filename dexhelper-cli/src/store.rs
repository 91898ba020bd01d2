use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use dexhelper_core::{ProfileBook, ProfileError, ProfileStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access profile file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Profile book persisted as one JSON file; every write goes straight to disk.
#[derive(Debug)]
pub struct FileProfileStore {
    path: PathBuf,
    book: RefCell<ProfileBook>,
}

impl FileProfileStore {
    /// Open the profile file, starting a fresh book when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let book = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            ProfileBook::from_json(&text)?
        } else {
            log::debug!("profile file {} not found; starting fresh", path.display());
            ProfileBook::default()
        };
        Ok(Self {
            path,
            book: RefCell::new(book),
        })
    }

    pub fn snapshot(&self) -> ProfileBook {
        self.book.borrow().clone()
    }

    /// Apply a profile-management change and persist it.
    ///
    /// # Errors
    ///
    /// Returns the change's error, or an error if the file cannot be written.
    pub fn manage<T>(
        &self,
        change: impl FnOnce(&mut ProfileBook) -> Result<T, ProfileError>,
    ) -> Result<T, StoreError> {
        let outcome = change(&mut self.book.borrow_mut())?;
        self.persist()?;
        Ok(outcome)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = self.book.borrow().to_json()?;
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&self.path, json).map_err(io_error)
    }
}

impl ProfileStore for FileProfileStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.book.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Self::Error> {
        self.book.borrow_mut().set(key, value);
        self.persist()
    }
}
