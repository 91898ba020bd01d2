//! Named profiles, each a small key/value document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;
use thiserror::Error;

use crate::ProfileStore;
use crate::constants::DEFAULT_PROFILE;

/// Errors raised by profile management and collection updates.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("species id {0} is not in the collection")]
    UnknownSpecies(u32),
    #[error("profile {0:?} does not exist")]
    UnknownProfile(String),
    #[error("profile {0:?} already exists")]
    DuplicateProfile(String),
    #[error("profile name must not be empty")]
    EmptyName,
    #[error("cannot delete the only remaining profile")]
    LastProfile,
    #[error("stored profile data is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Every profile and which one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBook {
    active: String,
    profiles: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Default for ProfileBook {
    fn default() -> Self {
        Self {
            active: DEFAULT_PROFILE.to_string(),
            profiles: BTreeMap::from([(DEFAULT_PROFILE.to_string(), BTreeMap::new())]),
        }
    }
}

impl ProfileBook {
    /// Load a profile book from JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let mut book: Self = serde_json::from_str(json).map_err(ProfileError::Malformed)?;
        if book.profiles.is_empty() {
            book = Self::default();
        } else if !book.profiles.contains_key(&book.active) {
            log::warn!("active profile {:?} missing; falling back", book.active);
            book.active = book.profiles.keys().next().cloned().unwrap_or_default();
        }
        Ok(book)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProfileError> {
        serde_json::to_string_pretty(self).map_err(ProfileError::Malformed)
    }

    #[must_use]
    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Create an empty profile and make it active.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or already taken.
    pub fn create(&mut self, name: &str) -> Result<(), ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if self.profiles.contains_key(name) {
            return Err(ProfileError::DuplicateProfile(name.to_string()));
        }
        self.profiles.insert(name.to_string(), BTreeMap::new());
        self.active = name.to_string();
        Ok(())
    }

    /// Delete a profile. Deleting the active profile activates the first
    /// remaining one.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is unknown or the last one.
    pub fn delete(&mut self, name: &str) -> Result<(), ProfileError> {
        if !self.profiles.contains_key(name) {
            return Err(ProfileError::UnknownProfile(name.to_string()));
        }
        if self.profiles.len() == 1 {
            return Err(ProfileError::LastProfile);
        }
        self.profiles.remove(name);
        if self.active == name {
            self.active = self.profiles.keys().next().cloned().unwrap_or_default();
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the profile is unknown.
    pub fn switch(&mut self, name: &str) -> Result<(), ProfileError> {
        if !self.profiles.contains_key(name) {
            return Err(ProfileError::UnknownProfile(name.to_string()));
        }
        self.active = name.to_string();
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.profiles.get(&self.active).and_then(|data| data.get(key))
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.profiles
            .entry(self.active.clone())
            .or_default()
            .insert(key.to_string(), value);
    }
}

/// In-memory [`ProfileStore`] backed by a [`ProfileBook`].
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    book: RefCell<ProfileBook>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new(book: ProfileBook) -> Self {
        Self {
            book: RefCell::new(book),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ProfileBook {
        self.book.borrow().clone()
    }

    /// Apply a profile-management change.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `change`.
    pub fn manage<T>(
        &self,
        change: impl FnOnce(&mut ProfileBook) -> Result<T, ProfileError>,
    ) -> Result<T, ProfileError> {
        change(&mut self.book.borrow_mut())
    }
}

impl ProfileStore for MemoryProfileStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.book.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Self::Error> {
        self.book.borrow_mut().set(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_are_scoped_to_active_profile() {
        let mut book = ProfileBook::default();
        book.set("pokedexStatus", json!({"1": true}));
        book.create("Alt").unwrap();
        assert_eq!(book.active(), "Alt");
        assert!(book.get("pokedexStatus").is_none());
        book.switch(DEFAULT_PROFILE).unwrap();
        assert_eq!(book.get("pokedexStatus"), Some(&json!({"1": true})));
    }

    #[test]
    fn delete_guards_last_and_moves_active() {
        let mut book = ProfileBook::default();
        assert!(matches!(
            book.delete(DEFAULT_PROFILE),
            Err(ProfileError::LastProfile)
        ));
        book.create("Alt").unwrap();
        book.switch("Alt").unwrap();
        book.delete("Alt").unwrap();
        assert_eq!(book.active(), DEFAULT_PROFILE);
        assert!(matches!(
            book.switch("Ghost"),
            Err(ProfileError::UnknownProfile(_))
        ));
        assert!(matches!(book.create("  "), Err(ProfileError::EmptyName)));
        assert!(matches!(
            book.create(DEFAULT_PROFILE),
            Err(ProfileError::DuplicateProfile(_))
        ));
    }

    #[test]
    fn book_roundtrips_and_repairs_active() {
        let json = r#"{"active": "Gone", "profiles": {"Main": {}, "Side": {}}}"#;
        let book = ProfileBook::from_json(json).unwrap();
        assert_eq!(book.active(), "Main");
        let again = ProfileBook::from_json(&book.to_json().unwrap()).unwrap();
        assert_eq!(again, book);
        assert_eq!(again.names().collect::<Vec<_>>(), vec!["Main", "Side"]);
    }

    #[test]
    fn memory_store_implements_contract() {
        let store = MemoryProfileStore::default();
        store.set("k", json!(3)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(3)));
        store.manage(|book| book.create("Other")).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.manage(|book| book.switch(DEFAULT_PROFILE)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(3)));
        store.manage(|book| book.switch("Other")).unwrap();
        assert_eq!(store.snapshot().active(), "Other");
    }
}
