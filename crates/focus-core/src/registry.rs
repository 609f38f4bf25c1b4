//! Advisory list of distracting applications.
//!
//! Nothing here enforces anything at the OS level; the list is shown to the
//! user during Work sessions. Every edit is written through to the store.

use thiserror::Error;

use crate::types::{BlockedApp, SessionKind};

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("application name cannot be empty")]
    EmptyName,
    #[error("application already listed: {0}")]
    Duplicate(String),
    #[error("application not listed: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistence collaborator for user preferences.
pub trait PreferenceStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_blocked_apps(&self) -> Result<Vec<BlockedApp>, Self::Error>;

    /// Inserts or replaces by name.
    fn save_blocked_app(&mut self, app: &BlockedApp) -> Result<(), Self::Error>;

    fn delete_blocked_app(&mut self, name: &str) -> Result<(), Self::Error>;

    fn load_default_kind(&self) -> Result<Option<SessionKind>, Self::Error>;

    fn save_default_kind(&mut self, kind: SessionKind) -> Result<(), Self::Error>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for &mut S {
    type Error = S::Error;

    fn load_blocked_apps(&self) -> Result<Vec<BlockedApp>, Self::Error> {
        (**self).load_blocked_apps()
    }

    fn save_blocked_app(&mut self, app: &BlockedApp) -> Result<(), Self::Error> {
        (**self).save_blocked_app(app)
    }

    fn delete_blocked_app(&mut self, name: &str) -> Result<(), Self::Error> {
        (**self).delete_blocked_app(name)
    }

    fn load_default_kind(&self) -> Result<Option<SessionKind>, Self::Error> {
        (**self).load_default_kind()
    }

    fn save_default_kind(&mut self, kind: SessionKind) -> Result<(), Self::Error> {
        (**self).save_default_kind(kind)
    }
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> RegistryError {
    RegistryError::Store(Box::new(err))
}

/// In-memory view of the blocked-app list backed by a [`PreferenceStore`].
#[derive(Debug)]
pub struct BlockedAppRegistry<S> {
    store: S,
    apps: Vec<BlockedApp>,
}

impl<S: PreferenceStore> BlockedAppRegistry<S> {
    /// Reads the persisted list.
    pub fn open(store: S) -> Result<Self, RegistryError> {
        let apps = store.load_blocked_apps().map_err(store_err)?;
        Ok(Self { store, apps })
    }

    pub fn apps(&self) -> &[BlockedApp] {
        &self.apps
    }

    /// Names of apps currently marked blocked, for advisory display.
    pub fn advisories(&self) -> Vec<&str> {
        self.apps
            .iter()
            .filter(|app| app.blocked)
            .map(|app| app.name.as_str())
            .collect()
    }

    pub fn add(&mut self, name: &str, category: &str) -> Result<&BlockedApp, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.position(name).is_some() {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        let app = BlockedApp {
            name: name.to_string(),
            category: category.trim().to_string(),
            blocked: true,
        };
        self.store.save_blocked_app(&app).map_err(store_err)?;
        self.apps.push(app);
        Ok(&self.apps[self.apps.len() - 1])
    }

    pub fn remove(&mut self, name: &str) -> Result<BlockedApp, RegistryError> {
        let index = self
            .position(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let stored_name = self.apps[index].name.clone();
        self.store
            .delete_blocked_app(&stored_name)
            .map_err(store_err)?;
        Ok(self.apps.remove(index))
    }

    pub fn set_blocked(&mut self, name: &str, blocked: bool) -> Result<&BlockedApp, RegistryError> {
        let index = self
            .position(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let mut updated = self.apps[index].clone();
        updated.blocked = blocked;
        self.store.save_blocked_app(&updated).map_err(store_err)?;
        self.apps[index] = updated;
        Ok(&self.apps[index])
    }

    pub fn default_kind(&self) -> Result<SessionKind, RegistryError> {
        Ok(self
            .store
            .load_default_kind()
            .map_err(store_err)?
            .unwrap_or_default())
    }

    pub fn set_default_kind(&mut self, kind: SessionKind) -> Result<(), RegistryError> {
        self.store.save_default_kind(kind).map_err(store_err)
    }

    /// Names compare case-insensitively.
    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.apps
            .iter()
            .position(|app| app.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[derive(Debug, Default)]
    struct MemoryStore {
        apps: Vec<BlockedApp>,
        default_kind: Option<SessionKind>,
        writes: usize,
    }

    impl PreferenceStore for MemoryStore {
        type Error = Infallible;

        fn load_blocked_apps(&self) -> Result<Vec<BlockedApp>, Self::Error> {
            Ok(self.apps.clone())
        }

        fn save_blocked_app(&mut self, app: &BlockedApp) -> Result<(), Self::Error> {
            self.writes += 1;
            self.apps.retain(|existing| existing.name != app.name);
            self.apps.push(app.clone());
            Ok(())
        }

        fn delete_blocked_app(&mut self, name: &str) -> Result<(), Self::Error> {
            self.writes += 1;
            self.apps.retain(|existing| existing.name != name);
            Ok(())
        }

        fn load_default_kind(&self) -> Result<Option<SessionKind>, Self::Error> {
            Ok(self.default_kind)
        }

        fn save_default_kind(&mut self, kind: SessionKind) -> Result<(), Self::Error> {
            self.writes += 1;
            self.default_kind = Some(kind);
            Ok(())
        }
    }

    #[test]
    fn every_edit_is_written_through() {
        let mut registry = BlockedAppRegistry::open(MemoryStore::default()).unwrap();
        registry.add("Twitter", "social").unwrap();
        registry.add("YouTube", "video").unwrap();
        registry.set_blocked("twitter", false).unwrap();
        registry.remove("YOUTUBE").unwrap();

        assert_eq!(registry.store.writes, 4);
        assert_eq!(registry.store.apps.len(), 1);
        assert!(!registry.store.apps[0].blocked);
        assert_eq!(registry.apps(), registry.store.apps.as_slice());
    }

    #[test]
    fn advisories_list_only_blocked_apps() {
        let mut registry = BlockedAppRegistry::open(MemoryStore::default()).unwrap();
        registry.add("Reddit", "social").unwrap();
        registry.add("Slack", "chat").unwrap();
        registry.set_blocked("Slack", false).unwrap();
        assert_eq!(registry.advisories(), vec!["Reddit"]);
    }

    #[test]
    fn rejects_blank_and_duplicate_names() {
        let mut registry = BlockedAppRegistry::open(MemoryStore::default()).unwrap();
        assert!(matches!(
            registry.add("   ", "x"),
            Err(RegistryError::EmptyName)
        ));
        registry.add("Reddit", "social").unwrap();
        assert!(matches!(
            registry.add("reddit", "social"),
            Err(RegistryError::Duplicate(_))
        ));
        assert!(matches!(
            registry.remove("Netflix"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn default_kind_falls_back_to_work() {
        let mut registry = BlockedAppRegistry::open(MemoryStore::default()).unwrap();
        assert_eq!(registry.default_kind().unwrap(), SessionKind::Work);
        registry.set_default_kind(SessionKind::Break).unwrap();
        assert_eq!(registry.default_kind().unwrap(), SessionKind::Break);
    }
}
