use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::package::{validate_package_name, PackageUrlInfo};
use crate::util::{load_json_or_default, lock_path_for, save_json};

/// Contents of `pinmap.toml.lock`: the last resolution of every package, keyed by bare name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct PackagesLock {
    packages: BTreeMap<String, PackageUrlInfo>,
}

impl PackagesLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the lock file next to `config_path`. A missing file is an empty lock.
    ///
    /// # Errors
    /// Fails with [`Error::InvalidPackageName`] if any key is not a bare package name.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let lock: PackagesLock = load_json_or_default(lock_path_for(config_path))?;
        for name in lock.packages.keys() {
            validate_package_name(name)?;
        }
        Ok(lock)
    }

    /// Overwrites the lock file next to `config_path` with this lock.
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        save_json(lock_path_for(config_path), self)
    }

    pub fn get(&self, name: &str) -> Option<&PackageUrlInfo> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Replaces the entry for `name`. Fails if `name` is not a bare package name.
    pub fn insert(&mut self, name: &str, info: PackageUrlInfo) -> Result<Option<PackageUrlInfo>> {
        validate_package_name(name)?;
        Ok(self.packages.insert(name.to_string(), info))
    }

    pub fn remove(&mut self, name: &str) -> Option<PackageUrlInfo> {
        self.packages.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PackageUrlInfo)> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Serializes load-modify-save cycles on one project's lock file.
#[derive(Debug)]
pub struct LockStore {
    config_path: PathBuf,
    guard: Mutex<()>,
}

impl LockStore {
    pub fn new<P: Into<PathBuf>>(config_path: P) -> Self {
        Self {
            config_path: config_path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        lock_path_for(&self.config_path)
    }

    pub fn load(&self) -> Result<PackagesLock> {
        let _guard = self.acquire();
        PackagesLock::load(&self.config_path)
    }

    /// Loads the lock, applies `f` and writes the result back, all under the store's mutex.
    /// Nothing is written when `f` fails.
    pub fn update<R>(&self, f: impl FnOnce(&mut PackagesLock) -> Result<R>) -> Result<R> {
        let guard = self.acquire();
        self.update_locked(&guard, f)
    }

    pub(crate) fn acquire(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Same as [`LockStore::update`] for callers already holding the guard.
    pub(crate) fn update_locked<R>(
        &self,
        _guard: &MutexGuard<'_, ()>,
        f: impl FnOnce(&mut PackagesLock) -> Result<R>,
    ) -> Result<R> {
        let mut lock = PackagesLock::load(&self.config_path)?;
        let result = f(&mut lock)?;
        lock.save(&self.config_path)?;
        Ok(result)
    }

    pub(crate) fn load_locked(&self, _guard: &MutexGuard<'_, ()>) -> Result<PackagesLock> {
        PackagesLock::load(&self.config_path)
    }

    pub(crate) fn save_locked(&self, _guard: &MutexGuard<'_, ()>, lock: &PackagesLock) -> Result<()> {
        lock.save(&self.config_path)
    }
}
