use std::path::PathBuf;
use std::sync::MutexGuard;
use crate::error::Result;
use crate::http::{ReqwestTransport, Transport};
use crate::import_map::{ImportMap, ImportMapStore};
use crate::lock::{LockStore, PackagesLock};
use crate::package::{PackageUrlInfo, Source};
use crate::provider::ProviderClient;

/// Upper bound on provider requests in flight during [`Resolver::sync`].
pub const MAX_PARALLEL_RESOLUTIONS: usize = 8;

/// Result of resolving one package during a sync.
#[derive(Debug)]
pub struct SyncOutcome {
    pub name: String,
    pub provider: Source,
    /// `true` when the entry came from the lock file without a network request.
    pub cached: bool,
    pub result: Result<PackageUrlInfo>,
}

/// Resolves packages and records the results in the lock file and the import map.
///
/// A successful resolution updates both documents; a failed one touches neither.
pub struct Resolver<T: Transport = ReqwestTransport> {
    client: ProviderClient<T>,
    lock: LockStore,
    import_map: ImportMapStore,
}

impl<T: Transport> Resolver<T> {
    /// Creates a resolver for the project config at `config_path` writing its import map to
    /// `import_map_path`.
    pub fn new<C: Into<PathBuf>, M: Into<PathBuf>>(
        client: ProviderClient<T>,
        config_path: C,
        import_map_path: M,
    ) -> Self {
        Self {
            client,
            lock: LockStore::new(config_path),
            import_map: ImportMapStore::new(import_map_path),
        }
    }

    pub fn client(&self) -> &ProviderClient<T> {
        &self.client
    }

    pub fn lock_store(&self) -> &LockStore {
        &self.lock
    }

    pub fn import_map_store(&self) -> &ImportMapStore {
        &self.import_map
    }

    /// Resolves `name` with `provider` and persists the result to both stores.
    ///
    /// Both store mutexes are held for the whole write (lock file first, then import map).
    /// If the import map cannot be written the previous lock file content is restored.
    pub fn resolve(&self, name: &str, provider: Source) -> Result<PackageUrlInfo> {
        let info = self.client.resolve(name, provider)?;

        let lock_guard = self.lock.acquire();
        let map_guard = self.import_map.acquire();

        let previous = self.lock.load_locked(&lock_guard)?;
        let mut lock = previous.clone();
        lock.insert(name, info.clone())?;
        self.commit(&lock_guard, &map_guard, &previous, &lock, |map| {
            map.insert_import(name, &info.import);
        })?;

        tracing::info!(name, %provider, import = %info.import, "locked");
        Ok(info)
    }

    /// Returns the locked entry for `name` if there is one, otherwise resolves it.
    ///
    /// The import map is refreshed from the lock entry when it is out of date, so a
    /// cold checkout with only the lock file needs no network. The lock read and the
    /// import map write happen under both store mutexes.
    pub fn ensure(&self, name: &str, provider: Source) -> Result<(PackageUrlInfo, bool)> {
        {
            let lock_guard = self.lock.acquire();
            let map_guard = self.import_map.acquire();
            if let Some(info) = self.lock.load_locked(&lock_guard)?.get(name).cloned() {
                self.import_map.update_locked(&map_guard, |map| {
                    if map.imports.get(name) != Some(&info.import) {
                        tracing::debug!(name, "restoring import map entry from lock");
                        map.insert_import(name, &info.import);
                    }
                    Ok(())
                })?;
                return Ok((info, true));
            }
        }
        Ok((self.resolve(name, provider)?, false))
    }

    /// Resolves every `(name, provider)` pair, at most [`MAX_PARALLEL_RESOLUTIONS`] at a time.
    ///
    /// Locked packages are reused unless `refresh` is set. Each package is persisted as
    /// soon as it resolves; failures are reported per package and do not stop the others.
    pub fn sync(&self, deps: &[(String, Source)], refresh: bool) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::with_capacity(deps.len());
        for chunk in deps.chunks(MAX_PARALLEL_RESOLUTIONS) {
            std::thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|(name, provider)| {
                        let provider = *provider;
                        scope.spawn(move || {
                            let (result, cached) = if refresh {
                                (self.resolve(name, provider), false)
                            } else {
                                match self.ensure(name, provider) {
                                    Ok((info, cached)) => (Ok(info), cached),
                                    Err(e) => (Err(e), false),
                                }
                            };
                            SyncOutcome { name: name.clone(), provider, cached, result }
                        })
                    })
                    .collect();
                for handle in handles {
                    match handle.join() {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
            });
        }
        outcomes
    }

    /// Removes `name` from the lock file and the import map. Returns the removed lock entry.
    ///
    /// The lock file is restored if the import map cannot be written.
    pub fn remove(&self, name: &str) -> Result<Option<PackageUrlInfo>> {
        let lock_guard = self.lock.acquire();
        let map_guard = self.import_map.acquire();

        let previous = self.lock.load_locked(&lock_guard)?;
        let mut lock = previous.clone();
        let removed = lock.remove(name);
        self.commit(&lock_guard, &map_guard, &previous, &lock, |map| {
            map.remove_import(name);
        })?;
        Ok(removed)
    }

    /// Writes `lock`, then applies `edit` to the import map. On a failed import map write
    /// the lock file is put back to `previous`.
    fn commit(
        &self,
        lock_guard: &MutexGuard<'_, ()>,
        map_guard: &MutexGuard<'_, ()>,
        previous: &PackagesLock,
        lock: &PackagesLock,
        edit: impl FnOnce(&mut ImportMap),
    ) -> Result<()> {
        self.lock.save_locked(lock_guard, lock)?;
        let mapped = self.import_map.update_locked(map_guard, |map| {
            edit(map);
            Ok(())
        });
        if let Err(e) = mapped {
            tracing::warn!(error = %e, "import map update failed, restoring lock file");
            if let Err(restore) = self.lock.save_locked(lock_guard, previous) {
                tracing::error!(error = %restore, "could not restore lock file");
            }
            return Err(e);
        }
        Ok(())
    }
}
