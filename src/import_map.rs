//! Browser import map document (`{"imports": {...}, "scopes": {...}}`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::util::{load_json_or_default, save_json};

pub type SpecifierMap = BTreeMap<String, String>;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    #[serde(default)]
    pub imports: SpecifierMap,
    #[serde(default)]
    pub scopes: BTreeMap<String, SpecifierMap>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the import map at `path`. A missing file is an empty map.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_json_or_default(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json(path, self)
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.scopes.is_empty()
    }

    pub fn insert_import(&mut self, specifier: &str, url: &str) -> Option<String> {
        self.imports.insert(specifier.to_string(), url.to_string())
    }

    pub fn remove_import(&mut self, specifier: &str) -> Option<String> {
        self.imports.remove(specifier)
    }

    pub fn insert_scoped(&mut self, scope: &str, specifier: &str, url: &str) -> Option<String> {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(specifier.to_string(), url.to_string())
    }

    /// Resolves `specifier` the way a browser would for a module loaded from `referrer`.
    ///
    /// Scopes whose key prefixes `referrer` are tried from the longest key down, then the
    /// top-level `imports`. Keys ending in `/` match any specifier they prefix.
    pub fn lookup(&self, specifier: &str, referrer: Option<&str>) -> Option<String> {
        if let Some(referrer) = referrer {
            let mut scopes: Vec<_> = self
                .scopes
                .iter()
                .filter(|(scope, _)| scope_matches(scope, referrer))
                .collect();
            scopes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
            for (_, map) in scopes {
                if let Some(url) = resolve_in(map, specifier) {
                    return Some(url);
                }
            }
        }
        resolve_in(&self.imports, specifier)
    }
}

fn scope_matches(scope: &str, referrer: &str) -> bool {
    if scope.ends_with('/') {
        referrer.starts_with(scope)
    } else {
        referrer == scope
    }
}

fn resolve_in(map: &SpecifierMap, specifier: &str) -> Option<String> {
    if let Some(url) = map.get(specifier) {
        return Some(url.clone());
    }
    map.iter()
        .filter(|(key, _)| key.ends_with('/') && specifier.starts_with(key.as_str()))
        .max_by_key(|(key, _)| key.len())
        .map(|(key, url)| format!("{url}{}", &specifier[key.len()..]))
}

/// Serializes load-modify-save cycles on one import map file.
#[derive(Debug)]
pub struct ImportMapStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ImportMapStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ImportMap> {
        let _guard = self.acquire();
        ImportMap::load(&self.path)
    }

    /// Loads the map, applies `f` and writes the result back under the store's mutex.
    pub fn update<R>(&self, f: impl FnOnce(&mut ImportMap) -> Result<R>) -> Result<R> {
        let guard = self.acquire();
        self.update_locked(&guard, f)
    }

    pub(crate) fn acquire(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn update_locked<R>(
        &self,
        _guard: &MutexGuard<'_, ()>,
        f: impl FnOnce(&mut ImportMap) -> Result<R>,
    ) -> Result<R> {
        let mut map = ImportMap::load(&self.path)?;
        let result = f(&mut map)?;
        map.save(&self.path)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_map() {
        let dir = tempdir().unwrap();
        let map = ImportMap::load(dir.path().join("public").join("importmap.json")).unwrap();
        assert!(map.is_empty());
        assert!(dir.path().join("public").exists());
    }

    #[test]
    fn test_empty_map_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("importmap.json");
        ImportMap::new().save(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"imports": {}, "scopes": {}}));
        assert_eq!(ImportMap::load(&path).unwrap(), ImportMap::new());
    }

    #[test]
    fn test_round_trip_with_scopes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("importmap.json");
        let mut map = ImportMap::new();
        map.insert_import("react", "https://cdn.example/react");
        map.insert_scoped("/legacy/", "react", "https://cdn.example/react@16");
        map.save(&path).unwrap();
        assert_eq!(ImportMap::load(&path).unwrap(), map);
    }

    #[test]
    fn test_hand_edited_map_without_scopes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("importmap.json");
        std::fs::write(&path, "{\n  \"imports\": {\n    // ui\n    \"vue\": \"https://cdn.example/vue.js\",\n  },\n}").unwrap();
        let map = ImportMap::load(&path).unwrap();
        assert_eq!(map.imports["vue"], "https://cdn.example/vue.js");
        assert!(map.scopes.is_empty());
    }

    #[test]
    fn test_lookup_prefers_longest_scope() {
        let mut map = ImportMap::new();
        map.insert_import("react", "https://cdn.example/react@18");
        map.insert_scoped("/app/", "react", "https://cdn.example/react@17");
        map.insert_scoped("/app/legacy/", "react", "https://cdn.example/react@16");

        assert_eq!(map.lookup("react", None).as_deref(), Some("https://cdn.example/react@18"));
        assert_eq!(map.lookup("react", Some("/app/main.js")).as_deref(), Some("https://cdn.example/react@17"));
        assert_eq!(
            map.lookup("react", Some("/app/legacy/old.js")).as_deref(),
            Some("https://cdn.example/react@16")
        );
        assert_eq!(map.lookup("react", Some("/other/x.js")).as_deref(), Some("https://cdn.example/react@18"));
        assert_eq!(map.lookup("vue", Some("/app/main.js")), None);
    }

    #[test]
    fn test_lookup_trailing_slash_prefix() {
        let mut map = ImportMap::new();
        map.insert_import("lodash/", "https://cdn.example/lodash/");
        assert_eq!(
            map.lookup("lodash/fp.js", None).as_deref(),
            Some("https://cdn.example/lodash/fp.js")
        );
        assert_eq!(map.lookup("lodash", None), None);
    }

    #[test]
    fn test_store_update() {
        let dir = tempdir().unwrap();
        let store = ImportMapStore::new(dir.path().join("importmap.json"));
        store.update(|map| Ok(map.insert_import("react", "https://cdn.example/react"))).unwrap();
        store.update(|map| Ok(map.insert_import("vue", "https://cdn.example/vue"))).unwrap();
        let map = store.load().unwrap();
        assert_eq!(map.imports.len(), 2);
    }
}
