use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::http::ResolverConfig;
use crate::package::{validate_package_name, Source};

/// Represents the contents of a `pinmap.toml` file.
///
/// ```toml
/// [project]
/// name = "web"
/// import_map = "public/importmap.json"
/// default_provider = "jspm"
///
/// [dependencies]
/// react = "skypack"
/// lodash = "jsdelivr"
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub project: Project,
    /// Package name to provider name. Unknown providers fall back to jspm.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Overrides the global resolver settings for this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Import map location, relative to the manifest's directory.
    #[serde(default = "default_import_map")]
    pub import_map: String,
    #[serde(default)]
    pub default_provider: Source,
}

fn default_version() -> String {
    String::from("0.1.0")
}

fn default_import_map() -> String {
    String::from("importmap.json")
}

impl Manifest {
    /// Creates a manifest for a new project with no dependencies.
    pub fn default(name: &str) -> Manifest {
        Manifest {
            project: Project {
                name: String::from(name),
                version: default_version(),
                import_map: default_import_map(),
                default_provider: Source::default(),
            },
            dependencies: BTreeMap::new(),
            resolver: None,
        }
    }

    /// Loads a manifest from `path`.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or is not a valid manifest.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Manifest> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|e| Error::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Saves the manifest to `path` in pretty TOML format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| Error::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        crate::util::write_atomic(path, content.as_bytes())
    }

    /// Records `name` with `provider`, replacing any previous provider for it.
    pub fn add(&mut self, name: &str, provider: Source) -> Result<()> {
        validate_package_name(name)?;
        self.dependencies.insert(name.to_string(), provider.to_string());
        Ok(())
    }

    /// Removes a dependency. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.dependencies.remove(name).is_some()
    }

    /// Dependencies with their providers parsed.
    pub fn resolved_dependencies(&self) -> Vec<(String, Source)> {
        self.dependencies
            .iter()
            .map(|(name, provider)| (name.clone(), Source::parse_lenient(provider)))
            .collect()
    }

    /// Absolute-or-relative path of the import map for a manifest located at `manifest_path`.
    pub fn import_map_path<P: AsRef<Path>>(&self, manifest_path: P) -> PathBuf {
        let base = manifest_path.as_ref().parent().unwrap_or(Path::new(""));
        base.join(&self.project.import_map)
    }
}
