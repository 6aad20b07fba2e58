//! # pinmap
//!
//! Resolves bare npm package names (`react`, `@babel/core`) to CDN URLs that browsers can
//! `import`, and records every resolution so later builds are deterministic and work offline.
//!
//! Two documents are kept per project: the lock file (`pinmap.toml.lock`, package name to
//! resolved URLs) and the browser import map (`importmap.json` by default).
//!
//! ## Modules Overview
//! - [`provider`] – Provider client for Skypack and the jspm generator (jspm, jsdelivr, unpkg)
//! - [`http`] – Transport seam and resolver settings
//! - [`lock`] – Lock file document and store
//! - [`import_map`] – Import map document and store
//! - [`resolver`] – Keeps the lock file and import map in step with the provider client
//! - [`manifest`] – `pinmap.toml` project manifest
//! - [`global`] – User-wide configuration
//! - [`util`] – File helpers shared by the stores

pub mod error;
pub mod package;
pub mod http;
pub mod provider;
pub mod lock;
pub mod import_map;
pub mod resolver;
pub mod manifest;
pub mod util;
pub mod global;

pub use error::*;
pub use package::*;
pub use http::*;
pub use provider::*;
pub use lock::*;
pub use import_map::*;
pub use resolver::*;
pub use manifest::*;
pub use global::config::*;
