use std::path::PathBuf;
use thiserror::Error;
use crate::package::Source;

/// Boxed error returned by a [`Transport`](crate::http::Transport) implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while resolving packages or touching the lock file and import map.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider answered the lookup with an HTTP status >= 400.
    #[error("package `{name}` not found on {provider} (HTTP {status})")]
    PackageNotFound {
        name: String,
        provider: Source,
        status: u16,
    },
    /// The provider answered successfully but its import map has no entry for the package.
    #[error("{provider} response has no import entry for `{name}`")]
    LookupKeyMissing {
        name: String,
        provider: Source,
    },
    #[error("invalid response from {provider} for `{name}`: {reason}")]
    InvalidResponse {
        name: String,
        provider: Source,
        reason: String,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),
    /// Lock keys and import specifiers must be bare package names.
    #[error("`{0}` is not a bare package name")]
    InvalidPackageName(String),
    #[error("invalid manifest {}: {reason}", .path.display())]
    Manifest {
        path: PathBuf,
        reason: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// True when the provider reported the package as missing, so another provider may succeed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PackageNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
