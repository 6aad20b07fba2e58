use clap::{Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Log every provider request
    #[clap(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: PinmapCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum PinmapCommand {
    /// Creates a `pinmap.toml` in the current directory
    Init,
    /// Adds a package to `pinmap.toml`, resolves it and updates the lock file and import map
    Add {
        /// Bare package name, e.g. `react` or `@babel/core`
        name: String,
        /// skypack, jspm, jsdelivr or unpkg. Defaults to the project's default provider
        #[clap(short, long)]
        provider: Option<String>,
    },
    /// Removes a package from `pinmap.toml`, the lock file and the import map
    Remove {
        name: String,
    },
    /// Resolves every dependency in `pinmap.toml`. Locked packages are reused
    ///
    /// The lock file does not record which provider produced an entry, so a provider
    /// changed in `pinmap.toml` only takes effect with `pinmap sync --refresh`.
    Sync {
        /// Ask the providers again even for locked packages, e.g. after changing a provider
        #[clap(long)]
        refresh: bool,
    },
    /// Resolves a package and prints the result without writing anything
    Resolve {
        name: String,
        #[clap(short, long)]
        provider: Option<String>,
    },
    /// Lists dependencies and their locked URLs
    List,
}
