use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use pinmap::global::config::{effective_resolver_config, GlobalConfig};
use pinmap::import_map::ImportMap;
use pinmap::lock::PackagesLock;
use pinmap::manifest::Manifest;
use pinmap::package::Source;
use pinmap::provider::ProviderClient;
use pinmap::resolver::Resolver;
use pinmap::util::MANIFEST_FILE;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::cli::{PinmapCommand, CLI};

pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "pinmap=debug" } else { "pinmap=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn execute(cli: CLI) -> Result<()> {
    if cli.command != PinmapCommand::Init {
        let manifest_path = get_manifest_path()?;
        if !manifest_path.exists() {
            bail!("{MANIFEST_FILE} not found. Run `pinmap init` to create one.")
        }
    }
    match cli.command {
        PinmapCommand::Init => {
            execute_init()
        }
        PinmapCommand::Add { name, provider } => {
            execute_add(&name, provider.as_deref())
        }
        PinmapCommand::Remove { name } => {
            execute_remove(&name)
        }
        PinmapCommand::Sync { refresh } => {
            execute_sync(refresh)
        }
        PinmapCommand::Resolve { name, provider } => {
            execute_resolve(&name, provider.as_deref())
        }
        PinmapCommand::List => {
            execute_list()
        }
    }
}

fn get_manifest_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(MANIFEST_FILE))
}

fn load_manifest() -> Result<(PathBuf, Manifest)> {
    let path = get_manifest_path()?;
    let manifest = Manifest::load(&path)
        .with_context(|| format!("Could not load {}", path.display()))?;
    Ok((path, manifest))
}

fn build_resolver(manifest_path: &Path, manifest: &Manifest) -> Result<Resolver> {
    let global = GlobalConfig::load()?;
    let config = effective_resolver_config(manifest, &global);
    let client = ProviderClient::from_config(config)?;
    Ok(Resolver::new(client, manifest_path, manifest.import_map_path(manifest_path)))
}

fn pick_provider(requested: Option<&str>, manifest: &Manifest) -> Source {
    requested
        .map(Source::parse_lenient)
        .unwrap_or(manifest.project.default_provider)
}

pub fn execute_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let path = cwd.join(MANIFEST_FILE);
    if path.exists() {
        bail!("{MANIFEST_FILE} already exists");
    }
    let name = cwd.file_name().ok_or(anyhow::anyhow!("Could not get file name"))?
        .to_str().ok_or(anyhow::anyhow!("Invalid directory name"))?;
    Manifest::default(name).save(&path)?;
    println!("{} {}", "Created".green().bold(), path.display());
    Ok(())
}

pub fn execute_add(name: &str, provider: Option<&str>) -> Result<()> {
    let (path, mut manifest) = load_manifest()?;
    let provider = pick_provider(provider, &manifest);
    let resolver = build_resolver(&path, &manifest)?;
    let info = resolver.resolve(name, provider)
        .with_context(|| format!("Could not resolve {name} with {provider}"))?;
    manifest.add(name, provider)?;
    manifest.save(&path)?;
    println!("{} {name} -> {}", "Added".green().bold(), info.import);
    Ok(())
}

pub fn execute_remove(name: &str) -> Result<()> {
    let (path, mut manifest) = load_manifest()?;
    let resolver = build_resolver(&path, &manifest)?;
    let locked = resolver.lock_store().load()?.contains(name);
    if !manifest.remove(name) && !locked {
        bail!("{name} is not a dependency");
    }
    resolver.remove(name)?;
    manifest.save(&path)?;
    println!("{} {name}", "Removed".green().bold());
    Ok(())
}

pub fn execute_sync(refresh: bool) -> Result<()> {
    let (path, manifest) = load_manifest()?;
    let deps = manifest.resolved_dependencies();
    if deps.is_empty() {
        println!("No dependencies");
        return Ok(());
    }
    let resolver = build_resolver(&path, &manifest)?;
    let mut failed = 0;
    for outcome in resolver.sync(&deps, refresh) {
        match outcome.result {
            Ok(info) if outcome.cached => {
                println!("{} {} -> {}", "Locked".dimmed(), outcome.name, info.import);
            }
            Ok(info) => {
                println!("{} {} -> {}", "Resolved".green().bold(), outcome.name, info.import);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {} ({}): {e}", "Failed".red().bold(), outcome.name, outcome.provider);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} packages could not be resolved", deps.len());
    }
    Ok(())
}

pub fn execute_resolve(name: &str, provider: Option<&str>) -> Result<()> {
    let (path, manifest) = load_manifest()?;
    let provider = pick_provider(provider, &manifest);
    let resolver = build_resolver(&path, &manifest)?;
    let info = resolver.client().resolve(name, provider)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub fn execute_list() -> Result<()> {
    let (path, manifest) = load_manifest()?;
    if manifest.dependencies.is_empty() {
        println!("No dependencies");
        return Ok(());
    }
    let lock = PackagesLock::load(&path)?;
    let import_map = ImportMap::load(manifest.import_map_path(&path))?;
    for (name, provider) in manifest.resolved_dependencies() {
        println!("{}: {}", name.bold(), provider);
        match lock.get(&name) {
            Some(locked) => {
                match locked.version() {
                    Some(version) => println!("   locked at: {version}"),
                    None => println!("   locked"),
                }
                println!("   pin: {}", locked.pin);
                println!("   import: {}", locked.import);
                if import_map.imports.get(&name) != Some(&locked.import) {
                    println!("   {}", "import map out of date, run `pinmap sync`".yellow());
                }
            }
            None => {
                println!("   {}", "unlocked".yellow());
            }
        }
        println!();
    }
    Ok(())
}
