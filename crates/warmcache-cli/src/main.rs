use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use warmcache_core::maintenance::{prune_expired, stats, sweep_temp_files};
use warmcache_core::{CacheConfig, Repository, Value};

/// Config file picked up from the working directory when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "warmcache.yaml";

/// WarmCache - inspect and edit a file-backed cache directory
#[derive(Parser, Debug)]
#[command(name = "warmcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a warmcache.yaml (or .json) configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration)
    #[arg(short, long, value_name = "DIR", global = true)]
    dir: Option<PathBuf>,

    /// File-name prefix (overrides the configuration)
    #[arg(short, long, global = true)]
    prefix: Option<String>,

    /// Tag partition to operate on; repeat for several tags
    #[arg(short, long = "tag", value_name = "TAG", global = true)]
    tags: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an item as JSON; exits with status 1 when it is missing
    Get { key: String },

    /// Store an item. VALUE is JSON; anything that doesn't parse is stored as a string
    Put {
        key: String,
        value: String,
        /// Lifetime in seconds, 0 stores forever
        #[arg(long, default_value_t = 0)]
        ttl: u64,
    },

    /// Store an item only if it is not already present
    Add {
        key: String,
        value: String,
        #[arg(long, default_value_t = 0)]
        ttl: u64,
    },

    /// Store an item that never expires
    Forever { key: String, value: String },

    /// Remove an item
    Forget { key: String },

    /// Add to a counter and print the new value
    Incr {
        key: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        by: i64,
    },

    /// Subtract from a counter and print the new value
    Decr {
        key: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        by: i64,
    },

    /// Push back an item's expiry by SECONDS
    Extend { key: String, seconds: u64 },

    /// Remove every item (only the tag partition when --tag is given)
    Flush,

    /// Show what the cache directory holds
    Stats,

    /// Remove temp files left behind by interrupted writes
    Sweep {
        /// Only remove temp files at least this many seconds old
        #[arg(long, default_value_t = 3600)]
        older_than: u64,
    },

    /// Remove expired items now
    Prune,

    /// Write a default configuration file
    Init {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries values
    // Set RUST_LOG=debug for detailed logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Opening the store touches nothing on disk
    let config = load_config(&cli)?;
    debug!(?config, "Resolved configuration");

    let repo = Repository::from_config(&config)?.tags(cli.tags.iter().cloned());

    match cli.command {
        Command::Get { key } => match repo.get(&key) {
            Some(value) => println!("{}", value.to_json()),
            None => {
                eprintln!("Error: no item for key '{}'", key);
                std::process::exit(1);
            }
        },
        Command::Put { key, value, ttl } => {
            repo.put(&key, parse_value(&value), Duration::from_secs(ttl))?;
        }
        Command::Add { key, value, ttl } => {
            let added = repo.add(&key, parse_value(&value), Duration::from_secs(ttl))?;
            println!("{}", added);
        }
        Command::Forever { key, value } => {
            repo.forever(&key, parse_value(&value))?;
        }
        Command::Forget { key } => {
            println!("{}", repo.forget(&key)?);
        }
        Command::Incr { key, by } => {
            println!("{}", repo.increment(&key, by)?);
        }
        Command::Decr { key, by } => {
            println!("{}", repo.decrement(&key, by)?);
        }
        Command::Extend { key, seconds } => {
            println!(
                "{}",
                repo.extend_expiration(&key, Duration::from_secs(seconds))?
            );
        }
        Command::Flush => {
            let removed = repo.flush()?;
            println!("Removed {} entries", removed);
        }
        Command::Stats => {
            let report = stats(repo.store())?;
            println!("Directory:  {}", repo.store().directory().display());
            println!("Prefix:     {}", repo.store().prefix());
            println!("Entries:    {}", report.entries);
            println!("Expired:    {}", report.expired);
            println!("Unreadable: {}", report.unreadable);
            println!("Temp files: {}", report.temp_files);
            println!("Size:       {}", report.size_human());
        }
        Command::Sweep { older_than } => {
            let removed = sweep_temp_files(repo.store(), Duration::from_secs(older_than))?;
            println!("Removed {} temp files", removed);
        }
        Command::Prune => {
            let removed = prune_expired(repo.store())?;
            println!("Removed {} expired entries", removed);
        }
        Command::Init { path } => init_config(&path)?,
    }

    Ok(())
}

/// Write a default configuration file, refusing to overwrite one
fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    CacheConfig::init_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

/// Configuration from `--config`, else ./warmcache.yaml, else defaults; then
/// command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<CacheConfig> {
    let mut config = match &cli.config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            CacheConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_FILE))?
        }
        None => CacheConfig::default(),
    };

    if let Some(dir) = &cli.dir {
        config.directory = Some(dir.clone());
    }
    if let Some(prefix) = &cli.prefix {
        config.prefix = Some(prefix.clone());
    }
    // A one-shot process never reads an entry twice
    config.acceleration = false;

    Ok(config)
}

fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_json_and_plain() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("\"quoted\""), Value::from("quoted"));
        assert_eq!(parse_value("plain words"), Value::from("plain words"));
        assert_eq!(
            parse_value(r#"{"a": [1, true]}"#).get("a"),
            Some(&Value::from(vec![Value::Int(1), Value::Bool(true)]))
        );
    }

    #[test]
    fn test_cli_accepts_negative_deltas() {
        let cli = Cli::parse_from(["warmcache", "incr", "n", "-5"]);
        assert!(matches!(cli.command, Command::Incr { by: -5, .. }));

        let cli = Cli::parse_from(["warmcache", "decr", "n", "-2"]);
        assert!(matches!(cli.command, Command::Decr { by: -2, .. }));
    }

    #[test]
    fn test_cli_parses_global_tags() {
        let cli = Cli::parse_from(["warmcache", "get", "k", "--tag", "a", "-t", "b"]);
        assert_eq!(cli.tags, vec!["a", "b"]);
        assert!(matches!(cli.command, Command::Get { key } if key == "k"));
    }
}
