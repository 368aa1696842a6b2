//! Configuration management

use std::path::PathBuf;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::{
    core::step::DEFAULT_CHUNK_SIZE, item::csv::csv_reader::DEFAULT_LINES_TO_SKIP,
    person::FIELD_NAMES,
};

// ============================================================================
// Defaults
// ============================================================================

/// Default input file, relative to the working directory.
pub const DEFAULT_INPUT_PATH: &str = "data/people.csv";

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// Default database URL; `mode=rwc` creates the file when missing.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://persons.db?mode=rwc";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Whole application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub batch: BatchConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

/// Person import settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub input_path: PathBuf,
    pub chunk_size: usize,
    pub delimiter: char,
    /// Whether lines must carry exactly one token per field name
    pub strict: bool,
    pub lines_to_skip: usize,
    pub field_names: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: DEFAULT_DELIMITER,
            strict: false,
            lines_to_skip: DEFAULT_LINES_TO_SKIP,
            field_names: FIELD_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl BatchConfig {
    /// Delimiter as the single byte expected by the tokenizer.
    pub fn delimiter_byte(&self) -> anyhow::Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("delimiter {:?} is not a single ASCII character", self.delimiter))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if self.field_names.is_empty() {
            bail!("at least one field name is required");
        }
        self.delimiter_byte()?;
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment and defaults.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = BatchConfig::default();

        let config = Config {
            batch: BatchConfig {
                input_path: lookup("PERSON_BATCH_INPUT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.input_path),
                chunk_size: parse(&lookup, "PERSON_BATCH_CHUNK_SIZE", defaults.chunk_size)?,
                delimiter: parse(&lookup, "PERSON_BATCH_DELIMITER", defaults.delimiter)?,
                strict: parse(&lookup, "PERSON_BATCH_STRICT", defaults.strict)?,
                lines_to_skip: parse(&lookup, "PERSON_BATCH_LINES_TO_SKIP", defaults.lines_to_skip)?,
                field_names: lookup("PERSON_BATCH_FIELD_NAMES")
                    .map(|names| {
                        names
                            .split(',')
                            .map(|name| name.trim().to_string())
                            .filter(|name| !name.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.field_names),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: parse(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
            },
            server: ServerConfig {
                host: lookup("PERSON_BATCH_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
                port: parse(&lookup, "PERSON_BATCH_PORT", DEFAULT_SERVER_PORT)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.batch.validate()?;
        if self.database.max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be greater than zero");
        }
        Ok(())
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value {value:?} for {key}: {e}")),
        None => Ok(default),
    }
}
