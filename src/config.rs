use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::env;
use std::path::PathBuf;

pub const ENV_API_ID: &str = "INSTAPAPER_API_ID";
pub const ENV_API_SECRET: &str = "INSTAPAPER_API_SECRET";
pub const ENV_LOGIN: &str = "INSTAPAPER_LOGIN";
pub const ENV_PASSWORD: &str = "INSTAPAPER_PASSWORD";
pub const ENV_API_BASE: &str = "INSTAPAPER_API_BASE";

/// The API documents 500 as the largest page it will return.
pub const MAX_ENTRIES_LIMIT: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Run,
    ListDomains,
}

#[derive(Parser, Debug)]
#[command(name = "instapaper-archiver")]
#[command(about = "Archive old Instapaper entries.", long_about = None)]
pub struct Cli {
    #[arg(value_enum, default_value_t = Action::Run)]
    pub action: Action,

    /// True to print what would be archived, then exit. False to archive old unread entries.
    #[arg(long = "dry-run", action = clap::ArgAction::Set, value_parser = parse_bool, default_value = "true")]
    pub dry_run: bool,

    /// Max number of entries to fetch via the Instapaper API. Max: 500.
    #[arg(long = "entries-limit", default_value_t = 250)]
    pub entries_limit: u32,

    /// Entries older than this many days will be marked as read. Ignored if using --rules-file.
    #[arg(long = "max-age", default_value_t = 90, allow_negative_numbers = true)]
    pub max_age: i64,

    /// Operate on only entries from the given domain.
    #[arg(long = "only-domain")]
    pub only_domain: Option<String>,

    /// Extended rules JSON file. See rules.sample.json for an example.
    #[arg(long = "rules-file")]
    pub rules_file: Option<PathBuf>,
}

pub fn parse_bool(v: &str) -> Result<bool, ConfigError> {
    match v.to_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool(v.to_string())),
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".instapaper-archiver")
}

/// Loads `./.env` and then `~/.instapaper-archiver/.env`. Variables already
/// present in the environment are never overwritten.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    for path in [PathBuf::from(".env"), default_config_dir().join(".env")] {
        if path.is_file() && dotenvy::from_path(&path).is_ok() {
            loaded.push(path);
        }
    }
    loaded
}

#[derive(Clone)]
pub struct Credentials {
    pub api_id: String,
    pub api_secret: String,
    pub login: String,
    pub password: String,
}

// Keep secrets out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |name: &'static str| match lookup(name) {
            Some(v) if !v.is_empty() => v,
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let creds = Credentials {
            api_id: get(ENV_API_ID),
            api_secret: get(ENV_API_SECRET),
            login: get(ENV_LOGIN),
            password: get(ENV_PASSWORD),
        };

        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }
        Ok(creds)
    }
}

pub fn api_base() -> Option<String> {
    env::var(ENV_API_BASE).ok().filter(|v| !v.is_empty())
}
