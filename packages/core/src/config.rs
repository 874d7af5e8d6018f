use std::collections::{BTreeMap, HashMap};

use config::{Config, ConfigError, Environment, File};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

pub use common::config::ResultStoreConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            sqlx_logging: false,
        }
    }
}

/// Test-data assignment window.
#[derive(Debug, Deserialize, Clone)]
pub struct AssignmentConfig {
    /// Seconds an issued test pair stays valid for submission. Default: 300.
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,
    /// Whether a submitted assignment may be replaced by a fresh one. Default: false.
    #[serde(default)]
    pub allow_resubmit: bool,
}

fn default_expiration_secs() -> u64 {
    300
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            expiration_secs: default_expiration_secs(),
            allow_resubmit: false,
        }
    }
}

/// Individual time-limited contest settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ContestConfig {
    /// Enforce each user's personal contest window on submission. Default: false.
    #[serde(default)]
    pub time_limit_mode: bool,
    /// Length of a personal contest window in seconds. Default: 3 hours.
    #[serde(default = "default_contest_duration_secs")]
    pub duration_secs: u64,
    /// Users must explicitly confirm before their window starts. Default: false.
    #[serde(default)]
    pub confirm_start: bool,
}

fn default_contest_duration_secs() -> u64 {
    3 * 60 * 60
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            time_limit_mode: false,
            duration_secs: default_contest_duration_secs(),
            confirm_start: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Maximum size in bytes of an uploaded source or output file. Default: 1 MiB.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

fn default_max_size() -> usize {
    1024 * 1024
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
        }
    }
}

/// `testruns` entry of a problem's grading configuration.
///
/// Either a plain run count, or a table from run number to the cases that
/// run comprises, e.g. `testruns = { "1" = [1, 2], "2" = [3] }`. A run key
/// that is not a number fails the whole configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TestRunsConfig {
    Count(u32),
    Map(#[serde(deserialize_with = "run_table")] BTreeMap<u32, Vec<u32>>),
}

fn run_table<'de, D>(deserializer: D) -> Result<BTreeMap<u32, Vec<u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, Vec<u32>>::deserialize(deserializer)?
        .into_iter()
        .map(|(run, cases)| match run.trim().parse::<u32>() {
            Ok(id) => Ok((id, cases)),
            Err(_) => Err(D::Error::custom(format!(
                "test run key {run:?} is not a number"
            ))),
        })
        .collect()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GradingInfoConfig {
    pub testruns: TestRunsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub results: ResultStoreConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub contest: ContestConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    /// Grading layout per problem name.
    #[serde(default)]
    pub grading: HashMap<String, GradingInfoConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("GRADER_CONFIG").unwrap_or_else(|_| "config/config".to_string());
        Self::load_from(&config_path)
    }

    /// Like [`AppConfig::load`], reading the file at `config_path` (extension optional).
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("database.url", "sqlite://grader.db?mode=rwc")?
            .set_default("results.dir", "./grading-results")?
            .set_default("assignment.expiration_secs", 300_i64)?
            // Load from config/config.toml
            .add_source(File::with_name(config_path).required(false))
            // Override from environment (e.g., GRADER__ASSIGNMENT__EXPIRATION_SECS)
            .add_source(Environment::with_prefix("GRADER").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Configuration for tests and local tooling: everything at its default.
    pub fn with_database(database: DatabaseConfig) -> Self {
        Self {
            database,
            results: ResultStoreConfig::default(),
            assignment: AssignmentConfig::default(),
            contest: ContestConfig::default(),
            submission: SubmissionConfig::default(),
            grading: HashMap::new(),
        }
    }
}
