use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apriori::{AprioriParams, MiningParams, DEFAULT_MAX_LENGTH};
use crate::dataset::DatasetFormat;
use crate::recommend::DEFAULT_MAX_RECOMMENDATIONS;

pub const CONFIG_FILE_NAME: &str = "basketry.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub mining: MiningConfig,
    pub dataset: DatasetConfig,
    pub recommend: RecommendConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MiningConfig {
    pub min_support: f64,
    pub min_confidence: f64,
    pub max_length: usize,
    pub verbosity: u8,
    pub output_transaction_ids: bool,
    pub parallel: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub format: DatasetFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendConfig {
    pub max_recommendations: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub min_support: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_length: Option<usize>,
    pub verbosity: Option<u8>,
    pub dataset_path: Option<PathBuf>,
    pub dataset_format: Option<DatasetFormat>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mining: MiningConfig {
                min_support: 0.5,
                min_confidence: 0.5,
                max_length: DEFAULT_MAX_LENGTH,
                verbosity: 0,
                output_transaction_ids: false,
                parallel: false,
            },
            dataset: DatasetConfig {
                path: PathBuf::from("transactions.csv"),
                format: DatasetFormat::Baskets,
            },
            recommend: RecommendConfig { max_recommendations: DEFAULT_MAX_RECOMMENDATIONS },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn mining_params(&self) -> MiningParams {
        MiningParams {
            min_support: self.mining.min_support,
            max_length: self.mining.max_length,
            verbosity: self.mining.verbosity,
            output_transaction_ids: self.mining.output_transaction_ids,
            parallel: self.mining.parallel,
        }
    }

    pub fn apriori_params(&self) -> AprioriParams {
        AprioriParams { mining: self.mining_params(), min_confidence: self.mining.min_confidence }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(mining) = patch.mining {
            if let Some(min_support) = mining.min_support {
                self.mining.min_support = min_support;
            }
            if let Some(min_confidence) = mining.min_confidence {
                self.mining.min_confidence = min_confidence;
            }
            if let Some(max_length) = mining.max_length {
                self.mining.max_length = max_length;
            }
            if let Some(verbosity) = mining.verbosity {
                self.mining.verbosity = verbosity;
            }
            if let Some(output_transaction_ids) = mining.output_transaction_ids {
                self.mining.output_transaction_ids = output_transaction_ids;
            }
            if let Some(parallel) = mining.parallel {
                self.mining.parallel = parallel;
            }
        }

        if let Some(dataset) = patch.dataset {
            if let Some(path) = dataset.path {
                self.dataset.path = path;
            }
            if let Some(format) = dataset.format {
                self.dataset.format = format;
            }
        }

        if let Some(recommend) = patch.recommend {
            if let Some(max_recommendations) = recommend.max_recommendations {
                self.recommend.max_recommendations = max_recommendations;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BASKETRY_MINING_MIN_SUPPORT") {
            self.mining.min_support = parse_env("BASKETRY_MINING_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("BASKETRY_MINING_MIN_CONFIDENCE") {
            self.mining.min_confidence = parse_env("BASKETRY_MINING_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("BASKETRY_MINING_MAX_LENGTH") {
            self.mining.max_length = parse_env("BASKETRY_MINING_MAX_LENGTH", &value)?;
        }
        if let Some(value) = read_env("BASKETRY_MINING_VERBOSITY") {
            self.mining.verbosity = parse_env("BASKETRY_MINING_VERBOSITY", &value)?;
        }
        if let Some(value) = read_env("BASKETRY_MINING_OUTPUT_TRANSACTION_IDS") {
            self.mining.output_transaction_ids =
                parse_env("BASKETRY_MINING_OUTPUT_TRANSACTION_IDS", &value)?;
        }
        if let Some(value) = read_env("BASKETRY_MINING_PARALLEL") {
            self.mining.parallel = parse_env("BASKETRY_MINING_PARALLEL", &value)?;
        }

        if let Some(value) = read_env("BASKETRY_DATASET_PATH") {
            self.dataset.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("BASKETRY_DATASET_FORMAT") {
            self.dataset.format = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "BASKETRY_DATASET_FORMAT".to_string(),
                value: value.clone(),
            })?;
        }

        if let Some(value) = read_env("BASKETRY_RECOMMEND_MAX_RECOMMENDATIONS") {
            self.recommend.max_recommendations =
                parse_env("BASKETRY_RECOMMEND_MAX_RECOMMENDATIONS", &value)?;
        }

        if let Some(value) = read_env("BASKETRY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BASKETRY_SERVER_PORT") {
            self.server.port = parse_env("BASKETRY_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("BASKETRY_LOGGING_LEVEL").or_else(|| read_env("BASKETRY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BASKETRY_LOGGING_FORMAT").or_else(|| read_env("BASKETRY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(min_support) = overrides.min_support {
            self.mining.min_support = min_support;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            self.mining.min_confidence = min_confidence;
        }
        if let Some(max_length) = overrides.max_length {
            self.mining.max_length = max_length;
        }
        if let Some(verbosity) = overrides.verbosity {
            self.mining.verbosity = verbosity;
        }
        if let Some(dataset_path) = overrides.dataset_path {
            self.dataset.path = dataset_path;
        }
        if let Some(dataset_format) = overrides.dataset_format {
            self.dataset.format = dataset_format;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_mining(&self.mining)?;
        validate_dataset(&self.dataset)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_mining(mining: &MiningConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&mining.min_support) {
        return Err(ConfigError::Validation(
            "mining.min_support must be in range 0.0..=1.0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&mining.min_confidence) {
        return Err(ConfigError::Validation(
            "mining.min_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }

    if mining.max_length == 0 {
        return Err(ConfigError::Validation(
            "mining.max_length must be greater than zero".to_string(),
        ));
    }

    if mining.verbosity > 2 {
        return Err(ConfigError::Validation(
            "mining.verbosity must be one of 0 (silent), 1 (progress) or 2 (itemized)".to_string(),
        ));
    }

    Ok(())
}

fn validate_dataset(dataset: &DatasetConfig) -> Result<(), ConfigError> {
    if dataset.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("dataset.path must not be empty".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.bind_address must not be empty".to_string(),
        ));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<V: std::str::FromStr>(key: &str, value: &str) -> Result<V, ConfigError> {
    value.trim().parse::<V>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    mining: Option<MiningPatch>,
    dataset: Option<DatasetPatch>,
    recommend: Option<RecommendPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MiningPatch {
    min_support: Option<f64>,
    min_confidence: Option<f64>,
    max_length: Option<usize>,
    verbosity: Option<u8>,
    output_transaction_ids: Option<bool>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetPatch {
    path: Option<PathBuf>,
    format: Option<DatasetFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendPatch {
    max_recommendations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
