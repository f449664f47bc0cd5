use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use basketry_core::config::{AppConfig, ConfigOverrides, CONFIG_FILE_NAME};
use serde::Serialize;
use toml::Value;

use crate::commands::dataset::load_config;
use crate::commands::{to_data, CommandResult};

const COMMAND: &str = "config";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    flag: Option<&'static str>,
}

const FIELDS: &[Field] = &[
    Field {
        key: "mining.min_support",
        env_keys: &["BASKETRY_MINING_MIN_SUPPORT"],
        flag: Some("--min-support"),
    },
    Field {
        key: "mining.min_confidence",
        env_keys: &["BASKETRY_MINING_MIN_CONFIDENCE"],
        flag: Some("--min-confidence"),
    },
    Field {
        key: "mining.max_length",
        env_keys: &["BASKETRY_MINING_MAX_LENGTH"],
        flag: Some("--max-length"),
    },
    Field { key: "mining.verbosity", env_keys: &["BASKETRY_MINING_VERBOSITY"], flag: None },
    Field {
        key: "mining.output_transaction_ids",
        env_keys: &["BASKETRY_MINING_OUTPUT_TRANSACTION_IDS"],
        flag: None,
    },
    Field { key: "mining.parallel", env_keys: &["BASKETRY_MINING_PARALLEL"], flag: None },
    Field { key: "dataset.path", env_keys: &["BASKETRY_DATASET_PATH"], flag: Some("--dataset") },
    Field { key: "dataset.format", env_keys: &["BASKETRY_DATASET_FORMAT"], flag: None },
    Field {
        key: "recommend.max_recommendations",
        env_keys: &["BASKETRY_RECOMMEND_MAX_RECOMMENDATIONS"],
        flag: None,
    },
    Field { key: "server.bind_address", env_keys: &["BASKETRY_SERVER_BIND_ADDRESS"], flag: None },
    Field { key: "server.port", env_keys: &["BASKETRY_SERVER_PORT"], flag: None },
    Field {
        key: "logging.level",
        env_keys: &["BASKETRY_LOGGING_LEVEL", "BASKETRY_LOG_LEVEL"],
        flag: None,
    },
    Field {
        key: "logging.format",
        env_keys: &["BASKETRY_LOGGING_FORMAT", "BASKETRY_LOG_FORMAT"],
        flag: None,
    },
];

pub fn run(overrides: ConfigOverrides) -> CommandResult {
    let flagged = flagged_keys(&overrides);
    let config = match load_config(COMMAND, overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: Vec<ConfigEntry> = FIELDS
        .iter()
        .map(|field| ConfigEntry {
            key: field.key,
            value: field_value(&config, field.key),
            source: field_source(
                field,
                &flagged,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect();

    match to_data(COMMAND, &entries) {
        Ok(data) => CommandResult::success_with_data(
            COMMAND,
            "effective config (source precedence: flag > env > file > default)",
            Some(data),
        ),
        Err(failure) => failure,
    }
}

fn flagged_keys(overrides: &ConfigOverrides) -> Vec<&'static str> {
    let mut keys = Vec::new();
    if overrides.min_support.is_some() {
        keys.push("mining.min_support");
    }
    if overrides.min_confidence.is_some() {
        keys.push("mining.min_confidence");
    }
    if overrides.max_length.is_some() {
        keys.push("mining.max_length");
    }
    if overrides.dataset_path.is_some() {
        keys.push("dataset.path");
    }
    keys
}

fn field_value(config: &AppConfig, key: &str) -> String {
    match key {
        "mining.min_support" => config.mining.min_support.to_string(),
        "mining.min_confidence" => config.mining.min_confidence.to_string(),
        "mining.max_length" => config.mining.max_length.to_string(),
        "mining.verbosity" => config.mining.verbosity.to_string(),
        "mining.output_transaction_ids" => config.mining.output_transaction_ids.to_string(),
        "mining.parallel" => config.mining.parallel.to_string(),
        "dataset.path" => config.dataset.path.display().to_string(),
        "dataset.format" => config.dataset.format.as_str().to_string(),
        "recommend.max_recommendations" => config.recommend.max_recommendations.to_string(),
        "server.bind_address" => config.server.bind_address.clone(),
        "server.port" => config.server.port.to_string(),
        "logging.level" => config.logging.level.clone(),
        "logging.format" => config.logging.format.as_str().to_string(),
        _ => "<unknown>".to_string(),
    }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(CONFIG_FILE_NAME);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(CONFIG_FILE_NAME);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    flagged: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = field.flag {
        if flagged.contains(&field.key) {
            return format!("flag ({flag})");
        }
    }

    for env_key in field.env_keys {
        if env::var(env_key).is_ok_and(|value| !value.trim().is_empty()) {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
