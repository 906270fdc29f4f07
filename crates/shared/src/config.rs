use crate::errors::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// タスクの保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::DynamoDb => "dynamodb",
            StoreBackend::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                key: "TASK_STORE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dynamodb_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    pub environment: String,
    pub store_backend: StoreBackend,
    pub tick_interval: Duration,
    pub confirm_delete: bool,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dynamodb_table: "tasks".to_string(),
            dynamodb_endpoint: None,
            aws_region: "ap-northeast-1".to_string(),
            environment: "dev".to_string(),
            store_backend: StoreBackend::DynamoDb,
            tick_interval: Duration::from_millis(1000),
            confirm_delete: true,
            log_file: PathBuf::from("todo-countdown.log"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる（テストでは環境変数を触らない）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tick_ms = match get("COUNTDOWN_TICK_MS") {
            Some(raw) => parse_tick_ms(&raw)?,
            None => defaults.tick_interval.as_millis() as u64,
        };

        Ok(Config {
            dynamodb_table: get("TASKS_TABLE").unwrap_or(defaults.dynamodb_table),
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT"),
            aws_region: get("AWS_REGION").unwrap_or(defaults.aws_region),
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            store_backend: match get("TASK_STORE") {
                Some(raw) => raw.parse()?,
                None => defaults.store_backend,
            },
            tick_interval: Duration::from_millis(tick_ms),
            confirm_delete: match get("CONFIRM_DELETE") {
                Some(raw) => parse_bool("CONFIRM_DELETE", &raw)?,
                None => defaults.confirm_delete,
            },
            log_file: get("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        })
    }
}

fn parse_tick_ms(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(ConfigError::Invalid {
            key: "COUNTDOWN_TICK_MS",
            value: raw.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}
