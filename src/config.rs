// ============================================================================
//                      MARS BUILD PROCESSOR • CONFIGURATION
//        YAML Config Loading, Env Credentials & Default Parameters
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Loads the two YAML files the original reads (a "mars" config with
//       the database uri and default situation/goal parameters, and a
//       "server" config with http/amqp activation), plus the neo4j
//       credentials and a handful of path overrides from the environment.
//       Ported from `utils.py`'s `get_config_from_file` and
//       `build_processor.py`'s env var section.
//
//   File:        /src/config.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::error::PlannerError;
use crate::model::StateObjectRow;
use crate::query::AreaDefinition;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub activate: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmqpExchangeConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmqpConfig {
    #[serde(default)]
    pub activate: bool,
    pub host: String,
    pub port: u16,
    pub exchange: AmqpExchangeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    pub http: Option<HttpConfig>,
    pub amqp: Option<AmqpConfig>,
}

/// Default robot/work situation, keyed by state uid; each entry is a full
/// `StateObjectRow` so the per-request overlay only needs to touch `state`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SituationDefaults {
    #[serde(default)]
    pub robot_situation: BTreeMap<String, StateObjectRow>,
    #[serde(default)]
    pub work_situation: BTreeMap<String, StateObjectRow>,
}

/// Default goal definitions, keyed by definition type (e.g. `"area"`), plus
/// which type applies when a request names none.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalsDefaults {
    #[serde(rename = "defaultType")]
    pub default_type: String,
    #[serde(flatten)]
    pub definitions: BTreeMap<String, AreaDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultParameters {
    pub situations: SituationDefaults,
    pub goals: GoalsDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarsConfig {
    pub database: DatabaseConfig,
    pub default_parameters: DefaultParameters,
}

fn config_not_conform(message: impl Into<String>) -> PlannerError {
    PlannerError::ConfigNotConform {
        origin: vec!["CONFIG"],
        message: message.into(),
    }
}

fn config_missing(message: impl Into<String>) -> PlannerError {
    PlannerError::ConfigMissing {
        origin: vec!["CONFIG"],
        message: message.into(),
    }
}

/// Reads and parses a YAML config file, mapping a missing file to
/// `ConfigMissing` and a parse failure to `ConfigNotConform` (matching
/// `get_config_from_file`'s two distinct failure modes).
pub fn load_yaml<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, PlannerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| config_missing(format!("no such configuration file {path}: {e}")))?;
    serde_yaml::from_str(&content)
        .map_err(|e| config_not_conform(format!("the configuration file {path} is not conform: {e}")))
}

/// Neo4j credentials, read from `DB_USERNAME`/`DB_PASSWORD`. Both must be set.
pub fn db_credentials() -> Result<(String, String), PlannerError> {
    let username = env::var("DB_USERNAME")
        .map_err(|_| config_missing("neo4j credentials parameters are missing, check DB_USERNAME and DB_PASSWORD environment variables"))?;
    let password = env::var("DB_PASSWORD")
        .map_err(|_| config_missing("neo4j credentials parameters are missing, check DB_USERNAME and DB_PASSWORD environment variables"))?;
    Ok((username, password))
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn server_config_path() -> String {
    env_or_default("SERVER_CONFIG", "./config/server.yaml")
}

pub fn mars_config_path() -> String {
    env_or_default("MARS_CONFIG", "./config/mars.yaml")
}

pub fn validation_schema_dir() -> String {
    env_or_default("VALIDATION_SCHEMA_DIR", "./schemas")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_config_missing_not_not_conform() {
        let err = load_yaml::<ServerConfig>("/nonexistent/path.yaml").unwrap_err();
        assert_eq!(err.kind(), "config/missing");
    }

    #[test]
    fn default_type_and_area_definitions_parse_from_flattened_map() {
        let yaml = r#"
defaultType: area
area:
  aircraft_rail: all
  rail_area: flange
"#;
        let goals: GoalsDefaults = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(goals.default_type, "area");
        assert!(goals.definitions.contains_key("area"));
    }
}
