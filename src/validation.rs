// ============================================================================
//                     MARS BUILD PROCESSOR • REQUEST VALIDATION
//        JSON Schema Validation Keyed By URL Path
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Every request body is validated against a schema selected by the
//       request's URL path before any handler runs, matching
//       `server/validation.py`'s `Validator` and its `$paths`-keyed schema
//       loading convention from `utils.py`'s `get_validation_schemas`.
//
//   File:        /src/validation.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::error::PlannerError;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Schemas keyed by the URL path they validate, each schema file having
/// declared its own applicable paths via a `$paths` array. Schemas are
/// compiled once at startup against the process's whole lifetime (the
/// parsed document is leaked so `JSONSchema`'s borrow never has to be
/// threaded through the map).
pub struct RequestValidator {
    schemas: HashMap<String, Arc<JSONSchema<'static>>>,
}

impl RequestValidator {
    pub fn new() -> Self {
        RequestValidator {
            schemas: HashMap::new(),
        }
    }

    fn add_schema(&mut self, path: String, schema: Arc<JSONSchema<'static>>) {
        self.schemas.insert(path, schema);
    }

    /// Validates `body` against the schema registered for `path`. An empty
    /// body validates against `{}`, matching the original's
    /// `body = {} if not body else body`.
    pub fn validate(&self, path: &str, body: &Value) -> Result<(), PlannerError> {
        let schema = self.schemas.get(path).ok_or_else(|| PlannerError::ConfigNotConform {
            origin: vec!["SERVER"],
            message: format!("no validation schema for url {path}, check your schema directory"),
        })?;

        schema.validate(body).map_err(|errors| {
            let message = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            PlannerError::BodyInvalid {
                origin: vec!["REQUEST", "VALIDATION"],
                message,
            }
        })
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads every `*.schema.json` file under `schemas_dir`, registering each one
/// for all paths listed in its `$paths` key.
pub fn load_validation_schemas(schemas_dir: &str) -> Result<RequestValidator, PlannerError> {
    let mut validator = RequestValidator::new();

    let entries = std::fs::read_dir(schemas_dir).map_err(|e| PlannerError::ConfigMissing {
        origin: vec!["VALIDATION_SCHEMA"],
        message: format!("validation schema directory {schemas_dir} not found: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["VALIDATION_SCHEMA"],
            message: e.to_string(),
        })?;
        let file_path = entry.path();
        if !is_schema_file(&file_path) {
            continue;
        }

        let content = std::fs::read_to_string(&file_path).map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["VALIDATION_SCHEMA"],
            message: format!("could not read {}: {e}", file_path.display()),
        })?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["VALIDATION_SCHEMA"],
            message: format!("validation schema file {} is not valid, json format not conform\n{e}", file_path.display()),
        })?;

        // schemas are loaded once at startup and live for the server's whole
        // lifetime, so leaking the parsed document lets `JSONSchema` borrow
        // it without threading an owner through the validator map.
        let raw: &'static Value = Box::leak(Box::new(raw));

        let paths = raw.get("$paths").and_then(Value::as_array).ok_or_else(|| PlannerError::ConfigNotConform {
            origin: vec!["VALIDATION_SCHEMA"],
            message: format!("validation schema file {} is not valid, key '$paths' is missing", file_path.display()),
        })?;

        let compiled = Arc::new(JSONSchema::compile(raw).map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["VALIDATION_SCHEMA"],
            message: format!("validation schema file {} does not compile: {e}", file_path.display()),
        })?);

        for path in paths {
            if let Some(path_str) = path.as_str() {
                validator.add_schema(path_str.to_string(), Arc::clone(&compiled));
            }
        }
    }

    Ok(validator)
}

fn is_schema_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".schema.json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unregistered_path_is_config_not_conform() {
        let validator = RequestValidator::new();
        let err = validator.validate("/sequence/work", &json!({})).unwrap_err();
        assert_eq!(err.kind(), "config/not-conform");
    }
}
