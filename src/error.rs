// ============================================================================
//                    MARS BUILD PROCESSOR • ERROR TAXONOMY
//        Structured, Matchable Error Kinds With An Origin Stack
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Every failure mode named by the planning pipeline is represented as a
//       variant of `PlannerError`. Each variant carries an `origin` stack that
//       successive layers extend as the error ascends, so the adapter at the
//       HTTP/AMQP boundary can render `[DB, DRIVER, QUERY] -> [PROCESS, SOLVER]`
//       style traces without re-deriving them.
//
//   File:        /src/error.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use thiserror::Error;

/// One failure kind from the taxonomy in spec §7, each carrying the tag stack
/// that identifies which layers the error passed through.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("[{}] required configuration is missing: {message}", origin.join("."))]
    ConfigMissing {
        origin: Vec<&'static str>,
        message: String,
    },

    #[error("[{}] configuration is not conform: {message}", origin.join("."))]
    ConfigNotConform {
        origin: Vec<&'static str>,
        message: String,
    },

    #[error("[{}] request body failed validation: {message}", origin.join("."))]
    BodyInvalid {
        origin: Vec<&'static str>,
        message: String,
    },

    #[error("[{}] request carries unexpected url parameters", origin.join("."))]
    UrlInvalid { origin: Vec<&'static str> },

    #[error("[{}] graph database is not reachable: {message}", origin.join("."))]
    DbNotReachable {
        origin: Vec<&'static str>,
        message: String,
    },

    #[error("[{}] row is missing required keys for uid {uid}: {message}", origin.join("."))]
    ModelParseError {
        origin: Vec<&'static str>,
        uid: String,
        message: String,
    },

    #[error("[{}] unable to solve the problem: infinite resolution", origin.join("."))]
    SolverInfiniteResolution { origin: Vec<&'static str> },

    #[error("[{}] unable to solve the problem: no action repairs {uid} -> {desired_state}", origin.join("."))]
    SolverNoRepairAction {
        origin: Vec<&'static str>,
        uid: String,
        desired_state: String,
    },
}

impl PlannerError {
    /// Pushes a tag onto this error's origin stack, as it ascends through a layer.
    pub fn with_origin(mut self, tag: &'static str) -> Self {
        match &mut self {
            PlannerError::ConfigMissing { origin, .. }
            | PlannerError::ConfigNotConform { origin, .. }
            | PlannerError::BodyInvalid { origin, .. }
            | PlannerError::UrlInvalid { origin }
            | PlannerError::DbNotReachable { origin, .. }
            | PlannerError::ModelParseError { origin, .. }
            | PlannerError::SolverInfiniteResolution { origin }
            | PlannerError::SolverNoRepairAction { origin, .. } => origin.push(tag),
        }
        self
    }

    pub fn origin(&self) -> &[&'static str] {
        match self {
            PlannerError::ConfigMissing { origin, .. }
            | PlannerError::ConfigNotConform { origin, .. }
            | PlannerError::BodyInvalid { origin, .. }
            | PlannerError::UrlInvalid { origin }
            | PlannerError::DbNotReachable { origin, .. }
            | PlannerError::ModelParseError { origin, .. }
            | PlannerError::SolverInfiniteResolution { origin }
            | PlannerError::SolverNoRepairAction { origin, .. } => origin,
        }
    }

    /// Short machine-readable kind tag, used to pick an HTTP status code.
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerError::ConfigMissing { .. } => "config/missing",
            PlannerError::ConfigNotConform { .. } => "config/not-conform",
            PlannerError::BodyInvalid { .. } => "validation/body-invalid",
            PlannerError::UrlInvalid { .. } => "validation/url-invalid",
            PlannerError::DbNotReachable { .. } => "db/not-reachable",
            PlannerError::ModelParseError { .. } => "model/parse-error",
            PlannerError::SolverInfiniteResolution { .. } => "solver/infinite-resolution",
            PlannerError::SolverNoRepairAction { .. } => "solver/no-repair-action",
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_stack_extends_in_ascension_order() {
        let err = PlannerError::DbNotReachable {
            origin: vec!["DB", "DRIVER"],
            message: "timeout".into(),
        }
        .with_origin("QUERY")
        .with_origin("PROCESS");

        assert_eq!(err.origin(), &["DB", "DRIVER", "QUERY", "PROCESS"]);
        assert_eq!(err.kind(), "db/not-reachable");
    }
}
