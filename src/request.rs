// ============================================================================
//                    MARS BUILD PROCESSOR • REQUEST / RESPONSE DTOs
//        Wire Shapes & The Default-Overlay Merge Rule
// ----------------------------------------------------------------------------
//   Architectural Role:
//       A build request optionally overrides the configured default initial
//       situation and/or goal definition; this module implements that overlay
//       exactly once so both the HTTP and AMQP front ends share it. Ported
//       from `build_processor.py`'s `build_situation_definition` and
//       `build_goals_definition`.
//
//   File:        /src/request.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::config::{GoalsDefaults, SituationDefaults};
use crate::error::PlannerError;
use crate::model::{ActionDto, Relation, Situation, StateObject, StateObjectRow};
use crate::query::{AreaDefinition, AreaValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitialSituationDto {
    #[serde(rename = "workSituation", default)]
    pub work_situation: Option<BTreeMap<String, String>>,
    #[serde(rename = "robotSituation", default)]
    pub robot_situation: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalsDefinitionDto {
    #[serde(rename = "definitionType", default)]
    pub definition_type: Option<String>,
    #[serde(default)]
    pub definition: Option<BTreeMap<String, AreaValue>>,
    /// Which sequence target (`work`/`station`/`approach`) to build.
    /// The HTTP front end reads this from the URL path instead; the AMQP
    /// front end has no path, so it reads this field of the body.
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildRequestBody {
    #[serde(rename = "initialSituation", default)]
    pub initial_situation: Option<InitialSituationDto>,
    #[serde(rename = "goalsDefinition", default)]
    pub goals_definition: Option<GoalsDefinitionDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResponseBody {
    #[serde(rename = "buildProcess")]
    pub build_process: Vec<ActionDto>,
}

/// `Success` serializes as its inner body with no wrapper (`{"buildProcess":
/// [...]}`); `Fail` serializes as `{"status":"FAIL","error":{...}}`. The two
/// shapes share no tag, so the variants are untagged rather than sharing one.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope<T: Serialize> {
    Success(T),
    Fail { status: &'static str, error: ErrorBody },
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub origin: Vec<&'static str>,
    pub message: String,
}

impl From<&PlannerError> for ErrorBody {
    fn from(error: &PlannerError) -> Self {
        ErrorBody {
            kind: error.kind(),
            origin: error.origin().to_vec(),
            message: error.to_string(),
        }
    }
}

fn overlay_state(defaults: &BTreeMap<String, StateObjectRow>, overrides: &BTreeMap<String, String>) -> BTreeMap<String, StateObjectRow> {
    let mut merged = defaults.clone();
    for (uid, value) in overrides {
        if let Some(row) = merged.get_mut(uid) {
            row.state = value.clone();
            row.relation = Relation::Eq;
        }
    }
    merged
}

/// Builds the robot/work `Situation`s for a request, overlaying any
/// `initialSituation` override from the body onto the configured defaults.
pub fn build_situation_definition(
    defaults: &SituationDefaults,
    body: &BuildRequestBody,
) -> Result<(Situation, Situation), PlannerError> {
    let overrides = body.initial_situation.as_ref();

    let robot_rows = match overrides.and_then(|s| s.robot_situation.as_ref()) {
        Some(overlay) => overlay_state(&defaults.robot_situation, overlay),
        None => defaults.robot_situation.clone(),
    };
    let work_rows = match overrides.and_then(|s| s.work_situation.as_ref()) {
        Some(overlay) => overlay_state(&defaults.work_situation, overlay),
        None => defaults.work_situation.clone(),
    };

    let robot_states = robot_rows
        .into_values()
        .map(StateObject::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let work_states = work_rows
        .into_values()
        .map(StateObject::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((Situation::new(robot_states), Situation::new(work_states)))
}

/// Picks the goal definition type and area definition for a request: the
/// body's `goalsDefinition`, overlaid on the configured default for that
/// type, or the configured default type entirely when the body names none.
pub fn build_goals_definition(
    defaults: &GoalsDefaults,
    body: &BuildRequestBody,
) -> Result<(String, AreaDefinition), PlannerError> {
    match body.goals_definition.as_ref().and_then(|g| g.definition_type.clone()) {
        Some(definition_type) => {
            let mut area_definition = defaults
                .definitions
                .get(&definition_type)
                .cloned()
                .ok_or_else(|| PlannerError::BodyInvalid {
                    origin: vec!["REQUEST", "VALIDATION"],
                    message: format!("unknown goals definition type '{definition_type}'"),
                })?;

            if let Some(overlay) = body.goals_definition.as_ref().and_then(|g| g.definition.clone()) {
                area_definition.extend(overlay);
            }

            Ok((definition_type, area_definition))
        }
        None => {
            let definition_type = defaults.default_type.clone();
            let area_definition = defaults
                .definitions
                .get(&definition_type)
                .cloned()
                .ok_or_else(|| PlannerError::ConfigNotConform {
                    origin: vec!["CONFIG", "GOALS"],
                    message: format!("default goals type '{definition_type}' has no definition"),
                })?;
            Ok((definition_type, area_definition))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn default_situations() -> SituationDefaults {
        let row: StateObjectRow = serde_json::from_value(json!({
            "definition": {"uid": "tool", "description": "tool state"},
            "relation": "eq",
            "state": "empty",
            "priority": 0
        }))
        .unwrap();
        let mut robot = BTreeMap::new();
        robot.insert("tool".to_string(), row);
        SituationDefaults {
            robot_situation: robot,
            work_situation: BTreeMap::new(),
        }
    }

    #[test]
    fn overlay_applies_only_named_uids_and_forces_eq() {
        let defaults = default_situations();
        let mut overrides = BTreeMap::new();
        overrides.insert("tool".to_string(), "mounted".to_string());
        let body = BuildRequestBody {
            initial_situation: Some(InitialSituationDto {
                robot_situation: Some(overrides),
                work_situation: None,
            }),
            goals_definition: None,
        };
        let (robot, _work) = build_situation_definition(&defaults, &body).unwrap();
        assert_eq!(robot.get("tool").unwrap().state(), "mounted");
        assert_eq!(robot.get("tool").unwrap().relation(), Relation::Eq);
    }

    #[test]
    fn missing_body_falls_back_to_defaults_unchanged() {
        let defaults = default_situations();
        let body = BuildRequestBody::default();
        let (robot, _work) = build_situation_definition(&defaults, &body).unwrap();
        assert_eq!(robot.get("tool").unwrap().state(), "empty");
    }
}
