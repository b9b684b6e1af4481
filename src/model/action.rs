// ============================================================================
//                     MARS BUILD PROCESSOR • ACTION MODEL
//        Immutable Robot Actions, Assets & Derived Effect Situations
// ----------------------------------------------------------------------------
//   Architectural Role:
//       An `Action` bundles a precondition `Situation`, a list of result state
//       deltas, the assets it uses, and an open metadata bag (notably the
//       `position` used for pre-sorting). `Action`s are parsed once from a
//       strict row shape and never mutated afterward.
//
//   File:        /src/model/action.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::error::PlannerError;
use crate::model::situation::{Situation, StateObject, StateObjectRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Strict row shape consumed by the `Action` parser, stable across all four
/// lookup kinds (REDESIGN FLAG "Dict-as-action-row").
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRow {
    pub definition: ActionDefinition,
    pub preconditions: Vec<StateObjectRow>,
    pub results: Vec<StateObjectRow>,
    pub assets: Vec<AssetRow>,
    #[serde(default)]
    pub position: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionDefinition {
    pub uid: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetRow {
    /// Graph labels on the asset node, e.g. `["Asset", "Resource", "Effector"]`;
    /// the concrete type is whatever remains after stripping the generic
    /// `Asset`/`Resource` labels (ported from `marsnode.py`'s `Asset.from_dict`).
    #[serde(rename = "type")]
    pub type_labels: Vec<String>,
    pub definition: AssetDefinition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetDefinition {
    pub uid: String,
    pub description: String,
    pub interface: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub uid: String,
    pub description: String,
    pub type_: String,
    pub interface: String,
}

impl Asset {
    pub fn from_row(row: AssetRow) -> Result<Self, PlannerError> {
        let concrete_type = row
            .type_labels
            .into_iter()
            .find(|label| label != "Asset" && label != "Resource")
            .ok_or_else(|| PlannerError::ModelParseError {
                origin: vec!["ASSET", "PARSING"],
                uid: row.definition.uid.clone(),
                message: "asset carries no concrete type label besides Asset/Resource".into(),
            })?;

        Ok(Asset {
            uid: row.definition.uid,
            description: row.definition.description,
            type_: concrete_type,
            interface: row.definition.interface,
        })
    }
}

/// An immutable robot action: preconditions, result deltas, assets used, and
/// open metadata (notably `position`, parsed lazily only when sorting).
#[derive(Debug, Clone)]
pub struct Action {
    uid: String,
    description: String,
    type_: String,
    assets: Vec<Asset>,
    preconditions: Situation,
    results: Vec<StateObject>,
    metadata: serde_json::Map<String, Value>,
}

impl Action {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn preconditions(&self) -> &Situation {
        &self.preconditions
    }

    pub fn results(&self) -> &[StateObject] {
        &self.results
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// The situation produced by applying every result on top of preconditions.
    /// Computed on demand; `preconditions` is never mutated.
    pub fn effect(&self) -> Situation {
        let mut effect = self.preconditions.copy();
        for result in &self.results {
            effect.update(result.clone());
        }
        effect
    }

    pub fn from_row(row: ActionRow) -> Result<Self, PlannerError> {
        let uid = row.definition.uid.clone();
        let wrap_origin = |e: PlannerError| e.with_origin("ACTION");

        let assets = row
            .assets
            .into_iter()
            .map(Asset::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(wrap_origin)?;

        let preconditions = Situation::from_rows(row.preconditions).map_err(wrap_origin)?;

        let results = row
            .results
            .into_iter()
            .map(StateObject::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(wrap_origin)?;

        let mut metadata = serde_json::Map::new();
        if let Some(position) = row.position {
            metadata.insert("position".to_string(), position);
        }

        Ok(Action {
            uid,
            description: row.definition.description,
            type_: row.definition.type_,
            assets,
            preconditions,
            results,
            metadata,
        })
    }

    /// Row shape mirrored back out for serialization in a response.
    pub fn to_dto(&self) -> ActionDto {
        ActionDto {
            uid: self.uid.clone(),
            description: self.description.clone(),
            type_: self.type_.clone(),
            assets: self
                .assets
                .iter()
                .map(|a| AssetDto {
                    uid: a.uid.clone(),
                    description: a.description.clone(),
                    interface: a.interface.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetDto {
    pub uid: String,
    pub description: String,
    pub interface: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionDto {
    pub uid: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub assets: Vec<AssetDto>,
}
