// ============================================================================
//                      MARS BUILD PROCESSOR • DATA ACCESS
//        The Graph Client Seam & The Four Canonical Lookups, Typed
// ----------------------------------------------------------------------------
//   Architectural Role:
//       `GraphClient` is the only contract boundary to the out-of-scope graph
//       database driver (spec §1/§2.5). `DataUnit<C>` is generic over it so
//       tests can swap in a fake without touching the query-building or
//       row-parsing logic. Ported from `processor/components.py`'s `DataUnit`.
//
//   File:        /src/data.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::error::PlannerError;
use crate::model::ActionRow;
use crate::query::{self, AreaDefinition, StateDefinition};
use async_trait::async_trait;
use serde_json::Value;

/// A single connection to the graph database, abstracted away from any one
/// driver. Implementors only need to run a Cypher string and hand back the
/// raw records; all typed parsing happens above this seam.
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn run(&self, query: &str) -> Result<Vec<Value>, PlannerError>;
}

/// The four lookups the planner needs from the graph, each parsed straight
/// into `ActionRow` so callers never see a raw JSON record.
pub struct DataUnit<C: GraphClient> {
    client: C,
}

impl<C: GraphClient> DataUnit<C> {
    pub fn new(client: C) -> Self {
        DataUnit { client }
    }

    pub async fn get_work_by_area(&self, area_definition: &AreaDefinition) -> Result<Vec<ActionRow>, PlannerError> {
        let query = query::build_work_by_area(area_definition);
        self.run_and_parse(&query).await
    }

    pub async fn get_station_by_area(&self, area_definition: &AreaDefinition) -> Result<Vec<ActionRow>, PlannerError> {
        let query = query::build_station_by_area(area_definition);
        self.run_and_parse(&query).await
    }

    pub async fn get_approach_by_area(&self, area_definition: &AreaDefinition) -> Result<Vec<ActionRow>, PlannerError> {
        let query = query::build_approach_by_area(area_definition);
        self.run_and_parse(&query).await
    }

    pub async fn get_action_by_state(&self, state_definition: &StateDefinition) -> Result<Vec<ActionRow>, PlannerError> {
        let query = query::build_action_by_state(state_definition);
        self.run_and_parse(&query).await
    }

    async fn run_and_parse(&self, query: &str) -> Result<Vec<ActionRow>, PlannerError> {
        let records = self.client.run(query).await.map_err(|e| e.with_origin("DATA"))?;
        records
            .into_iter()
            .map(|record| {
                serde_json::from_value(record).map_err(|e| PlannerError::ModelParseError {
                    origin: vec!["DATA", "PARSING"],
                    uid: "<unknown>".to_string(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}
