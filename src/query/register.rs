// ============================================================================
//                   MARS BUILD PROCESSOR • CANONICAL LOOKUP QUERIES
//        The Four Graph Lookups The Data Unit Exposes
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Each lookup composes the shared preconditions/results/assets/position
//       sub-queries after a primary selector, keeping the `Action` parser a
//       single function regardless of which lookup produced the row. Ported
//       from `processor/db/queries/register.py`.
//
//   File:        /src/query/register.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::query::clause::{DbPipeline, DbQuery, LogicList, LogicOperator};
use serde::Deserialize;
use std::collections::BTreeMap;

/// `"all"` means "no filter on this area component"; anything else is either a
/// single uid or a list of candidate uids (OR'd together).
#[derive(Debug, Clone)]
pub enum AreaValue {
    All,
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for AreaValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Uid(String),
            Many(Vec<String>),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Uid(uid) if uid == "all" => AreaValue::All,
            Raw::Uid(uid) => AreaValue::One(uid),
            Raw::Many(uids) => AreaValue::Many(uids),
        })
    }
}

pub type AreaDefinition = BTreeMap<String, AreaValue>;

/// `{uid, result, precondition}` describing a state transition to repair.
#[derive(Debug, Clone)]
pub struct StateDefinition {
    pub uid: String,
    pub result: String,
    pub precondition: Option<String>,
}

fn build_preconditions() -> DbQuery {
    let mut q = DbQuery::new();
    q.input_clause.add("action");
    q.match_clause
        .add("(action)<-[precondition:PRECONDITION]-(precond_state:Resource:StateObject)");
    q.with_clause.add(
        "collect({state:precondition.state, relation:precondition.relation, priority:precondition.priority, definition:properties(precond_state)})",
        Some("preconditions"),
    );
    q.return_clause.add("preconditions");
    q
}

fn build_results() -> DbQuery {
    let mut q = DbQuery::new();
    q.input_clause.add("action");
    q.match_clause
        .add("(action)-[result:RESULT]->(result_state:Resource:StateObject)");
    q.with_clause.add(
        "collect({definition:properties(result_state), state:result.state, relation:result.relation})",
        Some("results"),
    );
    q.return_clause.add("results");
    q
}

fn build_assets() -> DbQuery {
    let mut q = DbQuery::new();
    q.input_clause.add("action");
    q.match_clause.add("(action)-[:PERFORM_BY]->(asset:Resource:Asset)");
    q.with_clause.add(
        "collect({definition: properties(asset), type: labels(asset)})",
        Some("assets"),
    );
    q.return_clause.add("assets");
    q
}

fn build_action_position() -> DbQuery {
    let mut q = DbQuery::new();
    q.input_clause.add("action");
    q.match_clause.add("(action)-[:TO_REACH]->(area:Process:Area)");
    q.with_clause.add(
        "{areas: collect({reference: area.reference, type: area.type, uid: area.uid})}",
        Some("position"),
    );
    q.return_clause.add("position");
    q
}

fn area_uid_exists(node: &str, relation: &str, uid: &str) -> String {
    format!("exists(({node})-[:{relation}]->(:Process:Area{{uid:'{uid}'}}))")
}

fn build_area_where(node: &str, relation: &str, area_definition: &AreaDefinition) -> LogicList {
    let mut where_and = LogicList::new(LogicOperator::And);
    for value in area_definition.values() {
        match value {
            AreaValue::All => {}
            AreaValue::One(uid) => {
                where_and.add(area_uid_exists(node, relation, uid));
            }
            AreaValue::Many(uids) => {
                let mut where_or = LogicList::new(LogicOperator::Or);
                for uid in uids {
                    where_or.add(area_uid_exists(node, relation, uid));
                }
                where_and.add_nested(where_or);
            }
        }
    }
    where_and
}

fn build_appst_by_area(action_type: &str, area_definition: &AreaDefinition) -> DbPipeline {
    let mut pipeline = DbPipeline::new();

    let mut action = DbQuery::new();
    action
        .match_clause
        .add(format!("(action:Resource:Action{{type:\"{action_type}\"}})"));
    action.return_clause.add("action");
    let where_and = build_area_where("action", "TO_REACH", area_definition);
    for node in where_and.build() {
        action.where_clause.add(node);
    }

    pipeline.add(action);
    pipeline.add(build_preconditions());
    pipeline.add(build_results());
    pipeline.add(build_assets());
    pipeline.add(build_action_position());

    pipeline.with_clause.add("properties(action)", Some("definition"));
    pipeline.with_clause.add("preconditions", None);
    pipeline.with_clause.add("results", None);
    pipeline.with_clause.add("assets", None);
    pipeline.with_clause.add("position", None);

    pipeline.return_clause.add("definition");
    pipeline.return_clause.add("preconditions");
    pipeline.return_clause.add("results");
    pipeline.return_clause.add("assets");
    pipeline.return_clause.add("position");

    pipeline
}

fn build_state_object_where(state_definition: &StateDefinition) -> LogicList {
    let mut where_and = LogicList::new(LogicOperator::And);
    where_and.add(format!("state_object.uid = \"{}\"", state_definition.uid));
    where_and.add(format!("result.state = \"{}\"", state_definition.result));

    if let Some(precondition) = &state_definition.precondition {
        let mut pre_or = LogicList::new(LogicOperator::Or);
        let mut eq_pre_and = LogicList::new(LogicOperator::And);
        eq_pre_and.add("precondition.relation = \"eq\"");
        eq_pre_and.add(format!("precondition.state = \"{precondition}\""));

        let mut neq_pre_and = LogicList::new(LogicOperator::And);
        neq_pre_and.add("precondition.relation = \"neq\"");
        neq_pre_and.add(format!("precondition.state = \"{}\"", state_definition.result));

        pre_or.add_nested(eq_pre_and);
        pre_or.add_nested(neq_pre_and);
        where_and.add_nested(pre_or);
    }

    where_and
}

pub fn build_action_by_state(state_definition: &StateDefinition) -> String {
    let mut pipeline = DbPipeline::new();
    let mut action = DbQuery::new();

    action.match_clause.add(
        "(state_object:StateObject)-[precondition:PRECONDITION]->(action:Action)-[result:RESULT]->(state_object)",
    );
    for node in build_state_object_where(state_definition).build() {
        action.where_clause.add(node);
    }
    action.return_clause.add("action");

    pipeline.add(action);
    pipeline.add(build_preconditions());
    pipeline.add(build_results());
    pipeline.add(build_assets());

    pipeline.with_clause.add("properties(action)", Some("definition"));
    pipeline.with_clause.add("preconditions", None);
    pipeline.with_clause.add("results", None);
    pipeline.with_clause.add("assets", None);

    pipeline.return_clause.add("definition");
    pipeline.return_clause.add("preconditions");
    pipeline.return_clause.add("results");
    pipeline.return_clause.add("assets");

    pipeline.build()
}

pub fn build_approach_by_area(area_definition: &AreaDefinition) -> String {
    build_appst_by_area("MOVE.TCP.APPROACH", area_definition).build()
}

pub fn build_station_by_area(area_definition: &AreaDefinition) -> String {
    build_appst_by_area("MOVE.STATION.WORK", area_definition).build()
}

pub fn build_work_by_area(area_definition: &AreaDefinition) -> String {
    let mut pipeline = DbPipeline::new();

    let mut assembly = DbQuery::new();
    assembly
        .match_clause
        .add("(assembly:Product:Assembly)-[:LOCALIZED_IN]->(area:Process:Area)");
    for node in build_area_where("assembly", "LOCALIZED_IN", area_definition).build() {
        assembly.where_clause.add(node);
    }
    assembly.with_clause.add("assembly.uid", Some("uid"));
    assembly.with_clause.add(
        "{coordinates: {x:assembly.origin.x, y:assembly.origin.y, z:assembly.origin.z}, areas:collect({reference: area.reference, type: area.type, uid: area.uid})}",
        Some("position"),
    );
    assembly.with_clause.add(
        "collect({reference: area.reference, type: area.type, uid: area.uid})",
        Some("areas"),
    );
    assembly.return_clause.add("uid");
    assembly.return_clause.add("position");
    assembly.return_clause.add("areas");

    let mut action = DbQuery::new();
    action.input_clause.add("uid");
    action.match_clause.add(
        "(action:Resource:Action{type:\"MOVE.TCP.WORK\"})-[result:RESULT]->(so:Resource:StateObject{uid:\"tcp_work\"})",
    );
    action.where_clause.add("result.state in uid");
    action.return_clause.add("action");

    pipeline.add(assembly);
    pipeline.add(action);
    pipeline.add(build_preconditions());
    pipeline.add(build_results());
    pipeline.add(build_assets());

    pipeline.with_clause.add("properties(action)", Some("definition"));
    pipeline.with_clause.add("preconditions", None);
    pipeline.with_clause.add("results", None);
    pipeline.with_clause.add("assets", None);
    pipeline.with_clause.add("position", None);

    pipeline.return_clause.add("definition");
    pipeline.return_clause.add("preconditions");
    pipeline.return_clause.add("results");
    pipeline.return_clause.add("assets");
    pipeline.return_clause.add("position");

    pipeline.build()
}
