// ============================================================================
//                      MARS BUILD PROCESSOR • SEQUENCE SOLVER
//        Goal-Regression Planning Over The World Situation
// ----------------------------------------------------------------------------
//   Architectural Role:
//       The core of the planner. Given an initial situation and an ordered
//       list of goal actions, repeatedly tries to satisfy the next goal;
//       whenever a goal's preconditions aren't met, it regresses to find a
//       repair action and retries. Ported from `processor/components.py`'s
//       `SequenceSolver`.
//
//   File:        /src/solver.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::data::{DataUnit, GraphClient};
use crate::error::PlannerError;
use crate::model::{Action, Situation};
use crate::query::StateDefinition;
use log::debug;
use std::collections::VecDeque;

/// `{uid -> result}` pairing used to reach into the solved-for state definition
/// and compare it against the previous round's, to detect infinite resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StateDefKey {
    uid: String,
    result: String,
    precondition: Option<String>,
}

impl From<&StateDefinition> for StateDefKey {
    fn from(sd: &StateDefinition) -> Self {
        StateDefKey {
            uid: sd.uid.clone(),
            result: sd.result.clone(),
            precondition: sd.precondition.clone(),
        }
    }
}

/// The goal-regression planner. Holds the live world `Situation`, the goal
/// queue, and a one-slot history used to abort on infinite resolution.
pub struct SequenceSolver<'a, C: GraphClient> {
    data_unit: &'a DataUnit<C>,
    situation: Situation,
    init_situation: Situation,
    goals: VecDeque<Action>,
    history_state_def: Option<StateDefKey>,
}

impl<'a, C: GraphClient> SequenceSolver<'a, C> {
    pub fn new(data_unit: &'a DataUnit<C>) -> Self {
        SequenceSolver {
            data_unit,
            situation: Situation::new(Vec::new()),
            init_situation: Situation::new(Vec::new()),
            goals: VecDeque::new(),
            history_state_def: None,
        }
    }

    /// Resolves `goals` from `init_situation`/`work_situation`, returning the
    /// ordered plan of actions to perform. The goal queue is LIFO: the first
    /// goal given must be the last one off the queue, so the sorted action
    /// list is pushed in reverse and popped from the tail.
    pub async fn resolve(
        &mut self,
        goals: Vec<Action>,
        robot_situation: Situation,
        work_situation: Situation,
    ) -> Result<Vec<Action>, PlannerError> {
        self.goals = goals.into_iter().rev().collect();

        let mut combined = robot_situation.copy();
        for state in work_situation.iter() {
            combined.update(state.clone());
        }
        self.situation = combined;
        self.init_situation = robot_situation;

        let mut plan = Vec::new();

        let mut next = self.next_goal().await?;
        while let Some(action) = next {
            if !action.effect().equals(&self.situation) {
                if self.possible(&action) {
                    self.apply(&action);
                    plan.push(action);
                    next = self.next_goal().await?;
                } else {
                    next = Some(self.expand(action).await?);
                }
            } else {
                next = self.next_goal().await?;
            }
        }

        Ok(plan)
    }

    /// Pops the tail of the goal queue. Once the queue runs dry, if the world
    /// has drifted from the initial robot situation a synthetic "return home"
    /// goal is built from the first divergence and resolved through the
    /// database, so the plan always ends back where the robot started.
    async fn next_goal(&mut self) -> Result<Option<Action>, PlannerError> {
        if let Some(action) = self.goals.pop_back() {
            return Ok(Some(action));
        }

        if self.situation.equals(&self.init_situation) {
            return Ok(None);
        }

        let (result_state, precondition_state) = self
            .init_situation
            .compare(&self.situation)
            .expect("situations differ, compare must find a divergence");

        let state_definition = StateDefinition {
            uid: result_state.uid().to_string(),
            result: result_state.state().to_string(),
            precondition: Some(precondition_state.state().to_string()),
        };

        self.get_action_from_db(&state_definition).await
    }

    /// Regresses `action`'s unmet preconditions to the first action that
    /// repairs them, re-queuing `action` itself to be retried afterward.
    async fn expand(&mut self, action: Action) -> Result<Action, PlannerError> {
        debug!("expand the action {}", action.uid());

        let (result_state, precondition_state) = action
            .preconditions()
            .compare(&self.situation)
            .expect("poss() returned false, compare must find a divergence");

        let state_definition = StateDefinition {
            uid: result_state.uid().to_string(),
            result: result_state.state().to_string(),
            precondition: Some(precondition_state.state().to_string()),
        };

        let key = StateDefKey::from(&state_definition);
        if self.history_state_def.as_ref() == Some(&key) {
            return Err(PlannerError::SolverInfiniteResolution {
                origin: vec!["PROCESS", "SOLVER", "RESOLUTION"],
            });
        }
        self.history_state_def = Some(key);

        let mut repair = self.get_action_from_db(&state_definition).await?;

        if repair.is_none() {
            debug!("action not found with initial situation, extend the search");
            let relaxed = StateDefinition {
                precondition: None,
                ..state_definition.clone()
            };
            repair = self.get_action_from_db(&relaxed).await?;

            if repair.is_none() {
                return Err(PlannerError::SolverNoRepairAction {
                    origin: vec!["PROCESS", "SOLVER", "RESOLUTION"],
                    uid: state_definition.uid,
                    desired_state: state_definition.result,
                });
            }
        }

        self.goals.push_back(action);
        Ok(repair.expect("checked above"))
    }

    /// True if `action`'s preconditions are already satisfied by the world.
    fn possible(&self, action: &Action) -> bool {
        let poss = action.preconditions().equals(&self.situation);
        debug!("possibility to perform action {} -> {poss}", action.uid());
        poss
    }

    /// Applies `action`'s results onto the live world situation.
    fn apply(&mut self, action: &Action) {
        debug!("perform the action {}", action.uid());
        for result in action.results() {
            self.situation.update(result.clone());
        }
    }

    async fn get_action_from_db(&self, state_definition: &StateDefinition) -> Result<Option<Action>, PlannerError> {
        debug!("search in db the action solving situation {:?}", state_definition.uid);
        let mut records = self
            .data_unit
            .get_action_by_state(state_definition)
            .await
            .map_err(|e| e.with_origin("SOLVER"))?;

        if records.is_empty() {
            return Ok(None);
        }
        let action = Action::from_row(records.remove(0))?;
        Ok(Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::FakeGraphClient;
    use crate::model::{Action, ActionRow, Relation, StateObject};
    use serde_json::json;

    fn situation_of(uid: &str, state: &str) -> Situation {
        Situation::new(vec![StateObject::new(uid, Relation::Eq, state, None, 0)])
    }

    fn goal_action(uid: &str, precondition_uid: &str, precondition_state: &str, result_state: &str) -> Action {
        let row: ActionRow = serde_json::from_value(json!({
            "definition": {"uid": uid, "description": uid, "type": "MOVE.TCP.APPROACH"},
            "preconditions": [
                {"definition": {"uid": precondition_uid}, "relation": "eq", "state": precondition_state}
            ],
            "results": [
                {"definition": {"uid": precondition_uid}, "relation": "eq", "state": result_state}
            ],
            "assets": [],
            "position": {"areas": []},
        }))
        .unwrap();
        Action::from_row(row).unwrap()
    }

    #[tokio::test]
    async fn already_satisfied_goal_needs_no_repair() {
        let client = FakeGraphClient::new();
        let data_unit = DataUnit::new(client);
        let mut solver = SequenceSolver::new(&data_unit);

        let goal = goal_action("g1", "tool", "mounted", "used");
        let work_situation = situation_of("tool", "mounted");
        let plan = solver
            .resolve(vec![goal], Situation::new(Vec::new()), work_situation)
            .await
            .unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].uid(), "g1");
    }

    #[tokio::test]
    async fn unmet_precondition_expands_via_db_repair_action() {
        let client = FakeGraphClient::new();
        let repair_record = json!({
            "definition": {"uid": "repair", "description": "mount tool", "type": "LOAD.EFFECTOR"},
            "preconditions": [],
            "results": [
                {"definition": {"uid": "tool"}, "relation": "eq", "state": "mounted"}
            ],
            "assets": [],
            "position": {"areas": []},
        });
        client.queue(vec![repair_record]);

        let data_unit = DataUnit::new(client);
        let mut solver = SequenceSolver::new(&data_unit);

        let goal = goal_action("g1", "tool", "mounted", "parked");
        let work_situation = situation_of("tool", "empty");
        let plan = solver
            .resolve(vec![goal], Situation::new(Vec::new()), work_situation)
            .await
            .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].uid(), "repair");
        assert_eq!(plan[1].uid(), "g1");
    }

    #[tokio::test]
    async fn no_repair_action_in_db_is_a_solver_error() {
        let client = FakeGraphClient::new();
        let data_unit = DataUnit::new(client);
        let mut solver = SequenceSolver::new(&data_unit);

        let goal = goal_action("g1", "tool", "mounted", "parked");
        let robot_situation = situation_of("tool", "empty");
        let err = solver
            .resolve(vec![goal], robot_situation, Situation::new(Vec::new()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "solver/no-repair-action");
    }
}
