// ============================================================================
//                   MARS BUILD PROCESSOR • WORLD STATE MODEL
//        StateObject Relation Semantics & Ordered Situation Collections
// ----------------------------------------------------------------------------
//   Architectural Role:
//       A `Situation` is the planner's model of the world: an ordered set of
//       `StateObject` facts. Equality between two `StateObject`s is computed
//       by applying the *left* operand's relation, which is the asymmetry the
//       whole solver depends on (a goal's precondition-side `Situation` is
//       satisfied by a world that merely contains no contradiction, not by an
//       exact match).
//
//   File:        /src/model/situation.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::error::PlannerError;
use serde::Deserialize;

/// Relation tag on a `StateObject` (REDESIGN FLAG: a two-variant tag, not a
/// stored method reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Eq,
    Neq,
}

impl Relation {
    /// Applies the relation to a (self, other) pair of raw state strings.
    pub fn apply(self, self_state: &str, other_state: &str) -> bool {
        match self {
            Relation::Eq => self_state == other_state,
            Relation::Neq => self_state != other_state,
        }
    }
}

/// Wire shape for a single state-object row, as produced by the graph lookups
/// or accepted in a request body.
#[derive(Debug, Clone, Deserialize)]
pub struct StateObjectRow {
    pub definition: StateObjectDefinition,
    pub relation: Relation,
    pub state: String,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateObjectDefinition {
    pub uid: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A single world fact.
#[derive(Debug, Clone)]
pub struct StateObject {
    uid: String,
    relation: Relation,
    state: String,
    description: Option<String>,
    priority: i32,
}

impl StateObject {
    pub fn new(
        uid: impl Into<String>,
        relation: Relation,
        state: impl Into<String>,
        description: Option<String>,
        priority: i32,
    ) -> Self {
        StateObject {
            uid: uid.into(),
            relation,
            state: state.into(),
            description,
            priority,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn from_row(row: StateObjectRow) -> Result<Self, PlannerError> {
        Ok(StateObject::new(
            row.definition.uid,
            row.relation,
            row.state,
            row.definition.description,
            row.priority.unwrap_or(0),
        ))
    }
}

/// Equality is asymmetric on purpose: `self`'s relation decides.
///
/// `a == b` is *not* the same comparison as `b == a` unless both sides carry
/// the same relation — this is the one place callers must be careful about
/// which operand is "the left one" (spec §4.1/§4.5: it is always the
/// precondition side).
impl PartialEq for StateObject {
    fn eq(&self, other: &Self) -> bool {
        self.relation.apply(&self.state, &other.state)
    }
}

/// An ordered collection of `StateObject`s, sorted ascending by priority, at
/// most one `StateObject` per `uid`.
#[derive(Debug, Clone, Default)]
pub struct Situation {
    state_objects: Vec<StateObject>,
}

impl Situation {
    pub fn new(mut state_objects: Vec<StateObject>) -> Self {
        // last write per uid wins, matching `update`'s insert-or-replace semantics
        let mut deduped: Vec<StateObject> = Vec::with_capacity(state_objects.len());
        for so in state_objects.drain(..) {
            if let Some(existing) = deduped.iter_mut().find(|e: &&mut StateObject| e.uid == so.uid) {
                *existing = so;
            } else {
                deduped.push(so);
            }
        }
        deduped.sort_by_key(|so| so.priority);
        Situation {
            state_objects: deduped,
        }
    }

    pub fn from_rows(rows: Vec<StateObjectRow>) -> Result<Self, PlannerError> {
        let states = rows
            .into_iter()
            .map(StateObject::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_origin("SITUATION"))?;
        Ok(Situation::new(states))
    }

    pub fn get(&self, uid: &str) -> Option<&StateObject> {
        self.state_objects.iter().find(|so| so.uid == uid)
    }

    /// Inserts a `StateObject`, replacing any existing entry with the same uid,
    /// and keeps the collection sorted by priority.
    pub fn update(&mut self, state_object: StateObject) {
        if let Some(existing) = self
            .state_objects
            .iter_mut()
            .find(|so| so.uid == state_object.uid)
        {
            *existing = state_object;
        } else {
            self.state_objects.push(state_object);
        }
        self.state_objects.sort_by_key(|so| so.priority);
    }

    /// Independent clone of this situation.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateObject> {
        self.state_objects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.state_objects.is_empty()
    }

    /// `uid`s present in `self` that are missing on `other` impose no constraint:
    /// this is how a small precondition `Situation` is checked against the full
    /// world `Situation`. Call this with the precondition side as `self`.
    pub fn equals(&self, other: &Situation) -> bool {
        for self_state in &self.state_objects {
            if let Some(other_state) = other.get(&self_state.uid) {
                if self_state != other_state {
                    return false;
                }
            }
        }
        true
    }

    /// First mismatching `(self_state, other_state)` pair in priority order, or
    /// `None` if every shared `uid` agrees.
    pub fn compare<'a>(&'a self, other: &'a Situation) -> Option<(&'a StateObject, &'a StateObject)> {
        for self_state in &self.state_objects {
            if let Some(other_state) = other.get(&self_state.uid) {
                if self_state != other_state {
                    return Some((self_state, other_state));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn so(uid: &str, relation: Relation, state: &str, priority: i32) -> StateObject {
        StateObject::new(uid, relation, state, None, priority)
    }

    #[test]
    fn eq_relation_is_string_equality() {
        let a = so("tool", Relation::Eq, "mounted", 0);
        let b = so("tool", Relation::Eq, "mounted", 0);
        let c = so("tool", Relation::Eq, "empty", 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn neq_on_left_holds_iff_strings_differ() {
        let goal_side = so("tool", Relation::Neq, "parked", 0);
        let world_parked = so("tool", Relation::Eq, "parked", 0);
        let world_moving = so("tool", Relation::Eq, "moving", 0);
        assert_ne!(goal_side, world_parked);
        assert_eq!(goal_side, world_moving);
    }

    #[test]
    fn situation_equals_ignores_missing_on_other() {
        let precondition = Situation::new(vec![so("tool", Relation::Eq, "mounted", 0)]);
        let world = Situation::new(vec![]);
        assert!(precondition.equals(&world));
    }

    #[test]
    fn situation_equals_short_circuits_on_first_mismatch() {
        let precondition = Situation::new(vec![
            so("a", Relation::Eq, "1", 0),
            so("b", Relation::Eq, "2", 1),
        ]);
        let world = Situation::new(vec![
            so("a", Relation::Eq, "1", 0),
            so("b", Relation::Eq, "x", 1),
        ]);
        assert!(!precondition.equals(&world));
    }

    #[test]
    fn compare_returns_lowest_priority_divergence() {
        let a = Situation::new(vec![
            so("low", Relation::Eq, "1", 0),
            so("high", Relation::Eq, "2", 5),
        ]);
        let b = Situation::new(vec![
            so("low", Relation::Eq, "other", 0),
            so("high", Relation::Eq, "other", 5),
        ]);
        let (self_state, _) = a.compare(&b).expect("should diverge");
        assert_eq!(self_state.uid(), "low");
    }

    #[test]
    fn update_replaces_existing_uid_and_keeps_priority_order() {
        let mut situation = Situation::new(vec![
            so("b", Relation::Eq, "2", 5),
            so("a", Relation::Eq, "1", 0),
        ]);
        situation.update(so("a", Relation::Eq, "changed", 0));
        let uids: Vec<&str> = situation.iter().map(|s| s.uid()).collect();
        assert_eq!(uids, vec!["a", "b"]);
        assert_eq!(situation.get("a").unwrap().state(), "changed");
    }
}
