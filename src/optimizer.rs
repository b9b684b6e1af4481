// ============================================================================
//                     MARS BUILD PROCESSOR • SEQUENCE OPTIMIZER
//        Schema-Based Plan Rewrites Over The Action-Type Code Alphabet
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Once the solver has produced a valid plan, a small post-pass rewrites
//       it: any probing sub-sequence matching `PROBE_SCHEMA` is promoted to
//       the front of the plan, and any redundant tool-churn sub-sequence
//       matching `REPETITIVE_LU_TOOL_SCHEMA` is dropped from what remains.
//       Ported from `processor/model/optimization.py`.
//
//   File:        /src/optimizer.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::model::Action;
use once_cell::sync::Lazy;
use regex::Regex;

/// Action type -> single-letter code used to render a plan as a string so it
/// can be matched against a schema regex. `LOAD.EFFECTOR`/`UNLOAD.EFFECTOR`
/// share code `E` on purpose: the optimizer only cares that an effector was
/// touched, not which direction, matching the original's ambiguity exactly.
fn action_type_code(action_type: &str) -> Option<char> {
    match action_type {
        "LOAD.EFFECTOR" => Some('E'),
        "MOVE.STATION.TOOL" => Some('T'),
        "MOVE.STATION.WORK" => Some('S'),
        "MOVE.TCP.APPROACH" => Some('A'),
        "MOVE.TCP.CLEARANCE" => Some('C'),
        "MOVE.TCP.WORK" => Some('W'),
        "UNLOAD.EFFECTOR" => Some('E'),
        "WORK.PROBE" => Some('P'),
        "MOVE.STATION.HOME" => Some('H'),
        _ => None,
    }
}

static PROBE_SCHEMA: Lazy<Regex> = Lazy::new(|| Regex::new("(TE){0,1}SAPC").unwrap());
static REPETITIVE_LU_TOOL_SCHEMA: Lazy<Regex> = Lazy::new(|| Regex::new("TEETEE").unwrap());

fn code_string(sequence: &[Action]) -> String {
    sequence
        .iter()
        .map(|action| action_type_code(action.type_()).unwrap_or('?'))
        .collect()
}

/// Drops every non-overlapping `REPETITIVE_LU_TOOL_SCHEMA` match from
/// `sequence` in place. Matches are collected against the string built once
/// up front, then removed back-to-front so earlier ranges stay valid as later
/// ones are dropped.
fn drop_redundant_tool_churn(sequence: &mut Vec<Action>) {
    let codes = code_string(sequence);
    let mut ranges: Vec<(usize, usize)> = REPETITIVE_LU_TOOL_SCHEMA
        .find_iter(&codes)
        .map(|m| (m.start(), m.end()))
        .collect();
    ranges.sort_by(|a, b| b.0.cmp(&a.0));
    for (begin, end) in ranges {
        sequence.drain(begin..end);
    }
}

/// Moves every sub-sequence matching `schema` to `to_index`, running
/// [`drop_redundant_tool_churn`] on whatever remains outside the match.
fn move_sequence_by_schema(schema: &Regex, sequence: Vec<Action>, to_index: usize) -> Vec<Action> {
    let codes = code_string(&sequence);
    let mut taken: Vec<Option<Action>> = sequence.into_iter().map(Some).collect();

    let mut found_sequence = Vec::new();
    let mut other_sequence = Vec::new();
    let mut end = 0usize;

    for m in schema.find_iter(&codes) {
        let begin = m.start();
        for slot in taken.iter_mut().take(begin).skip(end) {
            if let Some(action) = slot.take() {
                other_sequence.push(action);
            }
        }
        end = m.end();
        for slot in taken.iter_mut().take(end).skip(begin) {
            if let Some(action) = slot.take() {
                found_sequence.push(action);
            }
        }
    }
    for slot in taken.iter_mut().skip(end) {
        if let Some(action) = slot.take() {
            other_sequence.push(action);
        }
    }

    drop_redundant_tool_churn(&mut other_sequence);

    let to_index = to_index.min(other_sequence.len());
    let mut result = Vec::with_capacity(found_sequence.len() + other_sequence.len());
    result.extend(other_sequence.drain(..to_index));
    result.extend(found_sequence);
    result.extend(other_sequence);
    result
}

/// Promotes every probing sub-sequence (an optional tool-swap pair followed by
/// station move, approach, probe, clearance) to the front of the plan.
pub fn begin_with_probing(sequence: Vec<Action>) -> Vec<Action> {
    move_sequence_by_schema(&PROBE_SCHEMA, sequence, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActionRow;
    use serde_json::json;

    fn action(uid: &str, type_: &str) -> Action {
        let row: ActionRow = serde_json::from_value(json!({
            "definition": {"uid": uid, "description": uid, "type": type_},
            "preconditions": [],
            "results": [],
            "assets": [],
            "position": {"areas": []},
        }))
        .unwrap();
        Action::from_row(row).unwrap()
    }

    #[test]
    fn action_type_code_maps_load_and_unload_to_same_letter() {
        assert_eq!(action_type_code("LOAD.EFFECTOR"), Some('E'));
        assert_eq!(action_type_code("UNLOAD.EFFECTOR"), Some('E'));
    }

    #[test]
    fn begin_with_probing_moves_probe_schema_to_front() {
        let sequence = vec![
            action("h", "MOVE.STATION.HOME"),
            action("s", "MOVE.STATION.WORK"),
            action("a", "MOVE.TCP.APPROACH"),
            action("p", "WORK.PROBE"),
            action("c", "MOVE.TCP.CLEARANCE"),
            action("w", "MOVE.TCP.WORK"),
        ];
        let optimized = begin_with_probing(sequence);
        let uids: Vec<&str> = optimized.iter().map(|a| a.uid()).collect();
        assert_eq!(uids, vec!["s", "a", "p", "c", "h", "w"]);
    }

    #[test]
    fn begin_with_probing_includes_optional_tool_swap_prefix() {
        let sequence = vec![
            action("t", "MOVE.STATION.TOOL"),
            action("e", "LOAD.EFFECTOR"),
            action("s", "MOVE.STATION.WORK"),
            action("a", "MOVE.TCP.APPROACH"),
            action("p", "WORK.PROBE"),
            action("c", "MOVE.TCP.CLEARANCE"),
        ];
        let optimized = begin_with_probing(sequence);
        let uids: Vec<&str> = optimized.iter().map(|a| a.uid()).collect();
        assert_eq!(uids, vec!["t", "e", "s", "a", "p", "c"]);
    }

    #[test]
    fn redundant_tool_churn_is_dropped_from_the_remainder() {
        let sequence = vec![
            action("t1", "MOVE.STATION.TOOL"),
            action("e1", "LOAD.EFFECTOR"),
            action("e2", "UNLOAD.EFFECTOR"),
            action("t2", "MOVE.STATION.TOOL"),
            action("e3", "LOAD.EFFECTOR"),
            action("e4", "UNLOAD.EFFECTOR"),
            action("w", "MOVE.TCP.WORK"),
        ];
        let optimized = begin_with_probing(sequence);
        let uids: Vec<&str> = optimized.iter().map(|a| a.uid()).collect();
        assert_eq!(uids, vec!["w"]);
    }
}
