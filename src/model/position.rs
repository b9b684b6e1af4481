// ============================================================================
//                  MARS BUILD PROCESSOR • POSITION SCORING & PRE-SORT
//        Area/Coordinate Scalar Scoring & Stable Position-Based Pre-Sort
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Every action produced by an area lookup carries `position` metadata.
//       This module turns that metadata into a deterministic scalar score and
//       stable-sorts the goal list by it before the solver ever runs, matching
//       `processor/model/scoring.py`'s `Position`/`Area`/`Coordinates` scoring.
//
//   File:        /src/model/position.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::error::PlannerError;
use crate::model::action::Action;
use serde::Deserialize;
use serde_json::Value;

const AIRCRAFT_RAIL_ORDER: &[&str] = &["y+1292", "y+763", "y+254", "y-254", "y-763", "y-1292"];
const RAIL_AREA_ORDER: &[&str] = &["flange", "web"];
const RAIL_SIDE_ORDER: &[&str] = &["right", "left"];
const CROSSBEAM_SIDE_ORDER: &[&str] = &["front", "rear"];

const AIRCRAFT_RAIL_COEFF: f64 = 100.0;
const RAIL_AREA_COEFF: f64 = 1000.0;
const RAIL_SIDE_COEFF: f64 = 1.0;
const CROSSBEAM_SIDE_COEFF: f64 = 10.0;

const COORDINATE_X_OFFSET: f64 = -15100.0;
const COORDINATE_X_COEFF: f64 = 1e-3;

/// 1-based index of `value` in `order`, scored by `coeff`.
fn ordinal_score(order: &[&str], value: &str, coeff: f64) -> Option<f64> {
    order
        .iter()
        .position(|candidate| *candidate == value)
        .map(|index| (index as f64 + 1.0) * coeff)
}

#[derive(Debug, Clone, Deserialize)]
struct AreaComponentRow {
    reference: String,
    #[serde(rename = "type")]
    type_: String,
    uid: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PositionRow {
    areas: Vec<AreaComponentRow>,
    #[serde(default)]
    coordinates: Option<CoordinatesRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct CoordinatesRow {
    x: f64,
    y: f64,
    z: f64,
}

/// Up to four named area components; each present component scores against
/// its own closed ordered set.
#[derive(Debug, Clone, Default)]
pub struct Area {
    pub aircraft_rail: Option<String>,
    pub rail_area: Option<String>,
    pub rail_side: Option<String>,
    pub crossbeam_side: Option<String>,
}

impl Area {
    fn parse(rows: &[AreaComponentRow]) -> Result<Self, PlannerError> {
        let mut area = Area::default();
        for row in rows {
            let key = format!("{}_{}", row.reference, row.type_);
            match key.as_str() {
                "aircraft_rail" => area.aircraft_rail = Some(row.uid.clone()),
                "rail_area" => area.rail_area = Some(row.uid.clone()),
                "rail_side" => area.rail_side = Some(row.uid.clone()),
                "crossbeam_side" => area.crossbeam_side = Some(row.uid.clone()),
                _ => {}
            }
        }
        Ok(area)
    }

    fn score(&self) -> Result<f64, PlannerError> {
        let mut score = 0.0;
        if let Some(v) = &self.aircraft_rail {
            score += ordinal_score(AIRCRAFT_RAIL_ORDER, v, AIRCRAFT_RAIL_COEFF)
                .ok_or_else(|| unknown_area_value("aircraft_rail", v))?;
        }
        if let Some(v) = &self.rail_area {
            score += ordinal_score(RAIL_AREA_ORDER, v, RAIL_AREA_COEFF)
                .ok_or_else(|| unknown_area_value("rail_area", v))?;
        }
        if let Some(v) = &self.rail_side {
            score += ordinal_score(RAIL_SIDE_ORDER, v, RAIL_SIDE_COEFF)
                .ok_or_else(|| unknown_area_value("rail_side", v))?;
        }
        if let Some(v) = &self.crossbeam_side {
            score += ordinal_score(CROSSBEAM_SIDE_ORDER, v, CROSSBEAM_SIDE_COEFF)
                .ok_or_else(|| unknown_area_value("crossbeam_side", v))?;
        }
        Ok(score)
    }

    fn is_reversed_x(&self) -> bool {
        self.crossbeam_side.as_deref() == Some("rear") && self.rail_area.as_deref() == Some("flange")
    }
}

fn unknown_area_value(component: &'static str, value: &str) -> PlannerError {
    PlannerError::ModelParseError {
        origin: vec!["POSITION", "SCORING"],
        uid: component.to_string(),
        message: format!("value '{value}' is not part of the known {component} order"),
    }
}

/// Only `x` contributes to the score; `y`/`z` carry a zero coefficient but are
/// still realigned the way the original does, so a future non-zero
/// coefficient change needs no rework here.
#[derive(Debug, Clone, Copy)]
struct Coordinates {
    x: f64,
    y: f64,
    z: f64,
}

impl Coordinates {
    fn parse(row: &CoordinatesRow, reverse: bool) -> Self {
        let mut x = (row.x + COORDINATE_X_OFFSET) * COORDINATE_X_COEFF;
        let y = row.y * 0.0;
        let z = row.z * 0.0;
        if reverse {
            x = 1.0 - x;
        }
        Coordinates { x, y, z }
    }

    fn score(&self) -> f64 {
        self.x + self.y + self.z
    }
}

/// Spatial descriptor used to pre-sort goals: an `Area` plus optional coordinates.
#[derive(Debug, Clone)]
pub struct Position {
    area: Area,
    coordinates: Option<Coordinates>,
}

impl Position {
    pub fn parse(value: &Value) -> Result<Self, PlannerError> {
        let row: PositionRow = serde_json::from_value(value.clone()).map_err(|e| PlannerError::ModelParseError {
            origin: vec!["POSITION", "PARSING"],
            uid: "position".to_string(),
            message: e.to_string(),
        })?;

        let area = Area::parse(&row.areas)?;
        let coordinates = row
            .coordinates
            .as_ref()
            .map(|c| Coordinates::parse(c, area.is_reversed_x()));

        Ok(Position { area, coordinates })
    }

    pub fn score(&self) -> Result<f64, PlannerError> {
        let area_score = self.area.score()?;
        let coordinates_score = self.coordinates.as_ref().map(|c| c.score()).unwrap_or(0.0);
        Ok(area_score + coordinates_score)
    }
}

/// Stable-sorts `actions` ascending by their `position` metadata score.
/// Fails if any action carries no `position` metadata.
pub fn sort_by_position(actions: &mut Vec<Action>) -> Result<(), PlannerError> {
    let mut scored: Vec<(f64, usize)> = Vec::with_capacity(actions.len());
    for (index, action) in actions.iter().enumerate() {
        let position_value = action.metadata("position").ok_or_else(|| PlannerError::ModelParseError {
            origin: vec!["POSITION", "SORT"],
            uid: action.uid().to_string(),
            message: "no position at disposal for action".to_string(),
        })?;
        let position = Position::parse(position_value)?;
        scored.push((position.score()?, index));
    }

    // stable sort by score, ties preserve input order via the original index
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));

    let mut reordered = Vec::with_capacity(actions.len());
    let mut taken: Vec<Option<Action>> = actions.drain(..).map(Some).collect();
    for (_, index) in scored {
        reordered.push(taken[index].take().expect("each index consumed once"));
    }
    *actions = reordered;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::action::ActionRow;
    use serde_json::json;

    fn action_with_position(uid: &str, position: Value) -> Action {
        let row: ActionRow = serde_json::from_value(json!({
            "definition": {"uid": uid, "description": uid, "type": "MOVE.TCP.APPROACH"},
            "preconditions": [],
            "results": [],
            "assets": [],
            "position": position,
        }))
        .unwrap();
        Action::from_row(row).unwrap()
    }

    fn area_position(aircraft_rail: &str, rail_area: &str, crossbeam_side: &str, rail_side: &str) -> Value {
        json!({
            "areas": [
                {"reference": "aircraft", "type": "rail", "uid": aircraft_rail},
                {"reference": "rail", "type": "area", "uid": rail_area},
                {"reference": "crossbeam", "type": "side", "uid": crossbeam_side},
                {"reference": "rail", "type": "side", "uid": rail_side},
            ]
        })
    }

    #[test]
    fn score_is_1_based_and_weighted() {
        // first element of each order => 1 * coeff
        let position = Position::parse(&area_position("y+1292", "flange", "front", "right")).unwrap();
        let expected = 1.0 * AIRCRAFT_RAIL_COEFF + 1.0 * RAIL_AREA_COEFF + 1.0 * CROSSBEAM_SIDE_COEFF + 1.0 * RAIL_SIDE_COEFF;
        assert_eq!(position.score().unwrap(), expected);
    }

    #[test]
    fn coordinates_reverse_x_for_rear_flange() {
        let mut position = area_position("y+1292", "flange", "rear", "right");
        position["coordinates"] = json!({"x": 15100, "y": 999, "z": 999});
        let parsed = Position::parse(&position).unwrap();
        // x realigns to 0, scaled to 0, then reversed to 1
        let area_score = 1.0 * AIRCRAFT_RAIL_COEFF + 1.0 * RAIL_AREA_COEFF + 1.0 * CROSSBEAM_SIDE_COEFF + 1.0 * RAIL_SIDE_COEFF;
        assert_eq!(parsed.score().unwrap(), area_score + 1.0);
    }

    #[test]
    fn sort_is_stable_and_ascending() {
        let mut actions = vec![
            action_with_position("high", area_position("y-1292", "flange", "front", "right")),
            action_with_position("low", area_position("y+1292", "flange", "front", "right")),
            action_with_position("low_dup", area_position("y+1292", "flange", "front", "right")),
        ];
        sort_by_position(&mut actions).unwrap();
        let uids: Vec<&str> = actions.iter().map(|a| a.uid()).collect();
        assert_eq!(uids, vec!["low", "low_dup", "high"]);
    }

    #[test]
    fn missing_position_is_an_error_not_a_panic() {
        let row: ActionRow = serde_json::from_value(json!({
            "definition": {"uid": "no_pos", "description": "no_pos", "type": "MOVE.TCP.APPROACH"},
            "preconditions": [],
            "results": [],
            "assets": [],
            "position": null,
        }))
        .unwrap();
        let mut actions = vec![Action::from_row(row).unwrap()];
        assert!(sort_by_position(&mut actions).is_err());
    }
}
