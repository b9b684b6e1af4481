// ============================================================================
//                      MARS BUILD PROCESSOR • SEQUENCE ORCHESTRATION
//        Fetch → Parse → Sort → Solve → Optimize, Timed
// ----------------------------------------------------------------------------
//   Architectural Role:
//       `SequenceUnit` is the single entry point both front ends call: given
//       a goal kind, an area definition and an initial situation, it drives
//       the whole pipeline and hands back the finished plan. Ported from
//       `processor/components.py`'s `SequenceUnit`.
//
//   File:        /src/sequence.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::data::{DataUnit, GraphClient};
use crate::error::PlannerError;
use crate::model::{sort_by_position, Action, Situation};
use crate::optimizer::begin_with_probing;
use crate::query::AreaDefinition;
use crate::solver::SequenceSolver;
use log::info;
use std::time::Instant;

/// Which canonical lookup supplies the goal actions for a build request.
/// REDESIGN FLAG: replaces the original's string-keyed
/// `SequenceTypeRegister` enum (whose value was a `DataUnit` method name
/// looked up via `getattr`) with a total match over a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    WorkArea,
    StationArea,
    ApproachArea,
}

impl SequenceKind {
    /// `target` is the last URL path segment (`work`/`station`/`approach`);
    /// `definition_type` is the goals definition type (currently always
    /// `"area"`). Mirrors `f'{target}_{definition_type}'` key lookup.
    pub fn from_parts(target: &str, definition_type: &str) -> Result<Self, PlannerError> {
        match (target, definition_type) {
            ("work", "area") => Ok(SequenceKind::WorkArea),
            ("station", "area") => Ok(SequenceKind::StationArea),
            ("approach", "area") => Ok(SequenceKind::ApproachArea),
            _ => Err(PlannerError::BodyInvalid {
                origin: vec!["REQUEST", "VALIDATION"],
                message: format!("unknown sequence type '{target}_{definition_type}'"),
            }),
        }
    }
}

pub struct SequenceUnit<C: GraphClient> {
    data_unit: DataUnit<C>,
}

impl<C: GraphClient> SequenceUnit<C> {
    pub fn new(data_unit: DataUnit<C>) -> Self {
        SequenceUnit { data_unit }
    }

    /// Builds a complete action plan for `kind`/`area_definition`, starting
    /// from `robot_situation`/`work_situation`.
    pub async fn build(
        &self,
        kind: SequenceKind,
        area_definition: &AreaDefinition,
        robot_situation: Situation,
        work_situation: Situation,
    ) -> Result<Vec<Action>, PlannerError> {
        let started = Instant::now();
        info!("get goals from database");

        let rows = match kind {
            SequenceKind::WorkArea => self.data_unit.get_work_by_area(area_definition).await?,
            SequenceKind::StationArea => self.data_unit.get_station_by_area(area_definition).await?,
            SequenceKind::ApproachArea => self.data_unit.get_approach_by_area(area_definition).await?,
        };

        info!("transform data to actions");
        let mut actions = rows
            .into_iter()
            .map(Action::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        info!("sort actions");
        sort_by_position(&mut actions)?;

        info!("solve the actions definition");
        let mut solver = SequenceSolver::new(&self.data_unit);
        let sequence = solver.resolve(actions, robot_situation, work_situation).await?;

        info!("optimize the sequence");
        let sequence = begin_with_probing(sequence);

        let elapsed = started.elapsed().as_secs_f64();
        info!("sequence built - time to build sequence: {elapsed:.2} seconds");

        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_rejects_unknown_target() {
        let err = SequenceKind::from_parts("orbit", "area").unwrap_err();
        assert_eq!(err.kind(), "validation/body-invalid");
    }

    #[test]
    fn from_parts_accepts_known_combinations() {
        assert_eq!(SequenceKind::from_parts("work", "area").unwrap(), SequenceKind::WorkArea);
        assert_eq!(SequenceKind::from_parts("station", "area").unwrap(), SequenceKind::StationArea);
        assert_eq!(SequenceKind::from_parts("approach", "area").unwrap(), SequenceKind::ApproachArea);
    }
}
