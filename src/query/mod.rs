// ============================================================================
//                       MARS BUILD PROCESSOR • QUERY MODULE
//        Cypher Clause Assembly & The Four Canonical Lookups
// ----------------------------------------------------------------------------
//   File:        /src/query/mod.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

pub mod clause;
pub mod register;

pub use register::{
    build_action_by_state, build_approach_by_area, build_station_by_area, build_work_by_area,
    AreaDefinition, AreaValue, StateDefinition,
};
