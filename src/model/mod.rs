// ============================================================================
//                       MARS BUILD PROCESSOR • DATA MODEL
//        World State, Actions & Position Scoring Root Module
// ----------------------------------------------------------------------------
//   File:        /src/model/mod.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

pub mod action;
pub mod position;
pub mod situation;

pub use action::{Action, ActionDto, ActionRow, Asset};
pub use position::{sort_by_position, Position};
pub use situation::{Relation, Situation, StateObject, StateObjectRow};
