//! Domain logic for the study planner.
//!
//! [`schedule`] holds the deterministic plan generator and the time-slot
//! resolver; [`ai`] is the candidate-planner seam with its fallback
//! pipeline; [`goal`] carries goal lifecycle rules. All services take an
//! explicit reference date -- nothing in here reads a wall clock.

pub mod ai;
pub mod error;
pub mod goal;
pub mod schedule;
