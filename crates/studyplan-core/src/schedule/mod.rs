//! Deterministic schedule generation.
//!
//! [`distribute`] partitions topics across days, [`slots`] computes
//! conflict-free start times inside energy-preference windows,
//! [`generate`] ties both to the database as the plan generator, and
//! [`reoptimize`] re-times a student's pending tasks for a new window.

pub mod distribute;
pub mod generate;
pub mod reoptimize;
pub mod slots;

pub use generate::{GenerateRequest, GenerationMode, generate};
pub use reoptimize::reoptimize;
