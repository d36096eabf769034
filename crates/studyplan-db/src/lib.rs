//! PostgreSQL access layer for the study planner.
//!
//! Row models and closed status enums live in [`models`]; per-table
//! query functions live under [`queries`]. All queries are owner-scoped
//! where the row belongs to a student.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
