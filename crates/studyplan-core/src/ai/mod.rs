//! Candidate-planner seam for AI-assisted plan generation.
//!
//! A [`CandidatePlanner`] produces a raw JSON plan proposal for an
//! outline; [`parse_candidates`] turns the raw text into sanitized
//! candidate tasks. The assisted pipeline in [`assisted`] wires the two
//! to the time-slot resolver and falls back to the deterministic
//! generator whenever the planner misbehaves.

pub mod assisted;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

pub use assisted::generate_assisted;

/// Bounds applied to candidate durations, in minutes.
const MIN_CANDIDATE_MINUTES: i32 = 15;
const MAX_CANDIDATE_MINUTES: i32 = 480;

/// What the planner is asked to plan. Free-text fields go into the
/// prompt verbatim; dates bound the proposal.
#[derive(Debug, Clone)]
pub struct PlanOutline {
    pub goal_title: String,
    pub topics: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours_per_day: i32,
}

/// Produces raw candidate-task JSON for an outline.
///
/// Implementations wrap an external model endpoint; the pipeline treats
/// any error, timeout, or unparseable output as a recoverable failure.
#[async_trait]
pub trait CandidatePlanner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produce the raw proposal text, expected to be a JSON array of
    /// candidate tasks (possibly wrapped in a markdown code fence).
    async fn propose(&self, outline: &PlanOutline) -> Result<String>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn CandidatePlanner) {}
};

/// One proposed task as emitted by a planner, after field-level
/// sanitization.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateTask {
    pub title: String,
    #[serde(default)]
    pub task_type: Option<String>,
    /// Days after the plan's start date; negative offsets clamp to 0.
    #[serde(default)]
    pub start_time_offset_days: i64,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_start_hour() -> u32 {
    crate::schedule::generate::DEFAULT_START_HOUR
}

fn default_duration() -> i32 {
    60
}

impl CandidateTask {
    /// Clamp out-of-range fields instead of rejecting the candidate.
    fn sanitize(mut self) -> Self {
        self.start_time_offset_days = self.start_time_offset_days.max(0);
        if self.start_hour >= 24 {
            self.start_hour = default_start_hour();
        }
        self.duration_minutes = self
            .duration_minutes
            .clamp(MIN_CANDIDATE_MINUTES, MAX_CANDIDATE_MINUTES);
        self
    }
}

/// Parse a raw planner response into candidates.
///
/// Markdown code fences are stripped line-wise before JSON parsing; an
/// empty candidate list is an error, since the pipeline would otherwise
/// silently produce an empty plan.
pub fn parse_candidates(raw: &str) -> Result<Vec<CandidateTask>> {
    let stripped: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let candidates: Vec<CandidateTask> = serde_json::from_str(stripped.trim())?;
    if candidates.is_empty() {
        bail!("planner returned an empty candidate list");
    }

    Ok(candidates.into_iter().map(CandidateTask::sanitize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_array() {
        let raw = r#"[
            {"title": "Review limits", "start_time_offset_days": 0, "start_hour": 9, "duration_minutes": 90},
            {"title": "Practice set", "start_time_offset_days": 1}
        ]"#;
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Review limits");
        assert_eq!(candidates[1].start_hour, 9);
        assert_eq!(candidates[1].duration_minutes, 60);
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n[{\"title\": \"Flashcards\"}]\n```";
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Flashcards");
    }

    #[test]
    fn clamps_out_of_range_fields() {
        let raw = r#"[{
            "title": "Marathon",
            "start_time_offset_days": -3,
            "start_hour": 27,
            "duration_minutes": 6000
        }]"#;
        let candidates = parse_candidates(raw).unwrap();
        let c = &candidates[0];
        assert_eq!(c.start_time_offset_days, 0);
        assert_eq!(c.start_hour, 9);
        assert_eq!(c.duration_minutes, MAX_CANDIDATE_MINUTES);
    }

    #[test]
    fn tiny_durations_round_up() {
        let raw = r#"[{"title": "Skim notes", "duration_minutes": 5}]"#;
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates[0].duration_minutes, MIN_CANDIDATE_MINUTES);
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(parse_candidates("[]").is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_candidates("here is your plan!").is_err());
    }
}
