//! AI-assisted plan generation with deterministic fallback.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use sqlx::PgPool;
use uuid::Uuid;

use studyplan_db::models::{AiTask, EnergyPreference};
use studyplan_db::queries::{ai_tasks, students};

use crate::ai::{CandidatePlanner, CandidateTask, PlanOutline, parse_candidates};
use crate::error::PlanError;
use crate::schedule::generate::{
    self, GenerateRequest, GenerationMode, PlannedRow, generate as generate_deterministic,
};
use crate::schedule::slots::{Interval, SlotRequest, resolve};

/// Generate a plan through a candidate planner, falling back to the
/// deterministic generator when the planner times out, errors, or
/// returns nothing usable. A fallback that then fails for anything
/// other than a caller error surfaces as [`PlanError::Generation`]:
/// candidate production failed and could not be recovered.
///
/// Extend and keep-existing requests go straight to the deterministic
/// generator: the planner only ever proposes whole plans, and both modes
/// preserve existing rows the planner knows nothing about. Successful
/// proposals are slot-resolved against everything else on the student's
/// calendar and replace the goal's plan atomically.
pub async fn generate_assisted(
    pool: &PgPool,
    planner: &dyn CandidatePlanner,
    student_id: Uuid,
    req: &GenerateRequest,
    today: chrono::NaiveDate,
    timeout: Duration,
) -> Result<Vec<AiTask>, PlanError> {
    if matches!(
        req.mode,
        GenerationMode::ExtendOnly | GenerationMode::KeepExisting
    ) {
        return generate_deterministic(pool, student_id, req, today).await;
    }

    let goal = generate::require_goal(pool, req.goal_id, student_id).await?;

    if !(1..=24).contains(&req.hours_per_day) {
        return Err(PlanError::validation(
            "hours per day must be between 1 and 24",
        ));
    }
    if req.start_date >= req.end_date {
        return Err(PlanError::validation(
            "start date must fall before end date",
        ));
    }
    if let Some(target) = goal.target_date
        && req.end_date >= target
    {
        return Err(PlanError::validation(
            "plan must end before the goal's target date",
        ));
    }

    if let Some(pref) = req.energy_preference {
        students::update_energy_preference(pool, student_id, pref).await?;
    }

    let outline = PlanOutline {
        goal_title: goal.title.clone(),
        topics: req.topics.clone(),
        start_date: req.start_date,
        end_date: req.end_date,
        hours_per_day: req.hours_per_day,
    };

    let candidates = match propose_candidates(planner, &outline, timeout).await {
        Ok(candidates) => candidates,
        Err(reason) => {
            tracing::warn!(
                planner = planner.name(),
                goal_id = %goal.id,
                %reason,
                "planner failed, falling back to deterministic generation"
            );
            return fall_back(pool, student_id, req, today, &reason).await;
        }
    };

    let preference = match req.energy_preference {
        Some(pref) => pref,
        None => stored_preference(pool, student_id).await?,
    };

    let rows = place_candidates(pool, &goal, student_id, req, candidates, preference).await?;
    if rows.is_empty() {
        tracing::warn!(
            planner = planner.name(),
            goal_id = %goal.id,
            "no candidate survived placement, falling back to deterministic generation"
        );
        return fall_back(pool, student_id, req, today, "no candidate survived placement").await;
    }

    let inserted = generate::persist_batch(pool, &goal, student_id, rows, true).await?;
    tracing::info!(
        planner = planner.name(),
        goal_id = %goal.id,
        tasks = inserted.len(),
        "assisted plan generated"
    );
    Ok(inserted)
}

/// Run the deterministic generator after the planner path has failed.
/// Caller errors pass through untouched; an infrastructure failure at
/// this point means neither path produced a plan, which is a
/// generation failure rather than a plain storage one.
async fn fall_back(
    pool: &PgPool,
    student_id: Uuid,
    req: &GenerateRequest,
    today: chrono::NaiveDate,
    reason: &str,
) -> Result<Vec<AiTask>, PlanError> {
    match generate_deterministic(pool, student_id, req, today).await {
        Ok(tasks) => Ok(tasks),
        Err(err @ (PlanError::NotFound(_) | PlanError::Validation(_))) => Err(err),
        Err(err) => {
            tracing::error!(%reason, error = %err, "deterministic fallback failed");
            Err(PlanError::Generation(format!(
                "{reason}; fallback failed: {err}"
            )))
        }
    }
}

async fn propose_candidates(
    planner: &dyn CandidatePlanner,
    outline: &PlanOutline,
    timeout: Duration,
) -> Result<Vec<CandidateTask>, String> {
    let raw = match tokio::time::timeout(timeout, planner.propose(outline)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(err)) => return Err(format!("proposal failed: {err:#}")),
        Err(_) => return Err(format!("proposal timed out after {timeout:?}")),
    };

    parse_candidates(&raw).map_err(|err| format!("unusable proposal: {err:#}"))
}

async fn stored_preference(pool: &PgPool, student_id: Uuid) -> Result<EnergyPreference, PlanError> {
    let student = students::get_student(pool, student_id)
        .await?
        .ok_or_else(|| PlanError::not_found("student not found"))?;
    Ok(student.energy_preference)
}

/// Resolve each candidate into a concrete slot against the rest of the
/// student's calendar. The goal's own rows are excluded from the
/// occupied set since the batch replaces them. Candidates that land on
/// or past the goal's target date are dropped.
async fn place_candidates(
    pool: &PgPool,
    goal: &studyplan_db::models::Goal,
    student_id: Uuid,
    req: &GenerateRequest,
    candidates: Vec<CandidateTask>,
    preference: EnergyPreference,
) -> Result<Vec<PlannedRow>, PlanError> {
    let mut occupied: Vec<Interval> =
        ai_tasks::occupied_intervals_for_student(pool, student_id, req.start_date, Some(goal.id))
            .await?
            .into_iter()
            .map(|(start, minutes)| Interval::new(start, minutes))
            .collect();

    let mut rows = Vec::new();
    for candidate in candidates {
        let day = req.start_date + ChronoDuration::days(candidate.start_time_offset_days);
        if let Some(target) = goal.target_date
            && day >= target
        {
            continue;
        }

        let slot = SlotRequest {
            day,
            hour: candidate.start_hour,
            duration_minutes: candidate.duration_minutes,
            preference,
            anchor: rows.is_empty(),
        };
        let Some(start) = resolve(&slot, &occupied) else {
            continue;
        };
        if let Some(target) = goal.target_date
            && start.date() >= target
        {
            continue;
        }

        occupied.push(Interval::new(start, candidate.duration_minutes));
        rows.push(PlannedRow {
            title: candidate.title,
            task_date: start.date(),
            start_time: start,
            duration_minutes: candidate.duration_minutes,
            sequence_no: rows.len() as i32 + 1,
        });
    }

    Ok(rows)
}
