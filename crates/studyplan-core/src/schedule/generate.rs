//! The deterministic plan generator.
//!
//! Distributes topics over the requested date range and writes the
//! resulting task batch in a single transaction. Behavior per mode:
//! create and full regenerate replace the goal's plan wholesale, extend
//! appends past the existing plan without touching it, and keep-existing
//! is a no-op.

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use studyplan_db::models::{AiTask, EnergyPreference, Goal};
use studyplan_db::queries::{ai_tasks, goals, students};

use crate::error::PlanError;
use crate::schedule::distribute;

/// Hour of day tasks are written at before any slot resolution.
pub const DEFAULT_START_HOUR: u32 = 9;

/// How an incoming generation request treats the goal's existing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// First plan for the goal; also wipes any stray tasks.
    Create,
    /// Discard the existing plan and rebuild from scratch.
    FullRegenerate,
    /// Append new days after the latest planned date, skipping dates
    /// that already hold a task for this goal.
    ExtendOnly,
    /// Leave the plan untouched.
    KeepExisting,
}

/// Input to [`generate`].
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub goal_id: Uuid,
    /// Comma or newline separated topic names; blank falls back to a
    /// placeholder topic.
    #[serde(default)]
    pub topics: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours_per_day: i32,
    pub mode: GenerationMode,
    /// When present, persisted on the student profile before planning.
    #[serde(default)]
    pub energy_preference: Option<EnergyPreference>,
}

/// Generate a study plan for one goal.
///
/// `today` is the caller's reference date; extend derives its start from
/// it when the goal has no tasks yet. Returns the inserted batch in
/// sequence order (empty for keep-existing and for an extend with
/// nothing left to add).
pub async fn generate(
    pool: &PgPool,
    student_id: Uuid,
    req: &GenerateRequest,
    today: NaiveDate,
) -> Result<Vec<AiTask>, PlanError> {
    let goal = require_goal(pool, req.goal_id, student_id).await?;

    if req.mode == GenerationMode::KeepExisting {
        tracing::debug!(goal_id = %goal.id, "keep_existing mode, plan untouched");
        return Ok(Vec::new());
    }

    if !(1..=24).contains(&req.hours_per_day) {
        return Err(PlanError::validation(
            "hours per day must be between 1 and 24",
        ));
    }

    if let Some(pref) = req.energy_preference {
        students::update_energy_preference(pool, student_id, pref).await?;
    }

    let topics = distribute::parse_topics(&req.topics);

    let rows = match req.mode {
        GenerationMode::Create | GenerationMode::FullRegenerate => {
            plan_range(&goal, req, &topics)?
        }
        GenerationMode::ExtendOnly => plan_extension(pool, &goal, req, &topics, today).await?,
        GenerationMode::KeepExisting => unreachable!("handled above"),
    };

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let replace = matches!(
        req.mode,
        GenerationMode::Create | GenerationMode::FullRegenerate
    );
    let inserted = persist_batch(pool, &goal, student_id, rows, replace).await?;

    tracing::info!(
        goal_id = %goal.id,
        mode = ?req.mode,
        tasks = inserted.len(),
        "plan generated"
    );
    Ok(inserted)
}

/// A task row not yet written: title, date, start, duration, sequence.
pub(crate) struct PlannedRow {
    pub title: String,
    pub task_date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub sequence_no: i32,
}

pub(crate) async fn require_goal(
    pool: &PgPool,
    goal_id: Uuid,
    student_id: Uuid,
) -> Result<Goal, PlanError> {
    goals::get_goal_for_student(pool, goal_id, student_id)
        .await?
        .ok_or_else(|| PlanError::not_found("goal not found"))
}

fn default_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(DEFAULT_START_HOUR, 0, 0).expect("valid hour"))
}

/// Build the full-range plan for create and full regenerate. The range
/// is inclusive of both endpoints: the last task lands on `end_date`.
fn plan_range(
    goal: &Goal,
    req: &GenerateRequest,
    topics: &[String],
) -> Result<Vec<PlannedRow>, PlanError> {
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

    let total_days = (req.end_date - req.start_date).num_days() as usize + 1;
    let duration = req.hours_per_day * 60;

    let rows = (0..total_days)
        .map(|i| {
            let day = req.start_date + Duration::days(i as i64);
            PlannedRow {
                title: distribute::day_title(topics, i, total_days),
                task_date: day,
                start_time: default_start(day),
                duration_minutes: duration,
                sequence_no: (i + 1) as i32,
            }
        })
        .collect();

    Ok(rows)
}

/// Build the appended rows for extend-only. Dates already planned for
/// this goal are skipped without consuming a sequence number.
async fn plan_extension(
    pool: &PgPool,
    goal: &Goal,
    req: &GenerateRequest,
    topics: &[String],
    today: NaiveDate,
) -> Result<Vec<PlannedRow>, PlanError> {
    let derived_start = match ai_tasks::latest_task_date_for_goal(pool, goal.id).await? {
        Some(latest) => latest + Duration::days(1),
        None => today,
    };

    if derived_start > req.end_date {
        tracing::debug!(goal_id = %goal.id, "extend has nothing to add");
        return Ok(Vec::new());
    }
    if let Some(target) = goal.target_date
        && req.end_date >= target
    {
        return Err(PlanError::validation(
            "plan must end before the goal's target date",
        ));
    }

    let taken = ai_tasks::task_dates_for_goal(pool, goal.id, goal.student_id).await?;
    let mut sequence = ai_tasks::max_sequence_no_for_goal(pool, goal.id).await? + 1;

    let total_days = (req.end_date - derived_start).num_days() as usize + 1;
    let duration = req.hours_per_day * 60;
    let mut rows = Vec::new();

    for i in 0..total_days {
        let day = derived_start + Duration::days(i as i64);
        if taken.contains(&day) {
            continue;
        }
        rows.push(PlannedRow {
            title: distribute::day_title(topics, i, total_days),
            task_date: day,
            start_time: default_start(day),
            duration_minutes: duration,
            sequence_no: sequence,
        });
        sequence += 1;
    }

    Ok(rows)
}

/// Write the batch atomically, first clearing the goal's plan when
/// `replace` is set. Any failure rolls the whole batch back.
pub(crate) async fn persist_batch(
    pool: &PgPool,
    goal: &Goal,
    student_id: Uuid,
    rows: Vec<PlannedRow>,
    replace: bool,
) -> Result<Vec<AiTask>, PlanError> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    if replace {
        sqlx::query("DELETE FROM ai_tasks WHERE goal_id = $1 AND student_id = $2")
            .bind(goal.id)
            .bind(student_id)
            .execute(&mut *tx)
            .await
            .context("failed to clear existing plan")?;
    }

    let mut inserted = Vec::with_capacity(rows.len());
    for row in rows {
        let task = sqlx::query_as::<_, AiTask>(
            "INSERT INTO ai_tasks \
             (goal_id, student_id, title, task_date, start_time, duration_minutes, sequence_no) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(goal.id)
        .bind(student_id)
        .bind(&row.title)
        .bind(row.task_date)
        .bind(row.start_time)
        .bind(row.duration_minutes)
        .bind(row.sequence_no)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to insert task {}", row.sequence_no))?;
        inserted.push(task);
    }

    tx.commit().await.context("failed to commit plan")?;
    Ok(inserted)
}
