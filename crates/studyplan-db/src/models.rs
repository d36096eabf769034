use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of study goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Exam,
    Daily,
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exam => "exam",
            Self::Daily => "daily",
        };
        f.write_str(s)
    }
}

impl FromStr for GoalKind {
    type Err = GoalKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exam" => Ok(Self::Exam),
            "daily" => Ok(Self::Daily),
            other => Err(GoalKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`GoalKind`] string.
#[derive(Debug, Clone)]
pub struct GoalKindParseError(pub String);

impl fmt::Display for GoalKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid goal kind: {:?}", self.0)
    }
}

impl std::error::Error for GoalKindParseError {}

// ---------------------------------------------------------------------------

/// Status of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for GoalStatus {
    type Err = GoalStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(GoalStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`GoalStatus`] string.
#[derive(Debug, Clone)]
pub struct GoalStatusParseError(pub String);

impl fmt::Display for GoalStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid goal status: {:?}", self.0)
    }
}

impl std::error::Error for GoalStatusParseError {}

// ---------------------------------------------------------------------------

/// Status of a task (AI-generated or manual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------

/// A student's preferred time-of-day window for studying.
///
/// The hour windows themselves are scheduling logic and live in
/// `studyplan-core`; this enum only names the preference as stored on
/// the student profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnergyPreference {
    Morning,
    Afternoon,
    Night,
    Balanced,
}

impl fmt::Display for EnergyPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Night => "night",
            Self::Balanced => "balanced",
        };
        f.write_str(s)
    }
}

impl FromStr for EnergyPreference {
    type Err = EnergyPreferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "night" => Ok(Self::Night),
            "balanced" => Ok(Self::Balanced),
            other => Err(EnergyPreferenceParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`EnergyPreference`] string.
#[derive(Debug, Clone)]
pub struct EnergyPreferenceParseError(pub String);

impl fmt::Display for EnergyPreferenceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid energy preference: {:?}", self.0)
    }
}

impl std::error::Error for EnergyPreferenceParseError {}

// ---------------------------------------------------------------------------

/// Label assigned during re-optimization: whether a task's recomputed
/// start hour still falls inside the preferred window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlotLabel {
    Peak,
    Overflow,
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Peak => "peak",
            Self::Overflow => "overflow",
        };
        f.write_str(s)
    }
}

impl FromStr for SlotLabel {
    type Err = SlotLabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "peak" => Ok(Self::Peak),
            "overflow" => Ok(Self::Overflow),
            other => Err(SlotLabelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SlotLabel`] string.
#[derive(Debug, Clone)]
pub struct SlotLabelParseError(pub String);

impl fmt::Display for SlotLabelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid slot label: {:?}", self.0)
    }
}

impl std::error::Error for SlotLabelParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A student account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub energy_preference: EnergyPreference,
    pub created_at: DateTime<Utc>,
}

/// A study goal -- the unit a plan is generated against.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub kind: GoalKind,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
}

/// A generated study task. Created only in batches by the plan
/// generator; `sequence_no` is unique and strictly increasing per goal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiTask {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub task_date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub sequence_no: i32,
    pub slot_label: Option<SlotLabel>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// A student-authored task, independent of any goal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManualTask {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub task_date: NaiveDate,
    pub start_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub color_tag: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_kind_display_roundtrip() {
        let variants = [GoalKind::Exam, GoalKind::Daily];
        for v in &variants {
            let s = v.to_string();
            let parsed: GoalKind = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn goal_kind_invalid() {
        let result = "weekly".parse::<GoalKind>();
        assert!(result.is_err());
    }

    #[test]
    fn goal_status_display_roundtrip() {
        let variants = [GoalStatus::Active, GoalStatus::Completed];
        for v in &variants {
            let s = v.to_string();
            let parsed: GoalStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_status_display_roundtrip() {
        let variants = [TaskStatus::Active, TaskStatus::Completed];
        for v in &variants {
            let s = v.to_string();
            let parsed: TaskStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_status_invalid() {
        let result = "done".parse::<TaskStatus>();
        assert!(result.is_err());
    }

    #[test]
    fn energy_preference_display_roundtrip() {
        let variants = [
            EnergyPreference::Morning,
            EnergyPreference::Afternoon,
            EnergyPreference::Night,
            EnergyPreference::Balanced,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: EnergyPreference = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn energy_preference_invalid() {
        let result = "dawn".parse::<EnergyPreference>();
        assert!(result.is_err());
    }

    #[test]
    fn slot_label_display_roundtrip() {
        let variants = [SlotLabel::Peak, SlotLabel::Overflow];
        for v in &variants {
            let s = v.to_string();
            let parsed: SlotLabel = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn slot_label_invalid() {
        let result = "offpeak".parse::<SlotLabel>();
        assert!(result.is_err());
    }
}
