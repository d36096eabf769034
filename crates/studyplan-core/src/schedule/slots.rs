//! Time-slot resolution inside energy-preference windows.
//!
//! Given a requested day and hour, [`resolve`] produces a start time that
//! respects the student's energy window and does not overlap any occupied
//! interval, keeping a buffer between consecutive tasks. Pure functions
//! over in-memory interval sets; callers load the occupied set once and
//! thread placements back in as they go.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use studyplan_db::models::EnergyPreference;

/// Minimum gap enforced between the end of one task and the start of the
/// next, in minutes.
pub const CONFLICT_BUFFER_MINUTES: i64 = 15;

/// Ceiling on day advances while hunting for a free slot. A year of full
/// days means the student's calendar is saturated beyond repair.
const MAX_DAY_ADVANCES: u32 = 366;

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Preferred study hours for an energy preference, as `[start, end)`
/// whole hours. A hard window clamps and rolls over; a soft window only
/// labels and never moves a task off its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
    pub hard: bool,
}

impl HourWindow {
    pub fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }

    fn start_on(&self, day: NaiveDate) -> NaiveDateTime {
        at_hour(day, self.start)
    }

    fn end_on(&self, day: NaiveDate) -> NaiveDateTime {
        at_hour(day, self.end)
    }
}

/// Window for each energy preference. Morning, afternoon, and night are
/// hard; balanced spans the working day and is advisory only.
pub fn window_for(preference: EnergyPreference) -> HourWindow {
    match preference {
        EnergyPreference::Morning => HourWindow { start: 6, end: 10, hard: true },
        EnergyPreference::Afternoon => HourWindow { start: 12, end: 16, hard: true },
        EnergyPreference::Night => HourWindow { start: 19, end: 23, hard: true },
        EnergyPreference::Balanced => HourWindow { start: 9, end: 17, hard: false },
    }
}

fn at_hour(day: NaiveDate, hour: u32) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(hour, 0, 0).expect("hour below 24"))
}

// ---------------------------------------------------------------------------
// Intervals
// ---------------------------------------------------------------------------

/// Half-open occupied time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, duration_minutes: i32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A request to place one task.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest {
    pub day: NaiveDate,
    pub hour: u32,
    pub duration_minutes: i32,
    pub preference: EnergyPreference,
    /// The first task of a plan anchors the plan's start: when pushed
    /// past a hard window's end it is clamped back inside its own date
    /// instead of rolling to the next day.
    pub anchor: bool,
}

/// Resolve a request against the occupied set.
///
/// Within a hard window the requested hour is first clamped to the
/// window start if it falls outside. Conflicts push the start to the end
/// of the blocking interval plus the buffer; if that escapes a hard
/// window the task rolls to the window start of the next day (anchors
/// excepted). Returns `None` only when a year of days is saturated.
pub fn resolve(req: &SlotRequest, occupied: &[Interval]) -> Option<NaiveDateTime> {
    let window = window_for(req.preference);
    let mut day = req.day;
    let mut hour = req.hour;

    for _ in 0..MAX_DAY_ADVANCES {
        if window.hard && !window.contains_hour(hour) {
            hour = window.start;
        }

        let start = settle_conflicts(at_hour(day, hour), req.duration_minutes, occupied);

        if !window.hard || start < window.end_on(day) {
            return Some(start);
        }

        if req.anchor {
            // Clamp to the last whole hour inside the window on the
            // original date, then walk forward again. The anchor may
            // end up outside the window but never off its date.
            let clamped = at_hour(day, window.end - 1);
            return Some(settle_conflicts(clamped, req.duration_minutes, occupied));
        }

        day = day.succ_opt()?;
        hour = window.start;
    }

    None
}

/// Push `start` forward past every overlapping interval, keeping the
/// buffer after each. Terminates because each step moves strictly past
/// one interval's end and the occupied set is finite.
fn settle_conflicts(
    mut start: NaiveDateTime,
    duration_minutes: i32,
    occupied: &[Interval],
) -> NaiveDateTime {
    loop {
        let candidate = Interval::new(start, duration_minutes);
        let Some(blocking) = occupied.iter().find(|iv| iv.overlaps(&candidate)) else {
            return start;
        };
        start = blocking.end + Duration::minutes(CONFLICT_BUFFER_MINUTES);
    }
}

// ---------------------------------------------------------------------------
// Day re-optimization
// ---------------------------------------------------------------------------

/// Slot quality assigned during re-optimization: inside the preferred
/// window or spilled past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotQuality {
    Peak,
    Overflow,
}

/// Re-pack one day's tasks back-to-back from the window start, buffer
/// between each, labelling every placement by whether it still starts
/// inside the window. Order of `durations` is preserved.
pub fn reoptimize_day(
    day: NaiveDate,
    durations: &[i32],
    preference: EnergyPreference,
) -> Vec<(NaiveDateTime, SlotQuality)> {
    let window = window_for(preference);
    let mut cursor = window.start_on(day);
    let mut placements = Vec::with_capacity(durations.len());

    for &duration in durations {
        let quality = if cursor < window.end_on(day) {
            SlotQuality::Peak
        } else {
            SlotQuality::Overflow
        };
        placements.push((cursor, quality));
        cursor += Duration::minutes(i64::from(duration) + CONFLICT_BUFFER_MINUTES);
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn req(day: NaiveDate, hour: u32, duration: i32, pref: EnergyPreference) -> SlotRequest {
        SlotRequest {
            day,
            hour,
            duration_minutes: duration,
            preference: pref,
            anchor: false,
        }
    }

    #[test]
    fn free_slot_is_taken_as_requested() {
        let day = date(2026, 3, 2);
        let r = req(day, 13, 60, EnergyPreference::Afternoon);
        assert_eq!(resolve(&r, &[]), Some(at_hour(day, 13)));
    }

    #[test]
    fn hour_outside_hard_window_clamps_to_window_start() {
        let day = date(2026, 3, 2);
        let r = req(day, 9, 60, EnergyPreference::Afternoon);
        assert_eq!(resolve(&r, &[]), Some(at_hour(day, 12)));
    }

    #[test]
    fn balanced_window_never_clamps() {
        let day = date(2026, 3, 2);
        let r = req(day, 20, 60, EnergyPreference::Balanced);
        assert_eq!(resolve(&r, &[]), Some(at_hour(day, 20)));
    }

    #[test]
    fn conflict_pushes_past_blocker_with_buffer() {
        let day = date(2026, 3, 2);
        let occupied = vec![Interval::new(at_hour(day, 6), 60)];
        let r = req(day, 6, 30, EnergyPreference::Morning);
        // Blocker ends 07:00, buffer lands us at 07:15.
        let resolved = resolve(&r, &occupied).unwrap();
        assert_eq!(resolved, at_hour(day, 7) + Duration::minutes(15));
    }

    #[test]
    fn chained_conflicts_settle_past_the_last_blocker() {
        let day = date(2026, 3, 2);
        let occupied = vec![
            Interval::new(at_hour(day, 6), 60),
            Interval::new(at_hour(day, 7) + Duration::minutes(15), 60),
        ];
        let r = req(day, 6, 30, EnergyPreference::Morning);
        let resolved = resolve(&r, &occupied).unwrap();
        assert_eq!(resolved, at_hour(day, 8) + Duration::minutes(30));
    }

    #[test]
    fn escaping_hard_window_rolls_to_next_day() {
        let day = date(2026, 3, 2);
        // Fill the whole morning window.
        let occupied = vec![Interval::new(at_hour(day, 6), 4 * 60)];
        let r = req(day, 6, 60, EnergyPreference::Morning);
        let resolved = resolve(&r, &occupied).unwrap();
        assert_eq!(resolved, at_hour(date(2026, 3, 3), 6));
    }

    #[test]
    fn anchor_clamps_instead_of_rolling() {
        let day = date(2026, 3, 2);
        let occupied = vec![Interval::new(at_hour(day, 6), 4 * 60)];
        let mut r = req(day, 6, 60, EnergyPreference::Morning);
        r.anchor = true;
        let resolved = resolve(&r, &occupied).unwrap();
        // Clamped to 09:00, still blocked until 10:00, settles at 10:15 --
        // outside the window but on its own date.
        assert_eq!(resolved.date(), day);
        assert_eq!(resolved, at_hour(day, 10) + Duration::minutes(15));
    }

    #[test]
    fn rollover_day_can_also_carry_conflicts() {
        let day = date(2026, 3, 2);
        let next = date(2026, 3, 3);
        let occupied = vec![
            Interval::new(at_hour(day, 19), 4 * 60),
            Interval::new(at_hour(next, 19), 60),
        ];
        let r = req(day, 19, 60, EnergyPreference::Night);
        let resolved = resolve(&r, &occupied).unwrap();
        assert_eq!(resolved, at_hour(next, 20) + Duration::minutes(15));
    }

    #[test]
    fn resolved_slots_never_overlap_each_other() {
        // Place a batch sequentially, feeding each placement back into
        // the occupied set, then check pairwise disjointness.
        let day = date(2026, 3, 2);
        let mut occupied = vec![Interval::new(at_hour(day, 12) + Duration::minutes(30), 45)];
        let mut placed = Vec::new();

        for _ in 0..5 {
            let r = req(day, 12, 60, EnergyPreference::Afternoon);
            let start = resolve(&r, &occupied).unwrap();
            let iv = Interval::new(start, 60);
            placed.push(iv);
            occupied.push(iv);
        }

        for (i, a) in placed.iter().enumerate() {
            for b in placed.iter().skip(i + 1) {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn reoptimize_day_packs_with_buffers_and_labels_overflow() {
        let day = date(2026, 3, 2);
        let placements = reoptimize_day(
            day,
            &[120, 120, 60],
            EnergyPreference::Morning,
        );

        assert_eq!(placements[0], (at_hour(day, 6), SlotQuality::Peak));
        assert_eq!(
            placements[1],
            (at_hour(day, 8) + Duration::minutes(15), SlotQuality::Peak)
        );
        // Third task starts 10:30, past the 10:00 window end.
        assert_eq!(
            placements[2],
            (at_hour(day, 10) + Duration::minutes(30), SlotQuality::Overflow)
        );
    }

    #[test]
    fn reoptimize_day_keeps_task_order() {
        let day = date(2026, 3, 2);
        let placements = reoptimize_day(day, &[30, 90, 45], EnergyPreference::Balanced);
        assert!(placements.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
