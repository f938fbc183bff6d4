//! Lateness, absence and reminder triggers.
//!
//! Pure functions over a schedule, a date and that day's events. The service
//! decides what to do with the verdicts.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::attendance::calculator;
use crate::model::attendance::{AttendanceEvent, EventKind};
use crate::model::schedule::WorkSchedule;

/// Shift start of `schedule` on `date`, as an instant.
pub fn scheduled_start(
    schedule: &WorkSchedule,
    date: NaiveDate,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(schedule.shift_start))
        .single()
        .map(|at| at.with_timezone(&Utc))
}

/// Minutes between the scheduled shift start and the entry, floored at zero.
/// Flexible schedules are never late, and neither is an entry on a day off.
pub fn late_minutes(
    entry_at: DateTime<Utc>,
    date: NaiveDate,
    schedule: &WorkSchedule,
    offset: FixedOffset,
) -> i64 {
    if schedule.flexible || !schedule.works_on(date) {
        return 0;
    }
    scheduled_start(schedule, date, offset)
        .map(|start| (entry_at - start).num_minutes().max(0))
        .unwrap_or(0)
}

pub fn has_entry(day: &[AttendanceEvent]) -> bool {
    day.iter().any(|e| e.kind == EventKind::Entry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceCheck {
    /// Not a work day for this schedule.
    DayOff,
    /// The cutoff has not passed yet.
    BeforeCutoff,
    Present,
    Absent,
}

/// Absence verdict for `date` as seen at `now`. The cutoff is the shift start
/// plus `grace`.
pub fn check_absence(
    schedule: &WorkSchedule,
    date: NaiveDate,
    day: &[AttendanceEvent],
    now: DateTime<Utc>,
    offset: FixedOffset,
    grace: Duration,
) -> AbsenceCheck {
    if !schedule.works_on(date) {
        return AbsenceCheck::DayOff;
    }
    if has_entry(day) {
        return AbsenceCheck::Present;
    }
    match scheduled_start(schedule, date, offset) {
        Some(start) if now < start + grace => AbsenceCheck::BeforeCutoff,
        _ => AbsenceCheck::Absent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderCheck {
    DayOff,
    OutsideWindow,
    Present,
    Due,
}

/// A reminder is due inside `[shift_start - lead, shift_start)` when no entry
/// has been recorded yet.
pub fn check_reminder(
    schedule: &WorkSchedule,
    date: NaiveDate,
    day: &[AttendanceEvent],
    now: DateTime<Utc>,
    offset: FixedOffset,
    lead: Duration,
) -> ReminderCheck {
    if !schedule.works_on(date) {
        return ReminderCheck::DayOff;
    }
    if has_entry(day) {
        return ReminderCheck::Present;
    }
    match scheduled_start(schedule, date, offset) {
        Some(start) if now >= start - lead && now < start => ReminderCheck::Due,
        _ => ReminderCheck::OutsideWindow,
    }
}

/// Minutes the closed break ran past the configured allowance, if any.
pub fn break_overrun_minutes(day: &[AttendanceEvent], schedule: &WorkSchedule) -> Option<i64> {
    if schedule.break_duration_minutes == 0 {
        return None;
    }
    let taken = calculator::break_duration(day).num_minutes();
    let over = taken - i64::from(schedule.break_duration_minutes);
    (over > 0).then_some(over)
}
