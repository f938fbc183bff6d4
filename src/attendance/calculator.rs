//! Work-time arithmetic over one day's events.
//!
//! Events are paired by kind (`entry` with `exit`, `break_start` with
//! `break_end`), never by their position in the list.

use chrono::{Duration, FixedOffset, NaiveDate};

use crate::attendance::{detector, machine};
use crate::model::attendance::{AttendanceEvent, DailyAttendanceSummary, DailyState, EventKind};
use crate::model::schedule::WorkSchedule;

fn first_of(events: &[AttendanceEvent], kind: EventKind) -> Option<&AttendanceEvent> {
    events.iter().find(|e| e.kind == kind)
}

/// Closed break length; an open break counts as zero.
pub fn break_duration(events: &[AttendanceEvent]) -> Duration {
    match (
        first_of(events, EventKind::BreakStart),
        first_of(events, EventKind::BreakEnd),
    ) {
        (Some(start), Some(end)) if end.occurred_at >= start.occurred_at => {
            end.occurred_at - start.occurred_at
        }
        _ => Duration::zero(),
    }
}

/// Sum of closed overtime segments. Each `overtime_start` pairs with the next
/// `overtime_end`; a trailing open segment is ignored.
pub fn overtime_duration(events: &[AttendanceEvent]) -> Duration {
    let mut total = Duration::zero();
    let mut open = None;

    for event in events {
        match event.kind {
            EventKind::OvertimeStart => open = Some(event.occurred_at),
            EventKind::OvertimeEnd => {
                if let Some(start) = open.take() {
                    total += event.occurred_at - start;
                }
            }
            _ => {}
        }
    }
    total
}

/// Worked time between entry and exit minus the break, or `None` while the
/// day has no exit.
pub fn worked_duration(events: &[AttendanceEvent]) -> Option<Duration> {
    let entry = first_of(events, EventKind::Entry)?;
    let exit = first_of(events, EventKind::Exit)?;
    Some(exit.occurred_at - entry.occurred_at - break_duration(events))
}

/// Builds the day's summary. `events` must be that day's ledger in
/// chronological order.
pub fn summarize(
    employee_id: u64,
    date: NaiveDate,
    events: &[AttendanceEvent],
    schedule: Option<&WorkSchedule>,
    offset: FixedOffset,
) -> DailyAttendanceSummary {
    let state = machine::replay(events);
    let entry = first_of(events, EventKind::Entry);

    let late_minutes = match (entry, schedule) {
        (Some(entry), Some(schedule)) => {
            detector::late_minutes(entry.occurred_at, date, schedule, offset)
        }
        _ => 0,
    };

    DailyAttendanceSummary {
        employee_id,
        date,
        state,
        worked_minutes: worked_duration(events).map(|d| d.num_minutes()),
        break_minutes: break_duration(events).num_minutes(),
        late_minutes,
        overtime_minutes: overtime_duration(events).num_minutes(),
        has_entry: entry.is_some(),
        has_exit: first_of(events, EventKind::Exit).is_some(),
        complete: state == DailyState::Closed,
        schedule_configured: schedule.is_some(),
    }
}
