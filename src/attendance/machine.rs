//! Daily event-ordering discipline.
//!
//! One (employee, date) partition moves through
//! `NoEntry → OnShift → OnBreak → PostBreak → Closed`, with any number of
//! overtime segments allowed after `Closed`. Everything here is pure so the
//! same rules can run inside a store transaction and in tests.

use chrono::NaiveDate;

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceEvent, DailyState, EventKind};

/// Next state for `kind` arriving in `state`, or `None` if the pair is not in
/// the transition table.
pub fn transition(state: DailyState, kind: EventKind) -> Option<DailyState> {
    use DailyState::*;
    use EventKind::*;

    match (state, kind) {
        (NoEntry, Entry) => Some(OnShift),
        (OnShift, BreakStart) => Some(OnBreak),
        (OnBreak, BreakEnd) => Some(PostBreak),
        (OnShift | PostBreak, Exit) => Some(Closed),
        (Closed, OvertimeStart) => Some(OnOvertime),
        (OnOvertime, OvertimeEnd) => Some(Closed),
        _ => None,
    }
}

/// Folds a day's recorded events (chronological) into its current state.
pub fn replay<'a, I>(events: I) -> DailyState
where
    I: IntoIterator<Item = &'a AttendanceEvent>,
{
    events
        .into_iter()
        .fold(DailyState::NoEntry, |state, event| {
            transition(state, event.kind).unwrap_or(state)
        })
}

/// Validates `kind` against the events already recorded for `date` and
/// returns the state the day moves to.
///
/// Duplicates are checked before ordering, so a second `entry` reports
/// `DuplicateEvent` rather than `OutOfSequenceEvent`.
pub fn check_submission(
    day: &[AttendanceEvent],
    date: NaiveDate,
    kind: EventKind,
) -> Result<DailyState, AttendanceError> {
    if !kind.is_overtime() && day.iter().any(|e| e.kind == kind) {
        return Err(AttendanceError::DuplicateEvent { kind, date });
    }

    let state = replay(day);
    transition(state, kind).ok_or(AttendanceError::OutOfSequenceEvent { state, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::EventStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn day_of(kinds: &[EventKind]) -> Vec<AttendanceEvent> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| AttendanceEvent {
                id: Uuid::new_v4(),
                employee_id: 7,
                kind: *kind,
                occurred_at: Utc.with_ymd_and_hms(2026, 3, 2, 8 + i as u32, 0, 0).unwrap(),
                work_date: date(),
                location: None,
                network: None,
                note: None,
                status: EventStatus::Pending,
            })
            .collect()
    }

    #[test]
    fn full_day_walks_the_table() {
        use EventKind::*;
        let kinds = [Entry, BreakStart, BreakEnd, Exit, OvertimeStart, OvertimeEnd];
        let mut recorded = Vec::new();
        let expected = [
            DailyState::OnShift,
            DailyState::OnBreak,
            DailyState::PostBreak,
            DailyState::Closed,
            DailyState::OnOvertime,
            DailyState::Closed,
        ];

        for (kind, want) in kinds.iter().zip(expected) {
            let day = day_of(&recorded);
            assert_eq!(check_submission(&day, date(), *kind).unwrap(), want);
            recorded.push(*kind);
        }
        assert_eq!(replay(&day_of(&recorded)), DailyState::Closed);
    }

    #[test]
    fn exit_before_entry_is_out_of_sequence() {
        let err = check_submission(&[], date(), EventKind::Exit).unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::OutOfSequenceEvent {
                state: DailyState::NoEntry,
                kind: EventKind::Exit
            }
        ));
    }

    #[test]
    fn exit_while_on_break_is_out_of_sequence() {
        let day = day_of(&[EventKind::Entry, EventKind::BreakStart]);
        let err = check_submission(&day, date(), EventKind::Exit).unwrap_err();
        assert_eq!(err.code(), "out_of_sequence_event");
    }

    #[test]
    fn second_entry_is_a_duplicate() {
        let day = day_of(&[EventKind::Entry]);
        let err = check_submission(&day, date(), EventKind::Entry).unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateEvent { kind: EventKind::Entry, .. }));
    }

    #[test]
    fn second_exit_is_a_duplicate_not_a_new_cycle() {
        let day = day_of(&[EventKind::Entry, EventKind::Exit]);
        let err = check_submission(&day, date(), EventKind::Exit).unwrap_err();
        assert_eq!(err.code(), "duplicate_event");

        let err = check_submission(&day, date(), EventKind::Entry).unwrap_err();
        assert_eq!(err.code(), "duplicate_event");
    }

    #[test]
    fn overtime_may_cycle_after_close() {
        use EventKind::*;
        let day = day_of(&[Entry, Exit, OvertimeStart, OvertimeEnd]);
        assert_eq!(
            check_submission(&day, date(), OvertimeStart).unwrap(),
            DailyState::OnOvertime
        );
    }

    #[test]
    fn overtime_before_exit_is_rejected() {
        let day = day_of(&[EventKind::Entry]);
        let err = check_submission(&day, date(), EventKind::OvertimeStart).unwrap_err();
        assert_eq!(err.code(), "out_of_sequence_event");
    }

    #[test]
    fn every_pair_outside_the_table_is_rejected() {
        let states = [
            DailyState::NoEntry,
            DailyState::OnShift,
            DailyState::OnBreak,
            DailyState::PostBreak,
            DailyState::OnOvertime,
            DailyState::Closed,
        ];
        let allowed = states
            .iter()
            .flat_map(|s| EventKind::ALL.iter().map(move |k| (*s, *k)))
            .filter(|(s, k)| transition(*s, *k).is_some())
            .count();
        // 6 table rows, exit is legal from two states
        assert_eq!(allowed, 7);
    }
}
