mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use uuid::Uuid;

use common::{Fixture, monday, policy, saturday};
use hrm_attendance::attendance::{AttendancePolicy, ReviewDecision};
use hrm_attendance::error::AttendanceError;
use hrm_attendance::model::attendance::{AttendanceEvent, DailyState, EventKind, EventStatus, NewEvent};
use hrm_attendance::model::notification::NotificationKind;
use hrm_attendance::store::{DayCheck, EventLedger, MemoryStore, NotificationStore};
use hrm_attendance::utils::retry::RetryPolicy;

async fn clock_in_at(f: &Fixture, h: u32, m: u32, kind: EventKind) -> Result<AttendanceEvent, AttendanceError> {
    f.set_time(h, m);
    f.service.submit_event(1, NewEvent::of(kind)).await
}

#[actix_web::test]
async fn regular_day_is_accepted_and_summarized() {
    let f = Fixture::with_schedules(&[1]);

    clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();
    clock_in_at(&f, 12, 0, EventKind::BreakStart).await.unwrap();
    clock_in_at(&f, 12, 30, EventKind::BreakEnd).await.unwrap();
    clock_in_at(&f, 17, 0, EventKind::Exit).await.unwrap();

    let summary = f.service.get_daily_summary(1, monday()).await.unwrap();
    assert_eq!(summary.state, DailyState::Closed);
    assert_eq!(summary.worked_minutes, Some(510));
    assert_eq!(summary.break_minutes, 30);
    assert_eq!(summary.late_minutes, 0);
    assert!(summary.complete);
    assert!(summary.schedule_configured);
}

#[actix_web::test]
async fn events_are_stamped_by_the_server_clock() {
    let f = Fixture::with_schedules(&[1]);

    let event = clock_in_at(&f, 7, 58, EventKind::Entry).await.unwrap();
    assert_eq!(event.occurred_at, common::at(7, 58));
    assert_eq!(event.work_date, monday());
    assert_eq!(event.status, EventStatus::Pending);
}

#[actix_web::test]
async fn exit_before_entry_is_out_of_sequence_and_not_recorded() {
    let f = Fixture::with_schedules(&[1]);

    let err = clock_in_at(&f, 17, 0, EventKind::Exit).await.unwrap_err();
    assert!(matches!(
        err,
        AttendanceError::OutOfSequenceEvent {
            state: DailyState::NoEntry,
            kind: EventKind::Exit
        }
    ));
    assert!(f.store.events_for_day(1, monday()).await.unwrap().is_empty());
}

#[actix_web::test]
async fn second_entry_is_a_duplicate() {
    let f = Fixture::with_schedules(&[1]);

    clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();
    let err = clock_in_at(&f, 8, 5, EventKind::Entry).await.unwrap_err();

    assert_eq!(err.code(), "duplicate_event");
    assert_eq!(f.store.events_for_day(1, monday()).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn concurrent_entries_accept_exactly_one() {
    let f = Fixture::with_schedules(&[1]);
    f.set_time(8, 0);

    let attempts = (0..8).map(|_| f.service.submit_event(1, NewEvent::of(EventKind::Entry)));
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AttendanceError::DuplicateEvent { .. }))
    );
    assert_eq!(f.store.events_for_day(1, monday()).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn summary_is_stable_without_new_events() {
    let f = Fixture::with_schedules(&[1]);
    clock_in_at(&f, 8, 10, EventKind::Entry).await.unwrap();

    let first = f.service.get_daily_summary(1, monday()).await.unwrap();
    f.set_time(16, 0);
    let second = f.service.get_daily_summary(1, monday()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.worked_minutes, None);
    assert_eq!(first.state, DailyState::OnShift);
}

#[actix_web::test]
async fn late_entry_notifies_once_with_the_minute_count() {
    let f = Fixture::with_schedules(&[1]);

    clock_in_at(&f, 8, 15, EventKind::Entry).await.unwrap();

    let summary = f.service.get_daily_summary(1, monday()).await.unwrap();
    assert_eq!(summary.late_minutes, 15);

    let notifications = f.store.list(1, false).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Late);
    assert_eq!(notifications[0].reference_date, Some(monday()));
    assert!(notifications[0].message.contains("15 minutes"));
    assert_eq!(f.gateway.pushed.lock().unwrap().len(), 1);
}

#[actix_web::test]
async fn early_entry_is_not_late() {
    let f = Fixture::with_schedules(&[1]);

    clock_in_at(&f, 7, 50, EventKind::Entry).await.unwrap();

    assert_eq!(f.service.get_daily_summary(1, monday()).await.unwrap().late_minutes, 0);
    assert!(f.store.list(1, false).await.unwrap().is_empty());
    assert!(f.gateway.pushed.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn weekend_entry_is_not_late() {
    let f = Fixture::with_schedules(&[1]);
    f.clock.set(Utc.with_ymd_and_hms(2026, 3, 7, 10, 0, 0).unwrap());

    let entry = f.service.submit_event(1, NewEvent::of(EventKind::Entry)).await.unwrap();
    assert_eq!(entry.work_date, saturday());

    let summary = f.service.get_daily_summary(1, saturday()).await.unwrap();
    assert_eq!(summary.late_minutes, 0);
    assert!(f.store.list(1, false).await.unwrap().is_empty());
    assert!(f.gateway.pushed.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn flexible_schedules_are_never_late() {
    let f = Fixture::new();
    let mut schedule = common::office_schedule(1);
    schedule.flexible = true;
    f.store.put_schedule(schedule).unwrap();

    clock_in_at(&f, 10, 30, EventKind::Entry).await.unwrap();

    assert_eq!(f.service.get_daily_summary(1, monday()).await.unwrap().late_minutes, 0);
    assert!(f.store.list(1, false).await.unwrap().is_empty());
}

#[actix_web::test]
async fn unscheduled_employee_still_clocks_in() {
    let f = Fixture::new();

    clock_in_at(&f, 9, 0, EventKind::Entry).await.unwrap();
    clock_in_at(&f, 18, 0, EventKind::Exit).await.unwrap();

    let summary = f.service.get_daily_summary(1, monday()).await.unwrap();
    assert!(!summary.schedule_configured);
    assert_eq!(summary.late_minutes, 0);
    assert_eq!(summary.worked_minutes, Some(540));
    assert!(f.store.list(1, false).await.unwrap().is_empty());
}

#[actix_web::test]
async fn long_break_raises_a_single_alert() {
    let f = Fixture::with_schedules(&[1]);

    clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();
    clock_in_at(&f, 12, 0, EventKind::BreakStart).await.unwrap();
    clock_in_at(&f, 13, 20, EventKind::BreakEnd).await.unwrap();

    let alerts = f.store.list(1, false).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, NotificationKind::GenericAlert);
    assert!(alerts[0].message.contains("20 minutes"));
}

#[actix_web::test]
async fn overtime_can_repeat_after_exit() {
    let f = Fixture::with_schedules(&[1]);

    clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();
    clock_in_at(&f, 17, 0, EventKind::Exit).await.unwrap();
    clock_in_at(&f, 18, 0, EventKind::OvertimeStart).await.unwrap();
    clock_in_at(&f, 19, 0, EventKind::OvertimeEnd).await.unwrap();
    clock_in_at(&f, 20, 0, EventKind::OvertimeStart).await.unwrap();
    clock_in_at(&f, 20, 30, EventKind::OvertimeEnd).await.unwrap();

    let err = clock_in_at(&f, 21, 0, EventKind::OvertimeEnd).await.unwrap_err();
    assert_eq!(err.code(), "out_of_sequence_event");

    let summary = f.service.get_daily_summary(1, monday()).await.unwrap();
    assert_eq!(summary.overtime_minutes, 90);
    assert_eq!(summary.worked_minutes, Some(540));
    assert_eq!(summary.state, DailyState::Closed);
}

#[actix_web::test]
async fn review_moves_pending_events_only() {
    let f = Fixture::with_schedules(&[1]);
    let entry = clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();
    let before = f.service.get_daily_summary(1, monday()).await.unwrap();

    let approved = f.service.review_event(entry.id, ReviewDecision::Approve).await.unwrap();
    assert_eq!(approved.status, EventStatus::Approved);
    assert_eq!(approved.occurred_at, entry.occurred_at);

    let again = f.service.review_event(entry.id, ReviewDecision::Reject).await.unwrap_err();
    assert_eq!(again.code(), "not_found");

    let unknown = f.service.review_event(Uuid::new_v4(), ReviewDecision::Approve).await.unwrap_err();
    assert_eq!(unknown.code(), "not_found");

    assert_eq!(f.service.get_daily_summary(1, monday()).await.unwrap(), before);
}

#[actix_web::test]
async fn list_events_validates_the_range() {
    let f = Fixture::with_schedules(&[1]);
    clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();

    let day = monday();
    assert_eq!(f.service.list_events(1, day, day).await.unwrap().len(), 1);

    let err = f.service.list_events(1, day, day - Duration::days(1)).await.unwrap_err();
    assert_eq!(err.code(), "invalid_request");

    let err = f.service.list_events(1, day, day + Duration::days(400)).await.unwrap_err();
    assert_eq!(err.code(), "invalid_request");
}

#[actix_web::test]
async fn work_date_follows_the_configured_offset() {
    let store = Arc::new(MemoryStore::new());
    let policy = AttendancePolicy {
        utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
        ..policy()
    };
    let f = Fixture::build(store.clone(), store, policy);

    // 01:00 UTC on Tuesday is still Monday evening at UTC-3
    f.clock.set(Utc.with_ymd_and_hms(2026, 3, 3, 1, 0, 0).unwrap());
    let event = f.service.submit_event(1, NewEvent::of(EventKind::Entry)).await.unwrap();

    assert_eq!(event.work_date, monday());
}

/// Ledger that reports the store as unavailable for the first `failures` appends.
struct FlakyLedger {
    inner: Arc<MemoryStore>,
    failures: AtomicU32,
}

#[async_trait]
impl EventLedger for FlakyLedger {
    async fn append_checked(
        &self,
        event: AttendanceEvent,
        check: DayCheck<'_>,
    ) -> Result<AttendanceEvent, AttendanceError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AttendanceError::TransientStoreError("connection reset".into()));
        }
        self.inner.append_checked(event, check).await
    }

    async fn events_for_day(&self, employee_id: u64, date: NaiveDate) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        self.inner.events_for_day(employee_id, date).await
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        self.inner.events_between(employee_id, from, to).await
    }

    async fn review(&self, id: Uuid, status: EventStatus) -> Result<AttendanceEvent, AttendanceError> {
        self.inner.review(id, status).await
    }
}

fn flaky_fixture(failures: u32, retries: u32) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(FlakyLedger {
        inner: store.clone(),
        failures: AtomicU32::new(failures),
    });
    let policy = AttendancePolicy {
        write_retry: RetryPolicy {
            retries,
            backoff: StdDuration::from_millis(1),
        },
        ..policy()
    };
    Fixture::build(ledger, store, policy)
}

#[actix_web::test]
async fn transient_append_failures_are_retried() {
    let f = flaky_fixture(2, 3);

    clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap();
    assert_eq!(f.store.events_for_day(1, monday()).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn persistent_store_failure_surfaces_as_transient() {
    let f = flaky_fixture(5, 2);

    let err = clock_in_at(&f, 8, 0, EventKind::Entry).await.unwrap_err();
    assert!(err.is_transient());
    assert!(f.store.events_for_day(1, monday()).await.unwrap().is_empty());
}
