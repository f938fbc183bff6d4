use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::detector::{self, AbsenceCheck, ReminderCheck};
use super::{calculator, machine};
use crate::clock::Clock;
use crate::error::AttendanceError;
use crate::model::attendance::{
    AttendanceEvent, DailyAttendanceSummary, EventKind, EventStatus, NewEvent,
};
use crate::model::notification::NotificationKind;
use crate::model::schedule::WorkSchedule;
use crate::notify::Dispatcher;
use crate::store::{EventLedger, ScheduleStore};
use crate::utils::retry::{RetryPolicy, retry_transient};

/// Longest range `list_events` will return in one call.
pub const MAX_LIST_DAYS: i64 = 366;

/// Time rules shared by every attendance operation.
#[derive(Debug, Clone, Copy)]
pub struct AttendancePolicy {
    /// Offset used to turn instants into work dates and shift times into instants.
    pub utc_offset: FixedOffset,
    /// An employee is absent once this long has passed after shift start.
    pub absence_grace: Duration,
    /// How long before shift start the reminder window opens.
    pub reminder_lead: Duration,
    pub write_retry: RetryPolicy,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            absence_grace: Duration::minutes(120),
            reminder_lead: Duration::minutes(15),
            write_retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl From<ReviewDecision> for EventStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => EventStatus::Approved,
            ReviewDecision::Reject => EventStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepFailure {
    pub employee_id: u64,
    pub error: String,
}

/// Outcome of one sweep pass. Per-employee problems end up here instead of
/// aborting the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Notifications written by this pass.
    pub created: usize,
    pub already_notified: usize,
    pub present: usize,
    pub day_off: usize,
    /// Employees not yet due (before the absence cutoff or outside the reminder window).
    pub not_due: usize,
    pub not_configured: Vec<u64>,
    pub failures: Vec<SweepFailure>,
    pub cancelled: bool,
}

impl SweepReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            created: 0,
            already_notified: 0,
            present: 0,
            day_off: 0,
            not_due: 0,
            not_configured: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepOutcome {
    Notified,
    AlreadyNotified,
    Present,
    DayOff,
    NotDue,
}

/// Entry point for everything attendance: event ingestion, summaries,
/// review and the absence/reminder sweeps.
pub struct AttendanceService {
    ledger: Arc<dyn EventLedger>,
    schedules: Arc<dyn ScheduleStore>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

impl AttendanceService {
    pub fn new(
        ledger: Arc<dyn EventLedger>,
        schedules: Arc<dyn ScheduleStore>,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            ledger,
            schedules,
            dispatcher,
            clock,
            policy,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    pub fn work_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.policy.utc_offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.work_date(self.clock.now())
    }

    async fn schedule(&self, employee_id: u64) -> Result<WorkSchedule, AttendanceError> {
        self.schedules
            .get_schedule(employee_id)
            .await?
            .ok_or(AttendanceError::NotConfigured { employee_id })
    }

    /// Records an event stamped with the server clock.
    ///
    /// Ordering and duplicates are checked atomically with the insert, so two
    /// concurrent identical submissions produce one event and one
    /// `DuplicateEvent`. Detector side effects never fail the submission.
    pub async fn submit_event(
        &self,
        employee_id: u64,
        request: NewEvent,
    ) -> Result<AttendanceEvent, AttendanceError> {
        let occurred_at = self.clock.now();
        let date = self.work_date(occurred_at);
        let kind = request.kind;

        let event = AttendanceEvent {
            id: Uuid::new_v4(),
            employee_id,
            kind,
            occurred_at,
            work_date: date,
            location: request.location,
            network: request.network,
            note: request.note,
            status: EventStatus::Pending,
        };

        let check = move |day: &[AttendanceEvent]| -> Result<(), AttendanceError> {
            machine::check_submission(day, date, kind).map(|_| ())
        };
        let accepted = retry_transient(self.policy.write_retry, "event append", || {
            self.ledger.append_checked(event.clone(), &check)
        })
        .await;

        let event = match accepted {
            Ok(event) => event,
            Err(e) => {
                if e.is_transient() {
                    error!(error = %e, employee_id, kind = %kind, "Event append failed");
                } else {
                    info!(error = %e, employee_id, kind = %kind, date = %date, "Event rejected");
                }
                return Err(e);
            }
        };

        info!(
            event_id = %event.id,
            employee_id,
            kind = %kind,
            date = %date,
            "Event accepted"
        );
        self.after_accept(&event).await;
        Ok(event)
    }

    async fn after_accept(&self, event: &AttendanceEvent) {
        if !matches!(event.kind, EventKind::Entry | EventKind::BreakEnd) {
            return;
        }

        let schedule = match self.schedule(event.employee_id).await {
            Ok(schedule) => schedule,
            Err(AttendanceError::NotConfigured { employee_id }) => {
                warn!(employee_id, kind = %event.kind, "No schedule configured, skipping detection");
                return;
            }
            Err(e) => {
                error!(error = %e, employee_id = event.employee_id, "Schedule lookup failed, skipping detection");
                return;
            }
        };

        let detected = match event.kind {
            EventKind::Entry => self.detect_lateness(event, &schedule).await,
            _ => self.detect_break_overrun(event, &schedule).await,
        };
        if let Err(e) = detected {
            error!(error = %e, event_id = %event.id, employee_id = event.employee_id, "Detector failed");
        }
    }

    async fn detect_lateness(
        &self,
        entry: &AttendanceEvent,
        schedule: &WorkSchedule,
    ) -> Result<(), AttendanceError> {
        let late = detector::late_minutes(entry.occurred_at, entry.work_date, schedule, self.policy.utc_offset);
        if late == 0 {
            debug!(employee_id = entry.employee_id, "Entry on time");
            return Ok(());
        }

        let message = format!("Clocked in {late} minutes late on {}", entry.work_date);
        self.dispatcher
            .dispatch_once(entry.employee_id, NotificationKind::Late, message, entry.work_date)
            .await?;
        Ok(())
    }

    async fn detect_break_overrun(
        &self,
        break_end: &AttendanceEvent,
        schedule: &WorkSchedule,
    ) -> Result<(), AttendanceError> {
        let day = self
            .ledger
            .events_for_day(break_end.employee_id, break_end.work_date)
            .await?;
        let Some(over) = detector::break_overrun_minutes(&day, schedule) else {
            return Ok(());
        };

        let message = format!(
            "Break on {} ran {over} minutes over the {} minute allowance",
            break_end.work_date, schedule.break_duration_minutes
        );
        self.dispatcher
            .dispatch_once(
                break_end.employee_id,
                NotificationKind::GenericAlert,
                message,
                break_end.work_date,
            )
            .await?;
        Ok(())
    }

    /// Replays the day's events into a summary. A missing schedule only
    /// zeroes `late_minutes`.
    pub async fn get_daily_summary(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<DailyAttendanceSummary, AttendanceError> {
        let events = self.ledger.events_for_day(employee_id, date).await?;
        let schedule = match self.schedule(employee_id).await {
            Ok(schedule) => Some(schedule),
            Err(AttendanceError::NotConfigured { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(calculator::summarize(
            employee_id,
            date,
            &events,
            schedule.as_ref(),
            self.policy.utc_offset,
        ))
    }

    pub async fn list_events(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        if from > to {
            return Err(AttendanceError::InvalidRequest(
                "`from` must not be after `to`".into(),
            ));
        }
        if (to - from).num_days() >= MAX_LIST_DAYS {
            return Err(AttendanceError::InvalidRequest(format!(
                "date range is limited to {MAX_LIST_DAYS} days"
            )));
        }
        self.ledger.events_between(employee_id, from, to).await
    }

    pub async fn review_event(
        &self,
        event_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<AttendanceEvent, AttendanceError> {
        let status = EventStatus::from(decision);
        let event = retry_transient(self.policy.write_retry, "event review", || {
            self.ledger.review(event_id, status)
        })
        .await?;

        info!(event_id = %event_id, employee_id = event.employee_id, decision = %decision, "Event reviewed");
        Ok(event)
    }

    pub async fn run_absence_sweep(&self, date: NaiveDate) -> Result<SweepReport, AttendanceError> {
        self.run_absence_sweep_until(date, &AtomicBool::new(false)).await
    }

    /// Absence pass over every active employee. Stops between employees once
    /// `cancel` is set; re-running resumes safely because each notification
    /// is written at most once per day.
    pub async fn run_absence_sweep_until(
        &self,
        date: NaiveDate,
        cancel: &AtomicBool,
    ) -> Result<SweepReport, AttendanceError> {
        let now = self.clock.now();
        self.sweep("absence", date, cancel, |employee_id| {
            self.evaluate_absence(employee_id, date, now)
        })
        .await
    }

    pub async fn run_reminder_sweep(&self, date: NaiveDate) -> Result<SweepReport, AttendanceError> {
        self.run_reminder_sweep_until(date, &AtomicBool::new(false)).await
    }

    pub async fn run_reminder_sweep_until(
        &self,
        date: NaiveDate,
        cancel: &AtomicBool,
    ) -> Result<SweepReport, AttendanceError> {
        let now = self.clock.now();
        self.sweep("reminder", date, cancel, |employee_id| {
            self.evaluate_reminder(employee_id, date, now)
        })
        .await
    }

    async fn sweep<F, Fut>(
        &self,
        name: &str,
        date: NaiveDate,
        cancel: &AtomicBool,
        evaluate: F,
    ) -> Result<SweepReport, AttendanceError>
    where
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<SweepOutcome, AttendanceError>>,
    {
        let employees = self.schedules.active_employees().await?;
        let mut report = SweepReport::new(date);

        for employee_id in employees {
            if cancel.load(Ordering::Relaxed) {
                warn!(sweep = name, date = %date, "Sweep cancelled");
                report.cancelled = true;
                break;
            }

            match evaluate(employee_id).await {
                Ok(SweepOutcome::Notified) => report.created += 1,
                Ok(SweepOutcome::AlreadyNotified) => report.already_notified += 1,
                Ok(SweepOutcome::Present) => report.present += 1,
                Ok(SweepOutcome::DayOff) => report.day_off += 1,
                Ok(SweepOutcome::NotDue) => report.not_due += 1,
                Err(AttendanceError::NotConfigured { employee_id }) => {
                    warn!(sweep = name, employee_id, date = %date, "No schedule configured, skipping employee");
                    report.not_configured.push(employee_id);
                }
                Err(e) => {
                    error!(sweep = name, error = %e, employee_id, date = %date, "Sweep failed for employee");
                    report.failures.push(SweepFailure {
                        employee_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            sweep = name,
            date = %date,
            created = report.created,
            not_configured = report.not_configured.len(),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "Sweep finished"
        );
        Ok(report)
    }

    async fn evaluate_absence(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, AttendanceError> {
        let schedule = self.schedule(employee_id).await?;
        // Read per employee right before the write, not once at sweep start.
        let day = self.ledger.events_for_day(employee_id, date).await?;

        match detector::check_absence(
            &schedule,
            date,
            &day,
            now,
            self.policy.utc_offset,
            self.policy.absence_grace,
        ) {
            AbsenceCheck::DayOff => Ok(SweepOutcome::DayOff),
            AbsenceCheck::BeforeCutoff => Ok(SweepOutcome::NotDue),
            AbsenceCheck::Present => Ok(SweepOutcome::Present),
            AbsenceCheck::Absent => {
                let message = format!(
                    "No clock-in recorded on {date} (shift starts at {})",
                    schedule.shift_start.format("%H:%M")
                );
                let written = self
                    .dispatcher
                    .dispatch_once(employee_id, NotificationKind::Absence, message, date)
                    .await?;
                Ok(if written.is_some() {
                    SweepOutcome::Notified
                } else {
                    SweepOutcome::AlreadyNotified
                })
            }
        }
    }

    async fn evaluate_reminder(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, AttendanceError> {
        let schedule = self.schedule(employee_id).await?;
        let day = self.ledger.events_for_day(employee_id, date).await?;

        match detector::check_reminder(
            &schedule,
            date,
            &day,
            now,
            self.policy.utc_offset,
            self.policy.reminder_lead,
        ) {
            ReminderCheck::DayOff => Ok(SweepOutcome::DayOff),
            ReminderCheck::OutsideWindow => Ok(SweepOutcome::NotDue),
            ReminderCheck::Present => Ok(SweepOutcome::Present),
            ReminderCheck::Due => {
                let message = format!(
                    "Your shift starts at {} on {date}",
                    schedule.shift_start.format("%H:%M")
                );
                let written = self
                    .dispatcher
                    .dispatch_once(employee_id, NotificationKind::ScheduleReminder, message, date)
                    .await?;
                Ok(if written.is_some() {
                    SweepOutcome::Notified
                } else {
                    SweepOutcome::AlreadyNotified
                })
            }
        }
    }
}
