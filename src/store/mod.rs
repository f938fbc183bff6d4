//! Persistence seams for the attendance core.
//!
//! Every backend implements the same three traits. The only write that needs
//! more than single-record atomicity is [`EventLedger::append_checked`], which
//! evaluates the day's ordering rules and inserts under one lock or
//! transaction.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceEvent, EventStatus};
use crate::model::notification::Notification;
use crate::model::schedule::WorkSchedule;

pub mod memory;
pub mod mysql;
pub mod schedule_cache;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use schedule_cache::CachedScheduleStore;

/// Validation run against the events already recorded for the new event's
/// (employee, work date), in chronological order.
pub type DayCheck<'a> = &'a (dyn Fn(&[AttendanceEvent]) -> Result<(), AttendanceError> + Send + Sync);

#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Appends `event` iff `check` accepts the day as currently stored. The
    /// check and the insert are atomic with respect to other appends for the
    /// same employee and day.
    async fn append_checked(
        &self,
        event: AttendanceEvent,
        check: DayCheck<'_>,
    ) -> Result<AttendanceEvent, AttendanceError>;

    async fn events_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AttendanceError>;

    /// Events with `from <= work_date <= to`, chronological.
    async fn events_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AttendanceError>;

    /// Moves a pending event to `status`. Anything not pending is `NotFound`.
    async fn review(&self, id: Uuid, status: EventStatus) -> Result<AttendanceEvent, AttendanceError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_schedule(&self, employee_id: u64) -> Result<Option<WorkSchedule>, AttendanceError>;

    /// Employees the sweeps should visit, configured or not.
    async fn active_employees(&self) -> Result<Vec<u64>, AttendanceError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, AttendanceError>;

    /// Inserts unless a notification with the same (employee, kind,
    /// reference date) exists. Returns `None` when nothing was written.
    async fn insert_once(
        &self,
        notification: Notification,
    ) -> Result<Option<Notification>, AttendanceError>;

    /// Newest first.
    async fn list(
        &self,
        employee_id: u64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AttendanceError>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, AttendanceError>;

    async fn mark_read(&self, id: Uuid) -> Result<Notification, AttendanceError>;
}
