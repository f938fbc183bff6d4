use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::{DayCheck, EventLedger, NotificationStore, ScheduleStore};
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceEvent, EventStatus};
use crate::model::notification::Notification;
use crate::model::schedule::WorkSchedule;

/// Process-local backend. A single write lock over the ledger serializes all
/// appends, which is what makes `append_checked` atomic here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<Vec<AttendanceEvent>>,
    schedules: RwLock<HashMap<u64, WorkSchedule>>,
    employees: RwLock<BTreeSet<u64>>,
    notifications: RwLock<Vec<Notification>>,
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockReadGuard<'a, T>, AttendanceError> {
    lock.read()
        .map_err(|_| AttendanceError::TransientStoreError(format!("{what} lock poisoned")))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'a, T>, AttendanceError> {
    lock.write()
        .map_err(|_| AttendanceError::TransientStoreError(format!("{what} lock poisoned")))
}

fn chronological(mut events: Vec<AttendanceEvent>) -> Vec<AttendanceEvent> {
    // stable: same-instant events keep append order
    events.sort_by_key(|e| e.occurred_at);
    events
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an employee on the active roster without a schedule.
    pub fn add_employee(&self, employee_id: u64) -> Result<(), AttendanceError> {
        write(&self.employees, "employees")?.insert(employee_id);
        Ok(())
    }

    /// Stores (or replaces) a schedule and puts its employee on the roster.
    pub fn put_schedule(&self, schedule: WorkSchedule) -> Result<(), AttendanceError> {
        self.add_employee(schedule.employee_id)?;
        write(&self.schedules, "schedules")?.insert(schedule.employee_id, schedule);
        Ok(())
    }

    /// Seeds schedules from a JSON array of `WorkSchedule` objects.
    pub fn load_schedules(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading schedules from {}", path.display()))?;
        let schedules: Vec<WorkSchedule> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing schedules in {}", path.display()))?;

        let count = schedules.len();
        for schedule in schedules {
            self.put_schedule(schedule)?;
        }
        Ok(count)
    }
}

#[async_trait]
impl EventLedger for MemoryStore {
    async fn append_checked(
        &self,
        event: AttendanceEvent,
        check: DayCheck<'_>,
    ) -> Result<AttendanceEvent, AttendanceError> {
        let mut events = write(&self.events, "ledger")?;

        let day = chronological(
            events
                .iter()
                .filter(|e| e.employee_id == event.employee_id && e.work_date == event.work_date)
                .cloned()
                .collect(),
        );
        check(&day)?;

        events.push(event.clone());
        Ok(event)
    }

    async fn events_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        self.events_between(employee_id, date, date).await
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        let events = read(&self.events, "ledger")?;
        Ok(chronological(
            events
                .iter()
                .filter(|e| e.employee_id == employee_id && e.work_date >= from && e.work_date <= to)
                .cloned()
                .collect(),
        ))
    }

    async fn review(&self, id: Uuid, status: EventStatus) -> Result<AttendanceEvent, AttendanceError> {
        let mut events = write(&self.events, "ledger")?;
        let event = events
            .iter_mut()
            .find(|e| e.id == id && e.status == EventStatus::Pending)
            .ok_or_else(|| AttendanceError::not_found(format!("pending event {id}")))?;

        event.status = status;
        Ok(event.clone())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn get_schedule(&self, employee_id: u64) -> Result<Option<WorkSchedule>, AttendanceError> {
        Ok(read(&self.schedules, "schedules")?.get(&employee_id).cloned())
    }

    async fn active_employees(&self) -> Result<Vec<u64>, AttendanceError> {
        Ok(read(&self.employees, "employees")?.iter().copied().collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, AttendanceError> {
        write(&self.notifications, "notifications")?.push(notification.clone());
        Ok(notification)
    }

    async fn insert_once(
        &self,
        notification: Notification,
    ) -> Result<Option<Notification>, AttendanceError> {
        let mut notifications = write(&self.notifications, "notifications")?;

        let exists = notification.reference_date.is_some()
            && notifications.iter().any(|n| {
                n.employee_id == notification.employee_id
                    && n.kind == notification.kind
                    && n.reference_date == notification.reference_date
            });
        if exists {
            return Ok(None);
        }

        notifications.push(notification.clone());
        Ok(Some(notification))
    }

    async fn list(
        &self,
        employee_id: u64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AttendanceError> {
        let notifications = read(&self.notifications, "notifications")?;
        let mut listed: Vec<Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.employee_id == employee_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        // stable, so equal timestamps stay latest-inserted first
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, AttendanceError> {
        Ok(read(&self.notifications, "notifications")?
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn mark_read(&self, id: Uuid) -> Result<Notification, AttendanceError> {
        let mut notifications = write(&self.notifications, "notifications")?;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AttendanceError::not_found(format!("notification {id}")))?;

        notification.read = true;
        Ok(notification.clone())
    }
}
