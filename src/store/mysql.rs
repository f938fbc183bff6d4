use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use futures_util::StreamExt;
use sqlx::{FromRow, MySqlPool};
use uuid::Uuid;

use super::{DayCheck, EventLedger, NotificationStore, ScheduleStore};
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceEvent, EventKind, EventStatus, GeoPoint};
use crate::model::notification::{Notification, NotificationKind};
use crate::model::schedule::{Regime, WorkSchedule};

const EVENT_COLUMNS: &str = "id, employee_id, kind, occurred_at, work_date, latitude, longitude, network, note, status";
const NOTIFICATION_COLUMNS: &str = "id, employee_id, kind, message, reference_date, created_at, is_read";

/// MySQL backend. Ledger appends run in a transaction that locks the day's
/// rows; the `(employee_id, work_date, single_kind)` unique key backs up the
/// duplicate rule across processes.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Duplicate key on insert
fn is_duplicate_key(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.code().as_deref() == Some("23000");
    }
    false
}

fn corrupt(what: &str, value: &str) -> AttendanceError {
    AttendanceError::TransientStoreError(format!("unreadable {what} in store: {value}"))
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    employee_id: u64,
    kind: String,
    occurred_at: DateTime<Utc>,
    work_date: NaiveDate,
    latitude: Option<f64>,
    longitude: Option<f64>,
    network: Option<String>,
    note: Option<String>,
    status: String,
}

impl TryFrom<EventRow> for AttendanceEvent {
    type Error = AttendanceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        };
        Ok(AttendanceEvent {
            id: Uuid::parse_str(&row.id).map_err(|_| corrupt("event id", &row.id))?,
            employee_id: row.employee_id,
            kind: EventKind::from_str(&row.kind).map_err(|_| corrupt("event kind", &row.kind))?,
            occurred_at: row.occurred_at,
            work_date: row.work_date,
            location,
            network: row.network,
            note: row.note,
            status: EventStatus::from_str(&row.status)
                .map_err(|_| corrupt("event status", &row.status))?,
        })
    }
}

#[derive(FromRow)]
struct ScheduleRow {
    employee_id: u64,
    shift_start: NaiveTime,
    shift_end: NaiveTime,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
    break_duration_minutes: u32,
    work_days: String,
    regime: String,
    flexible: bool,
}

impl TryFrom<ScheduleRow> for WorkSchedule {
    type Error = AttendanceError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        // stored as "Mon,Tue,Fri"
        let work_days = row
            .work_days
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| Weekday::from_str(d).map_err(|_| corrupt("work day", d)))
            .collect::<Result<_, _>>()?;

        Ok(WorkSchedule {
            employee_id: row.employee_id,
            shift_start: row.shift_start,
            shift_end: row.shift_end,
            break_start: row.break_start,
            break_end: row.break_end,
            break_duration_minutes: row.break_duration_minutes,
            work_days,
            regime: Regime::from_str(&row.regime).map_err(|_| corrupt("regime", &row.regime))?,
            flexible: row.flexible,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    employee_id: u64,
    kind: String,
    message: String,
    reference_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    is_read: bool,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AttendanceError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: Uuid::parse_str(&row.id).map_err(|_| corrupt("notification id", &row.id))?,
            employee_id: row.employee_id,
            kind: NotificationKind::from_str(&row.kind)
                .map_err(|_| corrupt("notification kind", &row.kind))?,
            message: row.message,
            reference_date: row.reference_date,
            created_at: row.created_at,
            read: row.is_read,
        })
    }
}

fn events_from_rows(rows: Vec<EventRow>) -> Result<Vec<AttendanceEvent>, AttendanceError> {
    rows.into_iter().map(AttendanceEvent::try_from).collect()
}

impl MySqlStore {
    async fn fetch_event(&self, id: Uuid) -> Result<Option<AttendanceEvent>, AttendanceError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM attendance_events WHERE id = ?");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceEvent::try_from)
            .transpose()
    }

    async fn write_notification(&self, n: &Notification) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, employee_id, kind, message, reference_date, created_at, is_read)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(n.id.to_string())
        .bind(n.employee_id)
        .bind(n.kind.to_string())
        .bind(&n.message)
        .bind(n.reference_date)
        .bind(n.created_at)
        .bind(n.read)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl EventLedger for MySqlStore {
    async fn append_checked(
        &self,
        event: AttendanceEvent,
        check: DayCheck<'_>,
    ) -> Result<AttendanceEvent, AttendanceError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE also takes the gap lock on an empty day, so a concurrent
        // first event for the same day waits here
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM attendance_events \
             WHERE employee_id = ? AND work_date = ? ORDER BY occurred_at, seq FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.employee_id)
            .bind(event.work_date)
            .fetch_all(&mut *tx)
            .await?;
        check(&events_from_rows(rows)?)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance_events
                (id, employee_id, work_date, kind, occurred_at, latitude, longitude, network, note, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.employee_id)
        .bind(event.work_date)
        .bind(event.kind.to_string())
        .bind(event.occurred_at)
        .bind(event.location.map(|l| l.latitude))
        .bind(event.location.map(|l| l.longitude))
        .bind(event.network.as_deref())
        .bind(event.note.as_deref())
        .bind(event.status.to_string())
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_duplicate_key(&e) {
                return Err(AttendanceError::DuplicateEvent {
                    kind: event.kind,
                    date: event.work_date,
                });
            }
            return Err(e.into());
        }

        tx.commit().await?;
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
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM attendance_events \
             WHERE employee_id = ? AND work_date BETWEEN ? AND ? ORDER BY occurred_at, seq"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        events_from_rows(rows)
    }

    async fn review(&self, id: Uuid, status: EventStatus) -> Result<AttendanceEvent, AttendanceError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_events
            SET status = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(status.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AttendanceError::not_found(format!("pending event {id}")));
        }

        self.fetch_event(id)
            .await?
            .ok_or_else(|| AttendanceError::not_found(format!("event {id}")))
    }
}

#[async_trait]
impl ScheduleStore for MySqlStore {
    async fn get_schedule(&self, employee_id: u64) -> Result<Option<WorkSchedule>, AttendanceError> {
        sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT employee_id, shift_start, shift_end, break_start, break_end,
                   break_duration_minutes, work_days, regime, flexible
            FROM work_schedules
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?
        .map(WorkSchedule::try_from)
        .transpose()
    }

    async fn active_employees(&self) -> Result<Vec<u64>, AttendanceError> {
        let mut stream =
            sqlx::query_as::<_, (u64,)>("SELECT id FROM employees WHERE status = 'active' ORDER BY id")
                .fetch(&self.pool);

        let mut ids = Vec::new();
        while let Some(row) = stream.next().await {
            let (id,) = row?;
            ids.push(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl NotificationStore for MySqlStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, AttendanceError> {
        self.write_notification(&notification).await?;
        Ok(notification)
    }

    async fn insert_once(
        &self,
        notification: Notification,
    ) -> Result<Option<Notification>, AttendanceError> {
        match self.write_notification(&notification).await {
            Ok(()) => Ok(Some(notification)),
            Err(e) if is_duplicate_key(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(
        &self,
        employee_id: u64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AttendanceError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE employee_id = ? AND (? = FALSE OR is_read = FALSE) \
             ORDER BY created_at DESC, seq DESC"
        );
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(employee_id)
            .bind(unread_only)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, AttendanceError> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?");
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Notification::try_from)
            .transpose()
    }

    async fn mark_read(&self, id: Uuid) -> Result<Notification, AttendanceError> {
        // MySQL reports 0 affected rows for an already-read record, so
        // existence is checked separately
        let mut notification = self
            .get(id)
            .await?
            .ok_or_else(|| AttendanceError::not_found(format!("notification {id}")))?;

        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        notification.read = true;
        Ok(notification)
    }
}
