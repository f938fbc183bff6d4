use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of attendance event an employee can record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Entry,
    BreakStart,
    BreakEnd,
    Exit,
    OvertimeStart,
    OvertimeEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Entry,
        EventKind::BreakStart,
        EventKind::BreakEnd,
        EventKind::Exit,
        EventKind::OvertimeStart,
        EventKind::OvertimeEnd,
    ];

    /// Overtime markers may repeat within a day; every other kind is recorded at most once.
    pub fn is_overtime(self) -> bool {
        matches!(self, EventKind::OvertimeStart | EventKind::OvertimeEnd)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

/// Position of an employee within a single work day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DailyState {
    NoEntry,
    OnShift,
    OnBreak,
    PostBreak,
    OnOvertime,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = json!(-23.5505))]
    pub latitude: f64,
    #[schema(example = json!(-46.6333))]
    pub longitude: f64,
}

/// Client-supplied part of an event. It has no time field; `occurred_at` is
/// always stamped by the server.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    pub location: Option<GeoPoint>,
    pub network: Option<String>,
    pub note: Option<String>,
}

impl NewEvent {
    pub fn of(kind: EventKind) -> Self {
        Self {
            kind,
            location: None,
            network: None,
            note: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "6f1c2a8e-2f57-4d43-9a57-3c1f0f4f5e21",
    "employee_id": 1000,
    "kind": "entry",
    "occurred_at": "2026-03-02T08:03:11Z",
    "work_date": "2026-03-02",
    "location": { "latitude": -23.5505, "longitude": -46.6333 },
    "network": "home-wifi",
    "note": null,
    "status": "pending"
}))]
pub struct AttendanceEvent {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub employee_id: u64,
    pub kind: EventKind,
    #[schema(value_type = String, format = "date-time")]
    pub occurred_at: DateTime<Utc>,
    /// Calendar day the event belongs to, in the service's configured offset.
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    pub location: Option<GeoPoint>,
    pub network: Option<String>,
    pub note: Option<String>,
    pub status: EventStatus,
}

/// Per-day aggregate derived from the ledger. Never stored; replaying the same
/// events always yields the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyAttendanceSummary {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub state: DailyState,
    /// `None` while the day is still in progress (no exit recorded).
    #[schema(nullable = true)]
    pub worked_minutes: Option<i64>,
    pub break_minutes: i64,
    pub late_minutes: i64,
    pub overtime_minutes: i64,
    pub has_entry: bool,
    pub has_exit: bool,
    pub complete: bool,
    pub schedule_configured: bool,
}
