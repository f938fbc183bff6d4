use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Late,
    Absence,
    ScheduleReminder,
    GenericAlert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0b6d1c44-7d3a-4c1b-8f0e-2f1d7f8b9a10",
    "employee_id": 1000,
    "kind": "late",
    "message": "Clocked in 15 minutes late on 2026-03-02",
    "reference_date": "2026-03-02",
    "created_at": "2026-03-02T08:15:00Z",
    "read": false
}))]
pub struct Notification {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub employee_id: u64,
    pub kind: NotificationKind,
    pub message: String,
    /// Work date that triggered the notification; detector-driven
    /// notifications are unique per (employee, kind, reference_date).
    #[schema(value_type = Option<String>, format = "date")]
    pub reference_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
}
