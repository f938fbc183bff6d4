use crate::api::attendance::SubmitEvent;
use crate::api::notification::SendAlert;
use crate::attendance::{SweepFailure, SweepReport};
use crate::model::attendance::{
    AttendanceEvent, DailyAttendanceSummary, DailyState, EventKind, EventStatus, GeoPoint,
};
use crate::model::notification::{Notification, NotificationKind};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance & Notifications

Time clock for the **Human Resource Management (HRM)** system.

### 🔹 Key Features
- **Clock events**
  - Entry, break, exit and overtime events stamped by the server
  - Out-of-sequence and duplicate events are rejected
- **Daily summaries**
  - Worked, break, late and overtime minutes derived from the day's events
- **Review**
  - HR/Admin approve or reject recorded events
- **Notifications**
  - Lateness, absence and shift reminders, at most once per employee and day
  - Ad hoc alerts from HR

### 🔐 Security
All endpoints require a **JWT Bearer** access token.
Sweeps are restricted to **Admin**, **HR** and **System** accounts.

### 📦 Errors
Domain errors are returned as `{"error": "<code>", "message": "<text>"}`.
"#,
    ),
    paths(
        crate::api::attendance::submit_event,
        crate::api::attendance::list_events,
        crate::api::attendance::get_summary,
        crate::api::attendance::approve_event,
        crate::api::attendance::reject_event,
        crate::api::attendance::run_absence_sweep,
        crate::api::attendance::run_reminder_sweep,

        crate::api::notification::list_notifications,
        crate::api::notification::mark_read,
        crate::api::notification::send_alert
    ),
    components(
        schemas(
            SubmitEvent,
            GeoPoint,
            EventKind,
            EventStatus,
            DailyState,
            AttendanceEvent,
            DailyAttendanceSummary,
            SweepReport,
            SweepFailure,
            SendAlert,
            Notification,
            NotificationKind
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clock events, summaries and sweeps"),
        (name = "Notification", description = "Employee notifications"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/attendance/events"));
        assert!(doc.paths.paths.contains_key("/api/attendance/sweeps/absence"));
        assert!(doc.paths.paths.contains_key("/api/notifications/{notification_id}/read"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
