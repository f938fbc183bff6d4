use crate::attendance::{AttendanceService, ReviewDecision, SweepReport};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{
    AttendanceEvent, DailyAttendanceSummary, EventKind, GeoPoint, NewEvent,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Clock event as sent by the mobile or web client. Any client timestamp is
/// ignored; the server stamps the event on arrival.
#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "kind": "entry",
    "location": { "latitude": -23.5505, "longitude": -46.6333 },
    "network": "office-wifi"
}))]
pub struct SubmitEvent {
    pub kind: EventKind,
    pub location: Option<GeoPoint>,
    #[schema(example = "office-wifi")]
    pub network: Option<String>,
    pub note: Option<String>,
}

impl From<SubmitEvent> for NewEvent {
    fn from(body: SubmitEvent) -> Self {
        NewEvent {
            kind: body.kind,
            location: body.location,
            network: body.network,
            note: body.note,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct EventRange {
    /// First work date, inclusive
    #[param(value_type = String, format = "date", example = "2026-03-01")]
    pub from: NaiveDate,
    /// Last work date, inclusive
    #[param(value_type = String, format = "date", example = "2026-03-31")]
    pub to: NaiveDate,
    /// Employee to list (HR/Admin only); defaults to the caller
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Work date; defaults to today
    #[param(value_type = Option<String>, format = "date", example = "2026-03-02")]
    pub date: Option<NaiveDate>,
    /// Employee to summarize (HR/Admin only); defaults to the caller
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct SweepQuery {
    /// Work date to sweep; defaults to today
    #[param(value_type = Option<String>, format = "date", example = "2026-03-02")]
    pub date: Option<NaiveDate>,
}

/// Record a clock event
#[utoipa::path(
    post,
    path = "/api/attendance/events",
    request_body = SubmitEvent,
    responses(
        (status = 201, description = "Event accepted", body = AttendanceEvent),
        (status = 400, description = "Out of sequence or duplicate event", body = Object, example = json!({
            "error": "duplicate_event",
            "message": "entry already recorded on 2026-03-02"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 503, description = "Store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn submit_event(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    body: web::Json<SubmitEvent>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee()?;
    let event = service
        .submit_event(employee_id, body.into_inner().into())
        .await?;

    Ok(HttpResponse::Created().json(event))
}

/// List clock events in a date range
#[utoipa::path(
    get,
    path = "/api/attendance/events",
    params(EventRange),
    responses(
        (status = 200, description = "Events in chronological order", body = [AttendanceEvent]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_events(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<EventRange>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.resolve_target(query.employee_id)?;
    let events = service.list_events(employee_id, query.from, query.to).await?;

    Ok(HttpResponse::Ok().json(events))
}

/// Daily attendance summary
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary derived from the day's events", body = DailyAttendanceSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_summary(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.resolve_target(query.employee_id)?;
    let date = query.date.unwrap_or_else(|| service.today());
    let summary = service.get_daily_summary(employee_id, date).await?;

    Ok(HttpResponse::Ok().json(summary))
}

async fn review(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    event_id: Uuid,
    decision: ReviewDecision,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let event = service.review_event(event_id, decision).await?;

    Ok(HttpResponse::Ok().json(event))
}

/// Approve a pending event
#[utoipa::path(
    put,
    path = "/api/attendance/events/{event_id}/approve",
    params(
        ("event_id" = String, Path, description = "ID of the event to approve")
    ),
    responses(
        (status = 200, description = "Event approved", body = AttendanceEvent),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Event not found or already reviewed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn approve_event(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    review(auth, service, path.into_inner(), ReviewDecision::Approve).await
}

/// Reject a pending event
#[utoipa::path(
    put,
    path = "/api/attendance/events/{event_id}/reject",
    params(
        ("event_id" = String, Path, description = "ID of the event to reject")
    ),
    responses(
        (status = 200, description = "Event rejected", body = AttendanceEvent),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Event not found or already reviewed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn reject_event(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    review(auth, service, path.into_inner(), ReviewDecision::Reject).await
}

/// Run the absence sweep now
#[utoipa::path(
    post,
    path = "/api/attendance/sweeps/absence",
    params(SweepQuery),
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin/System only"),
        (status = 503, description = "Roster unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn run_absence_sweep(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<SweepQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_sweeper()?;
    let date = query.date.unwrap_or_else(|| service.today());
    let report = service.run_absence_sweep(date).await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Run the schedule reminder sweep now
#[utoipa::path(
    post,
    path = "/api/attendance/sweeps/reminder",
    params(SweepQuery),
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin/System only"),
        (status = 503, description = "Roster unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn run_reminder_sweep(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<SweepQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_sweeper()?;
    let date = query.date.unwrap_or_else(|| service.today());
    let report = service.run_reminder_sweep(date).await?;

    Ok(HttpResponse::Ok().json(report))
}
