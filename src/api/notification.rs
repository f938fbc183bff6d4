use crate::attendance::AttendanceService;
use crate::auth::auth::AuthUser;
use crate::model::notification::{Notification, NotificationKind};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, IntoParams)]
pub struct NotificationFilter {
    /// Only unread notifications
    #[param(example = true)]
    pub unread_only: Option<bool>,
    /// Recipient (HR/Admin only); defaults to the caller
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct SendAlert {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "Please update your emergency contact")]
    pub message: String,
}

/// List notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationFilter),
    responses(
        (status = 200, description = "Notifications, newest first", body = [Notification]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn list_notifications(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<NotificationFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.resolve_target(query.employee_id)?;
    let notifications = service
        .dispatcher()
        .list(employee_id, query.unread_only.unwrap_or(false))
        .await?;

    Ok(HttpResponse::Ok().json(notifications))
}

/// Mark a notification as read
#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(
        ("notification_id" = String, Path, description = "ID of the notification")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Notification not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn mark_read(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let dispatcher = service.dispatcher();

    let notification = dispatcher.get(id).await?;
    if !auth.role.is_supervisor() && auth.employee_id != Some(notification.employee_id) {
        return Err(actix_web::error::ErrorForbidden("Not the recipient"));
    }

    let notification = dispatcher.mark_read(id).await?;
    Ok(HttpResponse::Ok().json(notification))
}

/// Send an ad hoc alert to an employee
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = SendAlert,
    responses(
        (status = 201, description = "Alert dispatched", body = Notification),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn send_alert(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    body: web::Json<SendAlert>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let SendAlert {
        employee_id,
        message,
    } = body.into_inner();
    if message.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "invalid_request",
            "message": "Message must not be empty"
        })));
    }

    let notification = service
        .dispatcher()
        .dispatch(employee_id, NotificationKind::GenericAlert, message)
        .await?;

    info!(sender = auth.user_id, employee_id, notification_id = %notification.id, "Alert sent");
    Ok(HttpResponse::Created().json(notification))
}
