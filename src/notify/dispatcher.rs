use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};
use uuid::Uuid;

use super::gateway::{Channel, ChannelGateway};
use crate::clock::Clock;
use crate::error::AttendanceError;
use crate::model::notification::{Notification, NotificationKind};
use crate::store::NotificationStore;
use crate::utils::retry::{RetryPolicy, retry_transient};

/// Fan-out settings, decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Store ad hoc notifications. Detector notifications are always stored,
    /// since the stored record is what keeps them once per day.
    pub persist: bool,
    pub channels: HashSet<Channel>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            persist: true,
            channels: HashSet::new(),
        }
    }
}

impl DispatchConfig {
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel);
        self
    }
}

/// Persists notifications, then forwards them to the configured channels.
/// The stored record is the source of truth; channel failures are logged and
/// never undo it.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    gateway: Arc<dyn ChannelGateway>,
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        gateway: Arc<dyn ChannelGateway>,
        config: DispatchConfig,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            clock,
            retry,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn build(
        &self,
        employee_id: u64,
        kind: NotificationKind,
        message: String,
        reference_date: Option<NaiveDate>,
    ) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            employee_id,
            kind,
            message,
            reference_date,
            created_at: self.clock.now(),
            read: false,
        }
    }

    pub async fn dispatch(
        &self,
        employee_id: u64,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Result<Notification, AttendanceError> {
        let notification = self.build(employee_id, kind, message.into(), None);

        let notification = if self.config.persist {
            retry_transient(self.retry, "notification insert", move || {
                self.store.insert(notification.clone())
            })
            .await?
        } else {
            notification
        };

        info!(
            notification_id = %notification.id,
            employee_id,
            kind = %kind,
            persisted = self.config.persist,
            "Notification dispatched"
        );
        self.deliver(&notification).await;
        Ok(notification)
    }

    /// Dispatches unless a notification of `kind` already exists for this
    /// employee and `reference_date`. Returns `None` (and delivers nothing)
    /// in that case.
    pub async fn dispatch_once(
        &self,
        employee_id: u64,
        kind: NotificationKind,
        message: impl Into<String>,
        reference_date: NaiveDate,
    ) -> Result<Option<Notification>, AttendanceError> {
        let notification = self.build(employee_id, kind, message.into(), Some(reference_date));

        let stored = retry_transient(self.retry, "notification insert", move || {
            self.store.insert_once(notification.clone())
        })
        .await?;

        let Some(notification) = stored else {
            info!(employee_id, kind = %kind, date = %reference_date, "Notification already sent for this day");
            return Ok(None);
        };

        info!(
            notification_id = %notification.id,
            employee_id,
            kind = %kind,
            date = %reference_date,
            "Notification dispatched"
        );
        self.deliver(&notification).await;
        Ok(Some(notification))
    }

    async fn deliver(&self, notification: &Notification) {
        for channel in &self.config.channels {
            let sent = match channel {
                Channel::Push => self.gateway.send_push(notification).await,
                Channel::Sms => self.gateway.send_sms(notification).await,
            };
            if let Err(e) = sent {
                error!(
                    error = %e,
                    notification_id = %notification.id,
                    employee_id = notification.employee_id,
                    "Channel delivery failed"
                );
            }
        }
    }

    pub async fn list(
        &self,
        employee_id: u64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AttendanceError> {
        self.store.list(employee_id, unread_only).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Notification, AttendanceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AttendanceError::not_found(format!("notification {id}")))
    }

    /// Flips `read`. Marking an already-read notification is a no-op success.
    pub async fn mark_read(&self, id: Uuid) -> Result<Notification, AttendanceError> {
        retry_transient(self.retry, "notification mark read", move || self.store.mark_read(id)).await
    }
}
