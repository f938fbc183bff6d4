use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::info;

use crate::model::notification::Notification;

/// External delivery channel a notification can be forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Push,
    Sms,
}

#[derive(Debug, Error)]
#[error("{channel} delivery failed: {reason}")]
pub struct DeliveryError {
    pub channel: Channel,
    pub reason: String,
}

/// Push/SMS gateway owned by another team. Calls are fire-and-forget from the
/// dispatcher's point of view; retries are the gateway's business.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    async fn send_push(&self, notification: &Notification) -> Result<(), DeliveryError>;

    async fn send_sms(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Gateway used when no real one is wired in: records the hand-off in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogGateway;

#[async_trait]
impl ChannelGateway for LogGateway {
    async fn send_push(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            notification_id = %notification.id,
            employee_id = notification.employee_id,
            kind = %notification.kind,
            "Push notification handed off"
        );
        Ok(())
    }

    async fn send_sms(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            notification_id = %notification.id,
            employee_id = notification.employee_id,
            kind = %notification.kind,
            "SMS notification handed off"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn channels_parse_from_config_names() {
        assert_eq!(Channel::from_str("push").unwrap(), Channel::Push);
        assert_eq!(Channel::from_str("sms").unwrap(), Channel::Sms);
        assert!(Channel::from_str("pager").is_err());
        assert_eq!(Channel::Sms.to_string(), "sms");
    }
}
