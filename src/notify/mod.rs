//! Notification records and their delivery.

pub mod dispatcher;
pub mod gateway;

pub use dispatcher::{DispatchConfig, Dispatcher};
pub use gateway::{Channel, ChannelGateway, DeliveryError, LogGateway};
