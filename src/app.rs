use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tracing::{info, warn};

use crate::attendance::{AttendancePolicy, AttendanceService};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::init_db;
use crate::notify::{DispatchConfig, Dispatcher, LogGateway};
use crate::store::{
    CachedScheduleStore, EventLedger, MemoryStore, MySqlStore, NotificationStore, ScheduleStore,
};
use crate::utils::retry::RetryPolicy;

/// Attendance rules and retry settings taken from the config.
pub fn policy(config: &Config) -> AttendancePolicy {
    AttendancePolicy {
        utc_offset: config.utc_offset,
        absence_grace: Duration::minutes(config.absence_grace_minutes),
        reminder_lead: Duration::minutes(config.reminder_lead_minutes),
        write_retry: RetryPolicy {
            retries: config.store_write_retries,
            backoff: config.store_retry_backoff,
        },
    }
}

type Stores = (
    Arc<dyn EventLedger>,
    Arc<dyn ScheduleStore>,
    Arc<dyn NotificationStore>,
);

fn split<S>(store: Arc<S>) -> Stores
where
    S: EventLedger + ScheduleStore + NotificationStore + 'static,
{
    (store.clone(), store.clone(), store)
}

/// Wires the stores, dispatcher and clock for the configured backend.
pub async fn build_service(config: &Config) -> anyhow::Result<AttendanceService> {
    let (ledger, schedules, notifications) = match &config.database_url {
        Some(url) => {
            let store = Arc::new(MySqlStore::new(init_db(url).await?));
            info!("Using MySQL store");
            split(store)
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            if let Some(path) = &config.schedules_file {
                let loaded = store
                    .load_schedules(path)
                    .with_context(|| format!("Failed to load schedules from {}", path.display()))?;
                info!(loaded, path = %path.display(), "Schedules loaded");
            }
            warn!("DATABASE_URL not set, using in-memory store");
            split(store)
        }
    };

    let schedules: Arc<dyn ScheduleStore> =
        Arc::new(CachedScheduleStore::new(schedules, config.schedule_cache_ttl));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy = policy(config);
    let dispatch = DispatchConfig {
        persist: config.notify_persist,
        channels: config.notify_channels.clone(),
    };
    let dispatcher = Dispatcher::new(
        notifications,
        Arc::new(LogGateway),
        dispatch,
        clock.clone(),
        policy.write_retry,
    );

    Ok(AttendanceService::new(ledger, schedules, dispatcher, clock, policy))
}
