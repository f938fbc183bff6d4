use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::ScheduleStore;
use crate::error::AttendanceError;
use crate::model::schedule::WorkSchedule;

/// Schedules change rarely; keep them for a short TTL in front of the real
/// store. Only configured schedules are cached so a newly added one shows up
/// on the next lookup.
pub struct CachedScheduleStore {
    inner: Arc<dyn ScheduleStore>,
    cache: Cache<u64, WorkSchedule>,
}

impl CachedScheduleStore {
    pub fn new(inner: Arc<dyn ScheduleStore>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(10_000) // one entry per employee
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn invalidate(&self, employee_id: u64) {
        self.cache.invalidate(&employee_id).await;
    }
}

#[async_trait]
impl ScheduleStore for CachedScheduleStore {
    async fn get_schedule(&self, employee_id: u64) -> Result<Option<WorkSchedule>, AttendanceError> {
        if let Some(schedule) = self.cache.get(&employee_id).await {
            return Ok(Some(schedule));
        }

        let schedule = self.inner.get_schedule(employee_id).await?;
        if let Some(schedule) = &schedule {
            self.cache.insert(employee_id, schedule.clone()).await;
        }
        Ok(schedule)
    }

    async fn active_employees(&self) -> Result<Vec<u64>, AttendanceError> {
        self.inner.active_employees().await
    }
}
