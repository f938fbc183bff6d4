#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use hrm_attendance::attendance::{AttendancePolicy, AttendanceService};
use hrm_attendance::clock::ManualClock;
use hrm_attendance::model::notification::Notification;
use hrm_attendance::model::schedule::{Regime, WorkSchedule};
use hrm_attendance::notify::{Channel, ChannelGateway, DeliveryError, DispatchConfig, Dispatcher};
use hrm_attendance::store::{EventLedger, MemoryStore, NotificationStore, ScheduleStore};
use hrm_attendance::utils::retry::RetryPolicy;

/// 2026-03-02 is a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

/// Mon-Fri 08:00-17:00 with a 60 minute lunch allowance.
pub fn office_schedule(employee_id: u64) -> WorkSchedule {
    WorkSchedule {
        employee_id,
        shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        shift_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        break_start: NaiveTime::from_hms_opt(12, 0, 0),
        break_end: NaiveTime::from_hms_opt(13, 0, 0),
        break_duration_minutes: 60,
        work_days: [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .collect(),
        regime: Regime::FullTime,
        flexible: false,
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    pub pushed: Mutex<Vec<Notification>>,
}

#[async_trait]
impl ChannelGateway for RecordingGateway {
    async fn send_push(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.pushed.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn send_sms(&self, _: &Notification) -> Result<(), DeliveryError> {
        Err(DeliveryError {
            channel: Channel::Sms,
            reason: "not wired in tests".into(),
        })
    }
}

pub fn policy() -> AttendancePolicy {
    AttendancePolicy {
        absence_grace: Duration::minutes(120),
        reminder_lead: Duration::minutes(15),
        write_retry: RetryPolicy::none(),
        ..AttendancePolicy::default()
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<RecordingGateway>,
    pub service: AttendanceService,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_ledger(store.clone(), store)
    }

    /// Fixture whose events go through `ledger` instead of the memory store.
    pub fn with_ledger(ledger: Arc<dyn EventLedger>, store: Arc<MemoryStore>) -> Self {
        Self::build(ledger, store, policy())
    }

    pub fn build(ledger: Arc<dyn EventLedger>, store: Arc<MemoryStore>, policy: AttendancePolicy) -> Self {
        let clock = Arc::new(ManualClock::new(at(7, 0)));
        let gateway = Arc::new(RecordingGateway::default());

        let schedules: Arc<dyn ScheduleStore> = store.clone();
        let notifications: Arc<dyn NotificationStore> = store.clone();
        let dispatcher = Dispatcher::new(
            notifications,
            gateway.clone(),
            DispatchConfig::default().with_channel(Channel::Push),
            clock.clone(),
            RetryPolicy::none(),
        );
        let service = AttendanceService::new(ledger, schedules, dispatcher, clock.clone(), policy);

        Self {
            store,
            clock,
            gateway,
            service,
        }
    }

    pub fn with_schedules(ids: &[u64]) -> Self {
        let fixture = Self::new();
        for id in ids {
            fixture.store.put_schedule(office_schedule(*id)).unwrap();
        }
        fixture
    }

    pub fn set_time(&self, h: u32, m: u32) {
        self.clock.set(at(h, m));
    }
}
