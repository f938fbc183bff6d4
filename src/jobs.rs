use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use actix_web::rt::{self, task::JoinHandle, time};
use actix_web::web::Data;
use chrono::Days;
use tracing::{debug, error, info};

use crate::attendance::AttendanceService;

/// Runs [`run_sweep_tick`] every `every` until `cancel` is set. An in-flight
/// sweep stops between employees.
pub fn spawn_sweeps(
    service: Data<AttendanceService>,
    every: Duration,
    cancel: Arc<AtomicBool>,
) -> JoinHandle<()> {
    rt::spawn(async move {
        info!(interval_secs = every.as_secs(), "Sweep job started");
        let mut ticker = time::interval(every);

        loop {
            ticker.tick().await;
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            run_sweep_tick(&service, &cancel).await;
        }

        info!("Sweep job stopped");
    })
}

/// One pass of the background sweeps around the current work date.
///
/// Reminders cover today and tomorrow, since a shift starting just after
/// midnight opens its window the evening before. Absences cover yesterday and
/// today, since a late shift's cutoff can fall after midnight. Grace and lead
/// are at most one day, so one date either side is enough; re-sweeping a date
/// writes nothing new.
pub async fn run_sweep_tick(service: &AttendanceService, cancel: &AtomicBool) {
    let today = service.today();
    debug!(date = %today, "Running scheduled sweeps");

    let tomorrow = today.checked_add_days(Days::new(1));
    let yesterday = today.checked_sub_days(Days::new(1));

    for date in [Some(today), tomorrow].into_iter().flatten() {
        if let Err(e) = service.run_reminder_sweep_until(date, cancel).await {
            error!(error = %e, date = %date, "Reminder sweep failed");
        }
    }
    for date in [yesterday, Some(today)].into_iter().flatten() {
        if let Err(e) = service.run_absence_sweep_until(date, cancel).await {
            error!(error = %e, date = %date, "Absence sweep failed");
        }
    }
}
