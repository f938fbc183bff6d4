use std::collections::HashSet;
use std::env;
use std::fmt::Debug;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow, ensure};
use chrono::FixedOffset;

use crate::notify::Channel;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    /// Unset runs on the in-memory store.
    pub database_url: Option<String>,
    /// JSON array of schedules loaded into the in-memory store at startup.
    pub schedules_file: Option<PathBuf>,

    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_submit_per_min: u32,

    // Attendance rules
    pub utc_offset: FixedOffset,
    pub absence_grace_minutes: i64,
    pub reminder_lead_minutes: i64,
    /// 0 disables the background sweeps.
    pub sweep_interval: Duration,
    pub schedule_cache_ttl: Duration,

    // Store writes
    pub store_write_retries: u32,
    pub store_retry_backoff: Duration,

    // Notifications
    pub notify_persist: bool,
    pub notify_channels: HashSet<Channel>,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let utc_offset_minutes: i32 = parse_or(&lookup, "UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow!("UTC_OFFSET_MINUTES out of range: {utc_offset_minutes}"))?;

        let absence_grace_minutes = minutes_within_day(&lookup, "ABSENCE_GRACE_MINUTES", 120)?;
        let reminder_lead_minutes = minutes_within_day(&lookup, "REMINDER_LEAD_MINUTES", 15)?;

        let rate_protected_per_min = parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?;
        let rate_submit_per_min = parse_or(&lookup, "RATE_SUBMIT_PER_MIN", 60)?;
        ensure!(rate_protected_per_min > 0, "RATE_PROTECTED_PER_MIN must be at least 1");
        ensure!(rate_submit_per_min > 0, "RATE_SUBMIT_PER_MIN must be at least 1");

        let notify_channels = match optional("NOTIFY_CHANNELS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    Channel::from_str(name).with_context(|| format!("unknown notification channel `{name}`"))
                })
                .collect::<anyhow::Result<HashSet<_>>>()?,
            None => HashSet::new(),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            database_url: optional("DATABASE_URL"),
            schedules_file: optional("SCHEDULES_FILE").map(PathBuf::from),

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            rate_protected_per_min,
            rate_submit_per_min,

            utc_offset,
            absence_grace_minutes,
            reminder_lead_minutes,
            sweep_interval: Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", 300)?),
            schedule_cache_ttl: Duration::from_secs(parse_or(&lookup, "SCHEDULE_CACHE_TTL_SECS", 60)?),

            store_write_retries: parse_or(&lookup, "STORE_WRITE_RETRIES", 3)?,
            store_retry_backoff: Duration::from_millis(parse_or(&lookup, "STORE_RETRY_BACKOFF_MS", 50)?),

            notify_persist: parse_or(&lookup, "NOTIFY_PERSIST", true)?,
            notify_channels,

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Debug,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} `{raw}`: {e:?}")),
        None => Ok(default),
    }
}

/// Grace and lead windows are capped at one day, so an absence cutoff always
/// lands on the shift's date or the one after.
fn minutes_within_day<F>(lookup: &F, key: &str, default: i64) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let minutes: i64 = parse_or(lookup, key, default)?;
    ensure!(
        (0..=MINUTES_PER_DAY).contains(&minutes),
        "{key} must be between 0 and {MINUTES_PER_DAY}, got {minutes}"
    );
    Ok(minutes)
}

const MINUTES_PER_DAY: i64 = 24 * 60;
