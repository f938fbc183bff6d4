use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Regime {
    FullTime,
    PartTime,
    TwelveByThirtySix,
}

/// An employee's configured shift. Owned by the administrative flows; the
/// attendance core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSchedule {
    pub employee_id: u64,
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    #[serde(default)]
    pub break_start: Option<NaiveTime>,
    #[serde(default)]
    pub break_end: Option<NaiveTime>,
    #[serde(default)]
    pub break_duration_minutes: u32,
    pub work_days: HashSet<Weekday>,
    pub regime: Regime,
    #[serde(default)]
    pub flexible: bool,
}

impl WorkSchedule {
    pub fn works_on(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&date.weekday())
    }
}
