//! Attendance domain: the daily state machine, summaries, detectors and the
//! service that drives them.
pub mod calculator;
pub mod detector;
pub mod machine;
pub mod service;

pub use service::{AttendancePolicy, AttendanceService, ReviewDecision, SweepFailure, SweepReport};
