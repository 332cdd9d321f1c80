//! Frequency-multiplier interval policy.
//!
//! Each habit is reminded once per `base_interval(frequency) * multiplier`.
//! Every third consecutive success promotes the multiplier by one step; a
//! single failure collapses it back to 1. "Later" reschedules sooner without
//! touching progress, but never below one base period.
//!
//! ```text
//! Success:  streak += 1; streak >= 3 => multiplier += 1, streak = 0
//! Failure:  streak = 0, multiplier = 1
//! Later:    interval = max(base * multiplier / 3, base)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Seconds in one day.
pub const DAY_SECS: u64 = 86_400;
/// Seconds in one week.
pub const WEEK_SECS: u64 = 7 * DAY_SECS;
/// Thirty-day month approximation.
pub const MONTH_SECS: u64 = 30 * DAY_SECS;

/// Longest interval the policy will produce: about a century. Keeps every
/// computed reminder time representable.
pub const MAX_INTERVAL_SECS: u64 = 36_500 * DAY_SECS;

/// Consecutive successes needed to promote the multiplier.
pub const PROMOTION_THRESHOLD: u32 = 3;

/// How often a habit is expected to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Base reminder period in seconds.
    pub fn base_interval_secs(self) -> u64 {
        match self {
            Frequency::Daily => DAY_SECS,
            Frequency::Weekly => WEEK_SECS,
            Frequency::Monthly => MONTH_SECS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(ValidationError::UnknownFrequency(s.to_string())),
        }
    }
}

/// A user's answer to "did you do your habit?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Success,
    Failure,
    Later,
}

impl FromStr for Response {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "yes" | "y" => Ok(Response::Success),
            "failure" | "no" | "n" => Ok(Response::Failure),
            "later" | "l" => Ok(Response::Later),
            other => Err(ValidationError::InvalidValue {
                field: "response".into(),
                message: format!("'{other}' is not one of success, failure, later"),
            }),
        }
    }
}

/// Scheduling parameters carried by a habit between responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingState {
    pub interval_multiplier: u32,
    pub consecutive_successes: u32,
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self {
            interval_multiplier: 1,
            consecutive_successes: 0,
        }
    }
}

/// Result of applying one response to a scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: SchedulingState,
    /// Interval until the next reminder, in seconds.
    pub interval_secs: u64,
    /// Frequency interval that governed the reminder just answered.
    pub previous_interval_secs: u64,
}

/// `base_interval(frequency) * multiplier`, capped at [`MAX_INTERVAL_SECS`].
pub fn frequency_interval_secs(frequency: Frequency, multiplier: u32) -> u64 {
    frequency
        .base_interval_secs()
        .saturating_mul(u64::from(multiplier.max(1)))
        .min(MAX_INTERVAL_SECS)
}

/// Compute the next scheduling state for `response`.
pub fn transition(frequency: Frequency, state: SchedulingState, response: Response) -> Transition {
    let previous_interval_secs = frequency_interval_secs(frequency, state.interval_multiplier);
    let base = frequency.base_interval_secs();

    let (next, interval_secs) = match response {
        Response::Success => {
            let mut next = state;
            next.consecutive_successes = next.consecutive_successes.saturating_add(1);
            if next.consecutive_successes >= PROMOTION_THRESHOLD {
                next.interval_multiplier = next.interval_multiplier.max(1).saturating_add(1);
                next.consecutive_successes = 0;
            }
            (next, frequency_interval_secs(frequency, next.interval_multiplier))
        }
        Response::Failure => {
            let next = SchedulingState::default();
            (next, frequency_interval_secs(frequency, next.interval_multiplier))
        }
        Response::Later => (state, (previous_interval_secs / 3).max(base)),
    };

    Transition {
        state: next,
        interval_secs,
        previous_interval_secs,
    }
}
