//! Session options
//!
//! Timings of the session that a host may want to tune: how long the
//! revealed answer stays on the question slide, which feedback slides
//! advance on their own, when the timer warns and how often it ticks.

use web_time::Duration;

use enum_map::{EnumMap, enum_map};
use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants::session, scoring::Outcome};

/// Errors that can occur while loading options
#[derive(Error, Debug)]
pub enum Error {
    /// The options could not be parsed
    #[error("malformed options: {0}")]
    Parse(#[from] serde_json::Error),
    /// The options parsed but are out of bounds
    #[error("invalid options: {0}")]
    Invalid(#[from] garde::Report),
}

type ValidationResult = garde::Result;

fn validate_delay(field: &'static str, val: &Duration) -> ValidationResult {
    if val.as_millis() <= u128::from(session::MAX_DELAY_MILLIS) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "{field} is longer than {}ms",
            session::MAX_DELAY_MILLIS
        )))
    }
}

fn validate_auto_advance(val: &EnumMap<Outcome, Option<u64>>) -> ValidationResult {
    match val
        .values()
        .flatten()
        .find(|ms| **ms > session::MAX_DELAY_MILLIS)
    {
        Some(ms) => Err(garde::Error::new(format!(
            "auto advance of {ms}ms is longer than {}ms",
            session::MAX_DELAY_MILLIS
        ))),
        None => Ok(()),
    }
}

/// Milliseconds of `delay`, capped at the longest allowed delay
fn clamp_delay(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis())
        .unwrap_or(u64::MAX)
        .min(session::MAX_DELAY_MILLIS)
}

fn validate_tick_interval(val: &Duration) -> ValidationResult {
    if val.is_zero() {
        Err(garde::Error::new("tick_interval must not be zero"))
    } else {
        Ok(())
    }
}

/// Options of a quiz session
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Options {
    /// How long the revealed answer stays on the question slide before the
    /// feedback slide is shown
    #[garde(custom(|v, _| validate_delay("reveal_delay", v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    reveal_delay: Duration,
    /// Milliseconds after which each feedback slide continues on its own,
    /// `None` waits for the host
    #[garde(custom(|v, _| validate_auto_advance(v)))]
    auto_advance: EnumMap<Outcome, Option<u64>>,
    /// Remaining seconds at which the timer warns, 0 disables the warning
    #[garde(range(max = crate::constants::question::MAX_TIME_LIMIT))]
    timer_warning_at: u64,
    /// Whether the countdown starts as soon as a question is shown
    #[garde(skip)]
    auto_start_timer: bool,
    /// Interval between two timer ticks
    #[garde(custom(|v, _| validate_tick_interval(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    tick_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::ZERO,
            auto_advance: enum_map! {
                Outcome::Correct => Some(session::CORRECT_AUTO_ADVANCE_MILLIS),
                Outcome::Wrong => None,
                Outcome::TimedOut => None,
            },
            timer_warning_at: session::TIMER_WARNING_AT,
            auto_start_timer: true,
            tick_interval: Duration::from_millis(session::TICK_INTERVAL_MILLIS),
        }
    }
}

impl Options {
    /// Parses and validates options from JSON
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON and [`Error::Invalid`] when
    /// a value is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Delay between an answer and its feedback slide
    pub fn reveal_delay(&self) -> Duration {
        self.reveal_delay
    }

    /// Delay after which the feedback slide for `outcome` continues on its own
    pub fn auto_advance(&self, outcome: Outcome) -> Option<Duration> {
        self.auto_advance[outcome].map(Duration::from_millis)
    }

    /// Remaining seconds at which the timer warns
    pub fn timer_warning_at(&self) -> u64 {
        self.timer_warning_at
    }

    /// Whether the countdown starts when a question is shown
    pub fn auto_start_timer(&self) -> bool {
        self.auto_start_timer
    }

    /// Interval between two timer ticks
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Sets the reveal delay, capped at the longest allowed delay
    #[must_use]
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = Duration::from_millis(clamp_delay(delay));
        self
    }

    /// Sets or disables the auto-advance of one feedback slide, capped at
    /// the longest allowed delay
    #[must_use]
    pub fn with_auto_advance(mut self, outcome: Outcome, delay: Option<Duration>) -> Self {
        self.auto_advance[outcome] = delay.map(clamp_delay);
        self
    }

    /// Sets the timer warning threshold, capped at the longest time limit
    #[must_use]
    pub fn with_timer_warning_at(mut self, seconds: u64) -> Self {
        self.timer_warning_at = seconds.min(crate::constants::question::MAX_TIME_LIMIT);
        self
    }

    /// Enables or disables starting the countdown on question entry
    #[must_use]
    pub fn with_auto_start_timer(mut self, auto_start_timer: bool) -> Self {
        self.auto_start_timer = auto_start_timer;
        self
    }
}
