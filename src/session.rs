//! Presentation feedback channel
//!
//! This module defines the trait the session uses to tell the presentation
//! layer about moments that deserve a sound or an animation. Cues are
//! fire-and-forget: the session never waits for them and never learns
//! whether they were played.

use enum_map::Enum;
use serde::{Deserialize, Serialize};

/// A moment the presentation may want to underline with a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// An answer option was picked
    Select,
    /// The picked answer is correct
    Correct,
    /// The picked answer is wrong or time ran out
    Incorrect,
    /// A round (or the whole quiz) was completed
    RoundComplete,
    /// A new question slide is shown
    Transition,
    /// The countdown reached its warning threshold
    TimerWarning,
}

/// Trait for sending cues to the presentation layer
///
/// Implementations might play audio, trigger confetti or simply record
/// the cues for inspection.
pub trait FeedbackSink {
    /// Delivers a cue
    ///
    /// # Arguments
    ///
    /// * `cue` - The moment being signalled
    fn cue(&self, cue: Cue);
}

/// A sink that drops every cue
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl FeedbackSink for Silent {
    fn cue(&self, _cue: Cue) {}
}

impl<F: Fn(Cue)> FeedbackSink for F {
    fn cue(&self, cue: Cue) {
        self(cue);
    }
}
