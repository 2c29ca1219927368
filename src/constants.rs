//! Configuration constants for the quiz system
//!
//! This module contains the limits, defaults and well-known keys used
//! throughout the crate to keep quiz content within sensible bounds and
//! to give the session state machine consistent timings.

/// Quiz content limits
pub mod quiz {
    /// Maximum number of rounds in a quiz
    pub const MAX_ROUNDS_COUNT: usize = 50;
    /// Maximum number of questions in a single round
    pub const MAX_QUESTIONS_PER_ROUND: usize = 100;
    /// Maximum length of a round name in characters
    pub const MAX_ROUND_NAME_LENGTH: usize = 100;
    /// Maximum length of a round theme in characters
    pub const MAX_THEME_LENGTH: usize = 200;
    /// Key under which the whole quiz is persisted (one quiz per install)
    pub const CONTENT_KEY: &str = "quiz-content";
}

/// Question limits and defaults
pub mod question {
    /// Maximum length of a question prompt
    pub const MAX_PROMPT_LENGTH: usize = 500;
    /// Maximum length of the text of an answer option
    pub const MAX_OPTION_TEXT_LENGTH: usize = 200;
    /// Maximum length of an explanation shown after reveal
    pub const MAX_EXPLANATION_LENGTH: usize = 1000;
    /// Minimum number of answer options
    pub const MIN_OPTION_COUNT: usize = 2;
    /// Maximum number of answer options (labels A to D)
    pub const MAX_OPTION_COUNT: usize = 4;
    /// Time limit applied when a question does not configure one
    pub const DEFAULT_TIME_LIMIT: u64 = 60;
    /// Minimum configurable time limit in seconds
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum configurable time limit in seconds
    pub const MAX_TIME_LIMIT: u64 = 600;
    /// Maximum number of media attachments per question
    pub const MAX_MEDIA_ATTACHMENTS: usize = 2;
}

/// Media store constants
pub mod media {
    /// Prefix of generated media ids
    pub const ID_PREFIX: &str = "media_";
    /// Number of random base36 characters at the end of a generated id
    pub const ID_SUFFIX_LENGTH: usize = 7;
    /// Maximum length of a media id or inline reference stored in a question
    pub const MAX_ID_LENGTH: usize = 4096;
}

/// Session timing defaults
pub mod session {
    /// Milliseconds before a correct answer advances on its own
    pub const CORRECT_AUTO_ADVANCE_MILLIS: u64 = 2500;
    /// Milliseconds before a timeout advances on its own, when enabled
    pub const TIMEOUT_AUTO_ADVANCE_MILLIS: u64 = 3500;
    /// Maximum configurable auto-advance or reveal delay in milliseconds
    pub const MAX_DELAY_MILLIS: u64 = 30_000;
    /// Remaining seconds at which the timer warning cue is emitted
    pub const TIMER_WARNING_AT: u64 = 10;
    /// Interval between two timer ticks in milliseconds
    pub const TICK_INTERVAL_MILLIS: u64 = 1000;
}
