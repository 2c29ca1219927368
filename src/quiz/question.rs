//! Multiple choice questions
//!
//! A question offers up to four labelled options, exactly one of which is
//! correct. Scoring parameters (points, negative points) and the time
//! limit live on the question itself; optional values are substituted with
//! their defaults in one accessor each, so the rest of the crate never has
//! to know the defaults.

use web_time::Duration;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{constants, id::Id};

use super::media::{MediaAttachment, MediaId, MediaKind};

/// Label of an answer option
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
pub enum OptionLabel {
    /// First option
    A,
    /// Second option
    B,
    /// Third option
    C,
    /// Fourth option
    D,
}

impl OptionLabel {
    /// All labels in display order
    pub const ALL: [OptionLabel; 4] = [Self::A, Self::B, Self::C, Self::D];
}

/// One answer option of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AnswerOption {
    /// Label shown next to the option
    #[garde(skip)]
    pub label: OptionLabel,
    /// Text of the option
    #[garde(length(max = constants::question::MAX_OPTION_TEXT_LENGTH))]
    pub text: String,
}

impl AnswerOption {
    /// Creates an option
    pub fn new(label: OptionLabel, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// How a question is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Text only
    #[default]
    Normal,
    /// Built around its media attachments
    Media,
}

/// Errors raised while attaching media to a question
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// The question already carries the maximum number of attachments
    #[error("a question holds at most {} media attachments", constants::question::MAX_MEDIA_ATTACHMENTS)]
    TooManyAttachments,
}

type ValidationResult = garde::Result;

/// Validates that an optional duration falls within specified bounds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    field: &'static str,
    val: &Option<Duration>,
) -> ValidationResult {
    match val {
        Some(val) if !(MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) => {
            Err(garde::Error::new(format!(
                "{field} is outside of the bounds [{MIN_SECONDS},{MAX_SECONDS}]",
            )))
        }
        _ => Ok(()),
    }
}

fn validate_time_limit(val: &Option<Duration>) -> ValidationResult {
    validate_duration::<
        { constants::question::MIN_TIME_LIMIT },
        { constants::question::MAX_TIME_LIMIT },
    >("time_limit", val)
}

fn validate_unique_labels(options: &[AnswerOption]) -> ValidationResult {
    if options.iter().map(|o| o.label).all_unique() {
        Ok(())
    } else {
        Err(garde::Error::new("option labels must be unique"))
    }
}

fn is_offered(options: &[AnswerOption]) -> impl FnOnce(&OptionLabel, &()) -> ValidationResult + '_ {
    move |label, _| {
        if options.iter().any(|o| o.label == *label) {
            Ok(())
        } else {
            Err(garde::Error::new(format!(
                "correct answer {label} is not one of the options"
            )))
        }
    }
}

fn validate_blur(media: &[MediaAttachment]) -> ValidationResult {
    if media.iter().skip(1).any(|m| m.blurred) {
        Err(garde::Error::new("only the first attachment may be blurred"))
    } else {
        Ok(())
    }
}

/// A multiple choice question
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// Stable identifier
    #[garde(skip)]
    id: Id,
    /// The question text shown on the slide
    #[garde(length(max = constants::question::MAX_PROMPT_LENGTH))]
    prompt: String,
    /// Answer options in display order
    #[garde(
        length(min = constants::question::MIN_OPTION_COUNT, max = constants::question::MAX_OPTION_COUNT),
        custom(|v, _| validate_unique_labels(v)),
        dive
    )]
    options: Vec<AnswerOption>,
    /// Label of the correct option
    #[garde(custom(is_offered(&self.options)))]
    correct_answer: OptionLabel,
    /// Points awarded for a correct answer
    #[garde(range(min = 1))]
    points: u64,
    /// Points deducted for a wrong answer or a timeout
    #[garde(skip)]
    negative_points: Option<u64>,
    /// Presentation kind
    #[serde(default)]
    #[garde(skip)]
    kind: QuestionKind,
    /// Attached media, at most two
    #[serde(default)]
    #[garde(
        length(max = constants::question::MAX_MEDIA_ATTACHMENTS),
        custom(|v, _| validate_blur(v)),
        dive
    )]
    media: Vec<MediaAttachment>,
    /// Shown once the answer is revealed
    #[garde(length(max = constants::question::MAX_EXPLANATION_LENGTH))]
    explanation: Option<String>,
    /// Time allowed to answer
    #[garde(custom(|v, _| validate_time_limit(v)))]
    #[serde_as(as = "Option<serde_with::DurationSeconds<u64>>")]
    time_limit: Option<Duration>,
}

impl Question {
    /// Creates a normal question without negative marking, media,
    /// explanation or custom time limit
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        correct_answer: OptionLabel,
        points: u64,
    ) -> Self {
        Self {
            id: Id::new(),
            prompt: prompt.into(),
            options,
            correct_answer,
            points,
            negative_points: None,
            kind: QuestionKind::Normal,
            media: Vec::new(),
            explanation: None,
            time_limit: None,
        }
    }

    /// Sets the deduction for wrong answers and timeouts
    #[must_use]
    pub fn with_negative_points(mut self, negative_points: u64) -> Self {
        self.negative_points = Some(negative_points);
        self
    }

    /// Sets the time limit
    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    /// Sets the explanation shown after reveal
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Sets the presentation kind
    #[must_use]
    pub fn with_kind(mut self, kind: QuestionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attaches a stored media asset
    ///
    /// The first attachment is blurred until the answer is revealed.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::TooManyAttachments`] when the question already
    /// holds the maximum number of attachments.
    pub fn attach_media(&mut self, id: MediaId, kind: MediaKind) -> Result<(), AttachError> {
        if self.media.len() >= constants::question::MAX_MEDIA_ATTACHMENTS {
            return Err(AttachError::TooManyAttachments);
        }
        let blurred = self.media.is_empty();
        self.media.push(MediaAttachment { id, kind, blurred });
        Ok(())
    }

    /// Detaches the attachment at `index`, returning it
    ///
    /// If the blurred first attachment is removed, the remaining one is not
    /// blurred.
    pub fn detach_media(&mut self, index: usize) -> Option<MediaAttachment> {
        (index < self.media.len()).then(|| self.media.remove(index))
    }

    /// Stable identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// The question text
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Answer options in display order
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Label of the correct option
    pub fn correct_answer(&self) -> OptionLabel {
        self.correct_answer
    }

    /// Points awarded for a correct answer
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Points deducted for a wrong answer or a timeout, 0 when unset
    pub fn negative_points(&self) -> u64 {
        self.negative_points.unwrap_or(0)
    }

    /// Presentation kind
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    /// Attached media
    pub fn media(&self) -> &[MediaAttachment] {
        &self.media
    }

    /// Explanation shown after reveal
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Time allowed to answer, the default when unset
    pub fn time_limit(&self) -> Duration {
        self.time_limit
            .unwrap_or(Duration::from_secs(constants::question::DEFAULT_TIME_LIMIT))
    }
}
