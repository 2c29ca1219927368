//! Scoring of answers and timeouts
//!
//! Scoring is a pure function of a question and what the player did:
//! the correct label earns the question's points, anything else (a wrong
//! label or running out of time) earns nothing and costs the question's
//! negative points.

use enum_map::Enum;
use serde::{Deserialize, Serialize};

use crate::quiz::question::{OptionLabel, Question};

/// What the player did on a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submission {
    /// The player picked an option
    Answer(OptionLabel),
    /// The countdown expired without an answer
    Timeout,
}

impl Submission {
    /// The selected label, if any
    pub fn label(self) -> Option<OptionLabel> {
        match self {
            Self::Answer(label) => Some(label),
            Self::Timeout => None,
        }
    }
}

/// Scoring result for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Points earned
    pub awarded_points: u64,
    /// Whether the submission was the correct answer
    pub is_correct: bool,
    /// Points to deduct
    pub deducted_points: u64,
}

/// The three ways a question can end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The correct option was picked
    Correct,
    /// A wrong option was picked
    Wrong,
    /// Time ran out
    TimedOut,
}

impl Outcome {
    /// Classifies a submission and its evaluation
    pub fn of(submission: Submission, evaluation: &Evaluation) -> Self {
        match submission {
            Submission::Timeout => Self::TimedOut,
            Submission::Answer(_) if evaluation.is_correct => Self::Correct,
            Submission::Answer(_) => Self::Wrong,
        }
    }
}

/// Scores a submission against a question
pub fn evaluate(question: &Question, submission: Submission) -> Evaluation {
    match submission {
        Submission::Answer(label) if label == question.correct_answer() => Evaluation {
            awarded_points: question.points(),
            is_correct: true,
            deducted_points: 0,
        },
        Submission::Answer(_) | Submission::Timeout => Evaluation {
            awarded_points: 0,
            is_correct: false,
            deducted_points: question.negative_points(),
        },
    }
}

/// Applies an evaluation to a cumulative score
///
/// The result is floored at zero for this step.
pub fn apply(score: u64, evaluation: &Evaluation) -> u64 {
    score
        .saturating_add(evaluation.awarded_points)
        .saturating_sub(evaluation.deducted_points)
}
