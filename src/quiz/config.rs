//! Quiz content: rounds of questions
//!
//! This module defines the [`Quiz`] content root and its [`Round`]s, plus
//! the built-in content used when nothing has been persisted yet.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{constants, id::Id};

use super::question::{AnswerOption, OptionLabel, Question};

/// An ordered, named group of questions sharing a theme
///
/// The order of `questions` is the navigation and grading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Round {
    /// Stable identifier
    #[garde(skip)]
    pub id: Id,
    /// Display name
    #[garde(length(max = constants::quiz::MAX_ROUND_NAME_LENGTH))]
    pub name: String,
    /// Theme label shown under the name
    #[garde(length(max = constants::quiz::MAX_THEME_LENGTH))]
    pub theme: String,
    /// Questions in navigation order
    #[garde(length(max = constants::quiz::MAX_QUESTIONS_PER_ROUND), dive)]
    pub questions: Vec<Question>,
}

impl Round {
    /// Creates a round with a fresh id
    pub fn new(name: impl Into<String>, theme: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            theme: theme.into(),
            questions,
        }
    }

    /// Number of questions in this round
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether this round has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Sum of the points of all questions in this round
    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(Question::points).sum()
    }
}

/// The complete quiz: an ordered list of rounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, Default)]
pub struct Quiz {
    /// Rounds in play order
    #[garde(length(max = constants::quiz::MAX_ROUNDS_COUNT), dive)]
    pub rounds: Vec<Round>,
}

impl Quiz {
    /// Creates a quiz from its rounds
    pub fn new(rounds: Vec<Round>) -> Self {
        Self { rounds }
    }

    /// Number of rounds
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether the quiz has no rounds
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// The round at `round_index`
    pub fn round(&self, round_index: usize) -> Option<&Round> {
        self.rounds.get(round_index)
    }

    /// The question at `question_index` within the round at `round_index`
    pub fn question(&self, round_index: usize, question_index: usize) -> Option<&Question> {
        self.round(round_index)?.questions.get(question_index)
    }

    /// Number of questions across all rounds
    pub fn total_questions(&self) -> usize {
        self.rounds.iter().map(Round::len).sum()
    }

    /// Sum of the points of every question
    pub fn total_points(&self) -> u64 {
        self.rounds.iter().map(Round::total_points).sum()
    }

    /// The content shipped with the application, used until the host saves
    /// their own quiz
    pub fn built_in() -> Self {
        let options = |texts: [&str; 4]| {
            OptionLabel::ALL
                .into_iter()
                .zip(texts)
                .map(|(label, text)| AnswerOption::new(label, text))
                .collect_vec()
        };

        Self::new(vec![
            Round::new(
                "Round 1",
                "Networking Basics",
                vec![
                    Question::new(
                        "Which protocol secures web browsing by encrypting traffic between browser and server with SSL/TLS, usually on port 443?",
                        options(["HTTP", "FTP", "HTTPS", "SSH"]),
                        OptionLabel::C,
                        10,
                    )
                    .with_explanation(
                        "HTTPS wraps HTTP in SSL/TLS encryption and is the standard for secure web traffic.",
                    ),
                    Question::new(
                        "In the OSI model, which layer routes packets between different networks?",
                        options([
                            "Data Link Layer (Layer 2)",
                            "Network Layer (Layer 3)",
                            "Transport Layer (Layer 4)",
                            "Session Layer (Layer 5)",
                        ]),
                        OptionLabel::B,
                        10,
                    ),
                ],
            ),
            Round::new(
                "Round 2",
                "Cybersecurity",
                vec![
                    Question::new(
                        "Which attack intercepts the communication between two parties without their knowledge?",
                        options([
                            "DDoS Attack",
                            "Phishing Attack",
                            "Man-in-the-Middle Attack",
                            "SQL Injection",
                        ]),
                        OptionLabel::C,
                        20,
                    )
                    .with_negative_points(5),
                ],
            ),
        ])
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_is_valid() {
        let quiz = Quiz::built_in();
        assert!(quiz.validate().is_ok());
        assert_eq!(quiz.len(), 2);
        assert!(quiz.rounds.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn test_totals() {
        let quiz = Quiz::built_in();
        assert_eq!(quiz.total_questions(), 3);
        assert_eq!(quiz.total_points(), 40);
        assert_eq!(quiz.round(0).map(Round::total_points), Some(20));
    }

    #[test]
    fn test_lookup() {
        let quiz = Quiz::built_in();
        assert_eq!(
            quiz.question(0, 1).map(Question::correct_answer),
            Some(OptionLabel::B)
        );
        assert!(quiz.question(0, 2).is_none());
        assert!(quiz.question(5, 0).is_none());
    }

    #[test]
    fn test_empty_quiz() {
        let quiz = Quiz::default();
        assert!(quiz.is_empty());
        assert_eq!(quiz.total_questions(), 0);
        assert_eq!(quiz.total_points(), 0);
        assert!(quiz.validate().is_ok());
    }

    #[test]
    fn test_too_many_rounds() {
        let quiz = Quiz::new(vec![
            Round::new("r", "t", vec![]);
            constants::quiz::MAX_ROUNDS_COUNT + 1
        ]);
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_invalid_question_fails_quiz_validation() {
        let mut quiz = Quiz::built_in();
        quiz.rounds[0].questions.push(Question::new(
            "broken",
            vec![AnswerOption::new(OptionLabel::A, "only one")],
            OptionLabel::A,
            1,
        ));
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_content() {
        let quiz = Quiz::built_in();
        let json = serde_json::to_string(&quiz).unwrap();
        let parsed: Quiz = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, quiz);
    }
}
