//! Quiz content store
//!
//! The [`QuizContentStore`] owns the quiz being played and edited. Every
//! edit is applied in memory first and then written through the
//! [`Persistence`] collaborator. Persistence failures never undo an edit
//! and never interrupt play: they are logged and kept for the editing UI,
//! which collects them with [`QuizContentStore::take_error`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use garde::Validate;
use thiserror::Error;

use crate::{
    constants,
    quiz::{
        config::{Quiz, Round},
        question::Question,
    },
};

/// Errors raised by the content store and its persistence
#[derive(Error, Debug)]
pub enum Error {
    /// No round exists at the index
    #[error("round {0} does not exist")]
    RoundOutOfRange(usize),
    /// No question exists at the index within the round
    #[error("question {question} does not exist in round {round}")]
    QuestionOutOfRange {
        /// Round index
        round: usize,
        /// Question index
        question: usize,
    },
    /// The quiz already holds the maximum number of rounds
    #[error("a quiz holds at most {} rounds", constants::quiz::MAX_ROUNDS_COUNT)]
    TooManyRounds,
    /// The round already holds the maximum number of questions
    #[error("a round holds at most {} questions", constants::quiz::MAX_QUESTIONS_PER_ROUND)]
    TooManyQuestions,
    /// The content does not pass validation
    #[error("invalid quiz content: {0}")]
    Invalid(#[from] garde::Report),
    /// The storage could not be read or written
    #[error("quiz content storage failed: {0}")]
    Io(#[from] std::io::Error),
    /// The stored content could not be encoded or decoded
    #[error("quiz content encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Trait for loading and saving the quiz content
///
/// The quiz is stored as a whole under a single well-known key, one quiz
/// per install.
pub trait Persistence {
    /// Loads the stored quiz, `None` if nothing has been stored yet
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or decoded.
    fn load_quiz_content(&self) -> Result<Option<Quiz>, Error>;

    /// Replaces the stored quiz
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save_quiz_content(&mut self, quiz: &Quiz) -> Result<(), Error>;
}

/// Keeps the quiz as a JSON document in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    document: Option<String>,
}

impl MemoryPersistence {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `quiz`
    ///
    /// # Errors
    ///
    /// Returns an error if the quiz cannot be encoded.
    pub fn with_quiz(quiz: &Quiz) -> Result<Self, Error> {
        Ok(Self {
            document: Some(serde_json::to_string(quiz)?),
        })
    }

    /// The stored JSON document
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl Persistence for MemoryPersistence {
    fn load_quiz_content(&self) -> Result<Option<Quiz>, Error> {
        self.document
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(Error::from)
    }

    fn save_quiz_content(&mut self, quiz: &Quiz) -> Result<(), Error> {
        self.document = Some(serde_json::to_string(quiz)?);
        Ok(())
    }
}

/// Keeps the quiz as a JSON file inside a directory
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Stores the quiz in `<dir>/quiz-content.json`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir
                .as_ref()
                .join(format!("{}.json", constants::quiz::CONTENT_KEY)),
        }
    }

    /// Location of the JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for FilePersistence {
    fn load_quiz_content(&self) -> Result<Option<Quiz>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_quiz_content(&mut self, quiz: &Quiz) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(quiz)?)?;
        Ok(())
    }
}

/// The quiz content together with the collaborator it is persisted through
#[derive(Debug)]
pub struct QuizContentStore<P> {
    quiz: Quiz,
    persistence: P,
    last_error: Option<Error>,
}

impl<P: Persistence> QuizContentStore<P> {
    /// Loads the persisted quiz, falling back to the built-in content
    ///
    /// A read failure or stored content that fails validation also falls
    /// back to the built-in content; the error is kept for
    /// [`take_error`](Self::take_error).
    pub fn load(persistence: P) -> Self {
        let (quiz, last_error) = match persistence.load_quiz_content() {
            Ok(Some(quiz)) => match quiz.validate() {
                Ok(()) => (quiz, None),
                Err(report) => {
                    tracing::warn!(%report, "stored quiz content is invalid, using built-in content");
                    (Quiz::built_in(), Some(Error::Invalid(report)))
                }
            },
            Ok(None) => {
                tracing::info!("no stored quiz content, using built-in content");
                (Quiz::built_in(), None)
            }
            Err(error) => {
                tracing::warn!(%error, "failed to load quiz content, using built-in content");
                (Quiz::built_in(), Some(error))
            }
        };

        Self {
            quiz,
            persistence,
            last_error,
        }
    }

    /// The current quiz
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// The persistence collaborator
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Returns and clears the last load or save failure
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Appends a round
    ///
    /// # Errors
    ///
    /// Returns an error if the round is invalid or the quiz is full.
    pub fn add_round(&mut self, round: Round) -> Result<(), Error> {
        if self.quiz.rounds.len() >= constants::quiz::MAX_ROUNDS_COUNT {
            return Err(Error::TooManyRounds);
        }
        round.validate()?;
        tracing::info!(name = %round.name, "adding round");
        self.quiz.rounds.push(round);
        self.persist();
        Ok(())
    }

    /// Replaces the round at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the round is invalid.
    pub fn update_round(&mut self, index: usize, round: Round) -> Result<(), Error> {
        round.validate()?;
        let slot = self
            .quiz
            .rounds
            .get_mut(index)
            .ok_or(Error::RoundOutOfRange(index))?;
        tracing::info!(index, name = %round.name, "updating round");
        *slot = round;
        self.persist();
        Ok(())
    }

    /// Removes and returns the round at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    pub fn delete_round(&mut self, index: usize) -> Result<Round, Error> {
        if index >= self.quiz.rounds.len() {
            return Err(Error::RoundOutOfRange(index));
        }
        let round = self.quiz.rounds.remove(index);
        tracing::info!(index, name = %round.name, "deleted round");
        self.persist();
        Ok(round)
    }

    /// Appends a question to the round at `round_index`
    ///
    /// # Errors
    ///
    /// Returns an error if the round does not exist, is full, or the
    /// question is invalid.
    pub fn add_question(&mut self, round_index: usize, question: Question) -> Result<(), Error> {
        question.validate()?;
        let round = self
            .quiz
            .rounds
            .get_mut(round_index)
            .ok_or(Error::RoundOutOfRange(round_index))?;
        if round.questions.len() >= constants::quiz::MAX_QUESTIONS_PER_ROUND {
            return Err(Error::TooManyQuestions);
        }
        tracing::info!(round = round_index, id = %question.id(), "adding question");
        round.questions.push(question);
        self.persist();
        Ok(())
    }

    /// Replaces the question at `question_index` of the round at `round_index`
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range or the question is
    /// invalid.
    pub fn update_question(
        &mut self,
        round_index: usize,
        question_index: usize,
        question: Question,
    ) -> Result<(), Error> {
        question.validate()?;
        let slot = self.question_mut(round_index, question_index)?;
        tracing::info!(
            round = round_index,
            question = question_index,
            "updating question"
        );
        *slot = question;
        self.persist();
        Ok(())
    }

    /// Removes and returns the question at `question_index` of the round at
    /// `round_index`
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range.
    pub fn delete_question(
        &mut self,
        round_index: usize,
        question_index: usize,
    ) -> Result<Question, Error> {
        self.question_mut(round_index, question_index)?;
        let question = self.quiz.rounds[round_index].questions.remove(question_index);
        tracing::info!(
            round = round_index,
            question = question_index,
            "deleted question"
        );
        self.persist();
        Ok(question)
    }

    fn question_mut(
        &mut self,
        round_index: usize,
        question_index: usize,
    ) -> Result<&mut Question, Error> {
        self.quiz
            .rounds
            .get_mut(round_index)
            .ok_or(Error::RoundOutOfRange(round_index))?
            .questions
            .get_mut(question_index)
            .ok_or(Error::QuestionOutOfRange {
                round: round_index,
                question: question_index,
            })
    }

    fn persist(&mut self) {
        if let Err(error) = self.persistence.save_quiz_content(&self.quiz) {
            tracing::warn!(%error, "failed to save quiz content");
            self.last_error = Some(error);
        }
    }
}
