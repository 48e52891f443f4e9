use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId, TestId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("answer text cannot be empty")]
    EmptyAnswer,
}

/// A question owned by a test.
///
/// Questions are immutable after creation; a re-import replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub test_id: TestId,
    pub text: String,
}

/// One answer option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

/// Fields for inserting a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    test_id: TestId,
    text: String,
}

impl NewQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyQuestion` if the trimmed text is empty.
    pub fn new(test_id: TestId, text: impl Into<String>) -> Result<Self, QuestionError> {
        let text = non_empty(text.into()).ok_or(QuestionError::EmptyQuestion)?;
        Ok(Self { test_id, text })
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_question(self, id: QuestionId) -> Question {
        Question {
            id,
            test_id: self.test_id,
            text: self.text,
        }
    }
}

/// Fields for inserting an answer option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswer {
    question_id: QuestionId,
    text: String,
    is_correct: bool,
}

impl NewAnswer {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyAnswer` if the trimmed text is empty.
    pub fn new(
        question_id: QuestionId,
        text: impl Into<String>,
        is_correct: bool,
    ) -> Result<Self, QuestionError> {
        let text = non_empty(text.into()).ok_or(QuestionError::EmptyAnswer)?;
        Ok(Self {
            question_id,
            text,
            is_correct,
        })
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn into_answer(self, id: AnswerId) -> Answer {
        Answer {
            id,
            question_id: self.question_id,
            text: self.text,
            is_correct: self.is_correct,
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
