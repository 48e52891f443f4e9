use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ResultId, TestId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("examinee name cannot be empty")]
    EmptyExaminee,

    #[error("score ({score}) exceeds the number of questions ({max_score})")]
    ScoreOutOfRange { score: u32, max_score: u32 },
}

/// Fields of a result about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDraft {
    test_id: TestId,
    examinee: String,
    group: Option<String>,
    score: u32,
    max_score: u32,
    elapsed_secs: u32,
    completed_at: DateTime<Utc>,
}

impl ResultDraft {
    /// Validates the outcome of a finished session.
    ///
    /// A blank group label becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::EmptyExaminee` for a blank examinee name and
    /// `ResultError::ScoreOutOfRange` when `score > max_score`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        test_id: TestId,
        examinee: impl Into<String>,
        group: Option<String>,
        score: u32,
        max_score: u32,
        elapsed_secs: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        let examinee = examinee.into().trim().to_owned();
        if examinee.is_empty() {
            return Err(ResultError::EmptyExaminee);
        }
        if score > max_score {
            return Err(ResultError::ScoreOutOfRange { score, max_score });
        }
        Ok(Self {
            test_id,
            examinee,
            group: group
                .map(|g| g.trim().to_owned())
                .filter(|g| !g.is_empty()),
            score,
            max_score,
            elapsed_secs,
            completed_at,
        })
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn examinee(&self) -> &str {
        &self.examinee
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// Persisted outcome of one completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    id: ResultId,
    test_id: TestId,
    examinee: String,
    group: Option<String>,
    score: u32,
    max_score: u32,
    elapsed_secs: u32,
    completed_at: DateTime<Utc>,
}

impl TestResult {
    #[must_use]
    pub fn from_draft(id: ResultId, draft: ResultDraft) -> Self {
        Self {
            id,
            test_id: draft.test_id,
            examinee: draft.examinee,
            group: draft.group,
            score: draft.score,
            max_score: draft.max_score,
            elapsed_secs: draft.elapsed_secs,
            completed_at: draft.completed_at,
        }
    }

    /// Rehydrate a result row, re-checking the score bounds.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if the stored values violate the result invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ResultId,
        test_id: TestId,
        examinee: String,
        group: Option<String>,
        score: u32,
        max_score: u32,
        elapsed_secs: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        let draft = ResultDraft::new(
            test_id,
            examinee,
            group,
            score,
            max_score,
            elapsed_secs,
            completed_at,
        )?;
        Ok(Self::from_draft(id, draft))
    }

    #[must_use]
    pub fn id(&self) -> ResultId {
        self.id
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn examinee(&self) -> &str {
        &self.examinee
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Score as a percentage of the questions presented.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.max_score == 0 {
            return 0.0;
        }
        f64::from(self.score) * 100.0 / f64::from(self.max_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn score_above_max_is_rejected() {
        let err = ResultDraft::new(TestId::new(1), "Ann", None, 3, 2, 10, fixed_now())
            .unwrap_err();
        assert_eq!(
            err,
            ResultError::ScoreOutOfRange {
                score: 3,
                max_score: 2
            }
        );
    }

    #[test]
    fn blank_group_becomes_none() {
        let draft = ResultDraft::new(
            TestId::new(1),
            " Ann ",
            Some("  ".into()),
            1,
            2,
            10,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(draft.examinee(), "Ann");
        assert_eq!(draft.group(), None);
    }

    #[test]
    fn percent_of_presented_questions() {
        let draft = ResultDraft::new(TestId::new(1), "Ann", None, 3, 4, 10, fixed_now()).unwrap();
        let result = TestResult::from_draft(ResultId::new(1), draft);
        assert!((result.percent() - 75.0).abs() < f64::EPSILON);
    }
}
