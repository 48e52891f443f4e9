use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::model::{Answer, Question, ResultDraft, TestId, TestResult};

use super::progress::{SessionPhase, SessionStatus};
use crate::error::SessionError;

//
// ─── PRESENTATION ──────────────────────────────────────────────────────────────
//

/// A drawn question with its answer options in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// The question the examinee is looking at right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub options: Vec<String>,
    pub highlighted: Option<usize>,
}

/// What one countdown step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    Running(u32),
    Expired,
    Stopped,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// State of one examinee's attempt, free of any I/O.
///
/// Question and answer order is fixed at construction. Each question has a
/// saved choice slot; the highlighted option is tentative until the examinee
/// navigates away or finishes.
pub(crate) struct Attempt {
    test_id: TestId,
    examinee: String,
    group: Option<String>,
    questions: Vec<PresentedQuestion>,
    choices: Vec<Option<usize>>,
    current: usize,
    highlighted: Option<usize>,
    remaining_secs: u32,
    timer_active: bool,
    paused: bool,
    started_at: DateTime<Utc>,
    phase: SessionPhase,
    result: Option<TestResult>,
}

impl Attempt {
    /// # Errors
    ///
    /// Returns `SessionError::EmptyExaminee` for a blank examinee name and
    /// `SessionError::NoAnsweredQuestions` if `questions` is empty.
    pub(crate) fn new(
        test_id: TestId,
        examinee: &str,
        group: Option<String>,
        questions: Vec<PresentedQuestion>,
        time_limit_secs: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let examinee = examinee.trim();
        if examinee.is_empty() {
            return Err(SessionError::EmptyExaminee);
        }
        if questions.is_empty() {
            return Err(SessionError::NoAnsweredQuestions);
        }

        Ok(Self {
            test_id,
            examinee: examinee.to_owned(),
            group: group.map(|g| g.trim().to_owned()).filter(|g| !g.is_empty()),
            choices: vec![None; questions.len()],
            questions,
            current: 0,
            highlighted: None,
            remaining_secs: time_limit_secs,
            timer_active: true,
            paused: false,
            started_at,
            phase: SessionPhase::InProgress,
            result: None,
        })
    }

    pub(crate) fn test_id(&self) -> TestId {
        self.test_id
    }

    pub(crate) fn examinee(&self) -> &str {
        &self.examinee
    }

    pub(crate) fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub(crate) fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    pub(crate) fn choices(&self) -> &[Option<usize>] {
        &self.choices
    }

    pub(crate) fn max_score(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    /// Questions whose saved choice is flagged correct. Unanswered never scores.
    pub(crate) fn score(&self) -> u32 {
        let correct = self
            .questions
            .iter()
            .zip(&self.choices)
            .filter(|(q, choice)| {
                choice
                    .and_then(|c| q.answers.get(c))
                    .is_some_and(|a| a.is_correct)
            })
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            timer_active: self.timer_active,
            paused: self.paused,
            current_index: self.current,
            total: self.questions.len(),
            answered: self.choices.iter().filter(|c| c.is_some()).count(),
        }
    }

    pub(crate) fn current_question(&self) -> CurrentQuestion {
        let presented = &self.questions[self.current];
        CurrentQuestion {
            index: self.current,
            total: self.questions.len(),
            text: presented.question.text.clone(),
            options: presented.answers.iter().map(|a| a.text.clone()).collect(),
            highlighted: self.highlighted,
        }
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::InProgress {
            Ok(())
        } else {
            Err(SessionError::NotInProgress)
        }
    }

    /// Highlight an option of the current question without saving it.
    pub(crate) fn select(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let available = self.questions[self.current].answers.len();
        if index >= available {
            return Err(SessionError::InvalidOption { index, available });
        }
        self.highlighted = Some(index);
        Ok(())
    }

    fn save_highlighted(&mut self) {
        if let Some(choice) = self.highlighted {
            self.choices[self.current] = Some(choice);
        }
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.highlighted = self.choices[index];
    }

    pub(crate) fn next(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.save_highlighted();
        if self.current + 1 < self.questions.len() {
            self.move_to(self.current + 1);
        }
        Ok(self.current)
    }

    pub(crate) fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.save_highlighted();
        if self.current > 0 {
            self.move_to(self.current - 1);
        }
        Ok(self.current)
    }

    /// Hold the countdown; the wall-clock elapsed time keeps running.
    pub(crate) fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.paused = true;
        Ok(())
    }

    pub(crate) fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.paused = false;
        Ok(())
    }

    /// One second of countdown.
    pub(crate) fn tick(&mut self) -> Tick {
        if self.phase != SessionPhase::InProgress || !self.timer_active {
            return Tick::Stopped;
        }
        if self.paused {
            return Tick::Running(self.remaining_secs);
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            Tick::Expired
        } else {
            Tick::Running(self.remaining_secs)
        }
    }

    /// Close the attempt for writing and build its result.
    ///
    /// Returns `Ok(None)` if the attempt is already finishing or terminal.
    pub(crate) fn begin_finish(
        &mut self,
        completed_at: DateTime<Utc>,
        elapsed_secs: u32,
    ) -> Result<Option<ResultDraft>, SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Ok(None);
        }
        self.save_highlighted();
        let draft = ResultDraft::new(
            self.test_id,
            self.examinee.clone(),
            self.group.clone(),
            self.score(),
            self.max_score(),
            elapsed_secs,
            completed_at,
        )?;
        self.timer_active = false;
        self.paused = false;
        self.phase = SessionPhase::Finishing;
        Ok(Some(draft))
    }

    pub(crate) fn complete(&mut self, result: TestResult) {
        self.result = Some(result);
        self.phase = SessionPhase::Finished;
    }

    /// The result write failed: reopen for another `finish`, with the countdown stopped.
    pub(crate) fn abort_finish(&mut self) {
        if self.phase == SessionPhase::Finishing {
            self.phase = SessionPhase::InProgress;
        }
    }

    /// Returns whether the attempt was open and is now cancelled.
    pub(crate) fn cancel(&mut self) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        self.timer_active = false;
        self.paused = false;
        self.phase = SessionPhase::Cancelled;
        true
    }
}

impl fmt::Debug for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attempt")
            .field("test_id", &self.test_id)
            .field("examinee", &self.examinee)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("remaining_secs", &self.remaining_secs)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
