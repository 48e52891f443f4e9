use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use quiz_core::model::{TestDefinition, TestId};
use storage::repository::{AnswerRepository, QuestionRepository, ResultRepository, TestRepository};

use super::attempt::{Attempt, PresentedQuestion};
use super::engine::TestSession;
use crate::Clock;
use crate::error::SessionError;

/// Draws questions for a test and starts timed sessions.
#[derive(Clone)]
pub struct SessionLauncher {
    clock: Clock,
    tests: Arc<dyn TestRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
    results: Arc<dyn ResultRepository>,
    seed: Option<u64>,
}

impl SessionLauncher {
    #[must_use]
    pub fn new(
        clock: Clock,
        tests: Arc<dyn TestRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            tests,
            questions,
            answers,
            results,
            seed: None,
        }
    }

    /// Use a fixed seed for question and answer shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Look the test up by id and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TestNotFound` for an unknown id and the errors of
    /// [`SessionLauncher::start`] otherwise.
    pub async fn start_by_id(
        &self,
        test_id: TestId,
        examinee: &str,
        group: Option<String>,
    ) -> Result<TestSession, SessionError> {
        let test = self
            .tests
            .find_by_id(test_id)
            .await
            .map_err(SessionError::LoadTest)?
            .ok_or(SessionError::TestNotFound(test_id))?;
        self.start(&test, examinee, group).await
    }

    /// Start a session: draw up to `sample_size` questions in random order,
    /// shuffle each question's answers, and start the countdown.
    ///
    /// Questions without answers are dropped after drawing, so a session can
    /// hold fewer questions than the sample size.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyExaminee` for a blank examinee name,
    /// `SessionError::NoQuestions` if the test has no questions,
    /// `SessionError::NoAnsweredQuestions` if none of the drawn questions has
    /// answers and `SessionError::LoadQuestions` if loading fails.
    pub async fn start(
        &self,
        test: &TestDefinition,
        examinee: &str,
        group: Option<String>,
    ) -> Result<TestSession, SessionError> {
        if examinee.trim().is_empty() {
            return Err(SessionError::EmptyExaminee);
        }

        let mut pool = self
            .questions
            .find_by_test(test.id())
            .await
            .map_err(SessionError::LoadQuestions)?;
        if pool.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let mut rng = self.rng();
        pool.shuffle(&mut rng);
        pool.truncate(usize::try_from(test.sample_size()).unwrap_or(usize::MAX));

        let mut drawn = Vec::with_capacity(pool.len());
        for question in pool {
            let mut answers = self
                .answers
                .find_by_question(question.id)
                .await
                .map_err(SessionError::LoadQuestions)?;
            if answers.is_empty() {
                tracing::warn!("question {} has no answer options; skipping it", question.id);
                continue;
            }
            answers.shuffle(&mut rng);
            drawn.push(PresentedQuestion { question, answers });
        }

        let attempt = Attempt::new(
            test.id(),
            examinee,
            group,
            drawn,
            test.time_limit_secs(),
            self.clock.now(),
        )?;
        tracing::info!(
            "{} started '{}': {} question(s), {}s",
            attempt.examinee(),
            test.name(),
            attempt.max_score(),
            test.time_limit_secs()
        );

        Ok(TestSession::spawn(
            attempt,
            Arc::clone(&self.results),
            self.clock,
        ))
    }
}
