use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use quiz_core::model::{TestId, TestResult};
use storage::repository::{ResultRepository, StorageError};

use super::attempt::{Attempt, CurrentQuestion, PresentedQuestion, Tick};
use super::progress::{SessionPhase, SessionStatus};
use crate::Clock;
use crate::error::SessionError;

const TICK: Duration = Duration::from_secs(1);

/// State shared between the session handle and its countdown task.
struct SessionShared {
    attempt: Mutex<Attempt>,
    results: Arc<dyn ResultRepository>,
    clock: Clock,
    status: watch::Sender<SessionStatus>,
    stop: Notify,
}

impl SessionShared {
    fn lock(&self) -> MutexGuard<'_, Attempt> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, attempt: &Attempt) {
        self.status.send_replace(attempt.status());
    }

    /// Single exit to `Finished`: whoever closes the attempt first writes the result.
    async fn finalize(&self) -> Result<Option<TestResult>, SessionError> {
        let draft = {
            let mut attempt = self.lock();
            let elapsed = self.clock.elapsed_secs(attempt.started_at());
            let Some(draft) = attempt.begin_finish(self.clock.now(), elapsed)? else {
                return Ok(None);
            };
            self.publish(&attempt);
            draft
        };
        self.stop.notify_one();

        match self.results.create(draft).await {
            Ok(result) => {
                let mut attempt = self.lock();
                attempt.complete(result.clone());
                self.publish(&attempt);
                tracing::info!(
                    "{} finished test {} with {}/{}",
                    result.examinee(),
                    result.test_id(),
                    result.score(),
                    result.max_score()
                );
                Ok(Some(result))
            }
            Err(err) => {
                let mut attempt = self.lock();
                attempt.abort_finish();
                self.publish(&attempt);
                Err(match err {
                    StorageError::NotFound => SessionError::TestDeleted(attempt.test_id()),
                    other => SessionError::SaveResult(other),
                })
            }
        }
    }
}

async fn run_countdown(shared: Arc<SessionShared>) {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shared.stop.notified() => return,
            _ = interval.tick() => {}
        }

        let tick = {
            let mut attempt = shared.lock();
            let tick = attempt.tick();
            shared.publish(&attempt);
            tick
        };

        match tick {
            Tick::Running(_) => {}
            Tick::Stopped => return,
            Tick::Expired => {
                tracing::info!("time is up; finishing the session");
                if let Err(err) = shared.finalize().await {
                    tracing::warn!("could not save the result after time ran out: {err}");
                }
                return;
            }
        }
    }
}

/// A live, timed attempt at one test.
///
/// Navigation and choices are synchronous. A background task counts the time
/// limit down once per second and finishes the session when it reaches zero.
/// Dropping the handle stops that task.
pub struct TestSession {
    shared: Arc<SessionShared>,
    countdown: JoinHandle<()>,
}

impl TestSession {
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        attempt: Attempt,
        results: Arc<dyn ResultRepository>,
        clock: Clock,
    ) -> Self {
        let (status, _) = watch::channel(attempt.status());
        let shared = Arc::new(SessionShared {
            attempt: Mutex::new(attempt),
            results,
            clock,
            status,
            stop: Notify::new(),
        });
        let countdown = tokio::spawn(run_countdown(Arc::clone(&shared)));
        Self { shared, countdown }
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.shared.lock().test_id()
    }

    #[must_use]
    pub fn examinee(&self) -> String {
        self.shared.lock().examinee().to_owned()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.shared.lock().status()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.shared.lock().phase()
    }

    /// Drawn questions in presentation order, answers shuffled.
    #[must_use]
    pub fn questions(&self) -> Vec<PresentedQuestion> {
        self.shared.lock().questions().to_vec()
    }

    /// Saved choice per question; `None` means unanswered.
    #[must_use]
    pub fn choices(&self) -> Vec<Option<usize>> {
        self.shared.lock().choices().to_vec()
    }

    #[must_use]
    pub fn current_question(&self) -> CurrentQuestion {
        self.shared.lock().current_question()
    }

    /// The stored result once the session is finished.
    #[must_use]
    pub fn result(&self) -> Option<TestResult> {
        self.shared.lock().result().cloned()
    }

    /// Highlight an option of the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` on a closed session and
    /// `SessionError::InvalidOption` for an index outside the option list.
    pub fn select_answer(&self, index: usize) -> Result<(), SessionError> {
        let mut attempt = self.shared.lock();
        attempt.select(index)?;
        self.shared.publish(&attempt);
        Ok(())
    }

    /// Save the highlighted option and move forward; stays put on the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` on a closed session.
    pub fn next(&self) -> Result<usize, SessionError> {
        let mut attempt = self.shared.lock();
        let index = attempt.next()?;
        self.shared.publish(&attempt);
        Ok(index)
    }

    /// Save the highlighted option and move back; stays put on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` on a closed session.
    pub fn previous(&self) -> Result<usize, SessionError> {
        let mut attempt = self.shared.lock();
        let index = attempt.previous()?;
        self.shared.publish(&attempt);
        Ok(index)
    }

    /// Hold the countdown without closing the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` on a closed session.
    pub fn pause_timer(&self) -> Result<(), SessionError> {
        let mut attempt = self.shared.lock();
        attempt.pause()?;
        self.shared.publish(&attempt);
        Ok(())
    }

    /// Continue a countdown held by [`TestSession::pause_timer`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` on a closed session.
    pub fn resume_timer(&self) -> Result<(), SessionError> {
        let mut attempt = self.shared.lock();
        attempt.resume()?;
        self.shared.publish(&attempt);
        Ok(())
    }

    /// Score the attempt and write its result.
    ///
    /// Returns `Ok(None)` when the session was already finished, is being
    /// finished by the countdown, or was cancelled.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SaveResult` if the result cannot be written, or
    /// `SessionError::TestDeleted` if the test no longer exists. The session
    /// then stays in progress with its countdown stopped, so `finish` can be
    /// retried.
    pub async fn finish(&self) -> Result<Option<TestResult>, SessionError> {
        self.shared.finalize().await
    }

    /// Abandon the attempt without writing a result.
    ///
    /// Returns whether this call cancelled the session.
    pub fn cancel(&self) -> bool {
        let cancelled = {
            let mut attempt = self.shared.lock();
            let cancelled = attempt.cancel();
            if cancelled {
                self.shared.publish(&attempt);
            }
            cancelled
        };
        if cancelled {
            self.shared.stop.notify_one();
            tracing::info!("session cancelled; no result recorded");
        }
        cancelled
    }

    /// Status updates, sent on every change and every countdown step.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Resolve once the session is finished or cancelled.
    pub async fn wait_finished(&self) -> SessionPhase {
        let mut rx = self.shared.status.subscribe();
        match rx.wait_for(|s| s.phase.is_terminal()).await {
            Ok(status) => status.phase,
            Err(_) => self.phase(),
        }
    }
}

impl Drop for TestSession {
    fn drop(&mut self) {
        self.shared.stop.notify_one();
        self.countdown.abort();
    }
}

impl std::fmt::Debug for TestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSession")
            .field("attempt", &*self.shared.lock())
            .finish_non_exhaustive()
    }
}
