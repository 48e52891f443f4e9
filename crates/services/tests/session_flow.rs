use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use quiz_core::model::{
    NewQuestion, ResultDraft, TestDefinition, TestDraft, TestId, TestResult, TestSettings,
};
use quiz_core::time::{fixed_clock, fixed_now};
use services::{
    AppServices, Clock, SessionError, SessionLauncher, SessionPhase, TestSession,
};
use storage::InMemoryRepository;
use storage::repository::{
    Page, RecordStore, ResultRepository, Storage, StorageError,
};

const TWO_BLOCKS: &str = "<question>\n2+2?\n<variant>4\n<variant>5\n<question>\n3+3?\n<variant>6\n<variant>5\n";

fn five_blocks() -> String {
    (1..=5)
        .map(|n| format!("<question>Q{n}\n<variant>right {n}\n<variant>wrong {n}\n<variant>also wrong {n}\n"))
        .collect()
}

async fn sqlite(name: &str) -> Storage {
    Storage::sqlite(&format!("sqlite:file:memdb_{name}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite")
}

async fn imported(app: &AppServices, name: &str, sample: u32, document: &str) -> TestDefinition {
    let draft = TestDraft::new(name, None, TestSettings::new(sample, 600).unwrap()).unwrap();
    app.imports()
        .upsert_and_import(draft, document)
        .await
        .unwrap()
        .test
}

/// Highlight the correct option of every question, moving forward as we go.
fn answer_all_correctly(session: &TestSession) {
    let questions = session.questions();
    for (i, presented) in questions.iter().enumerate() {
        let correct = presented.answers.iter().position(|a| a.is_correct).unwrap();
        session.select_answer(correct).unwrap();
        if i + 1 < questions.len() {
            session.next().unwrap();
        }
    }
}

#[tokio::test]
async fn worked_example_scores_two_of_two() {
    let storage = sqlite("session_worked_example").await;
    let app = AppServices::from_storage(&storage, fixed_clock());
    let test = imported(&app, "Sums", 5, TWO_BLOCKS).await;

    let session = app
        .sessions()
        .start(&test, "Ann", Some("7B".into()))
        .await
        .unwrap();
    assert_eq!(session.status().total, 2);
    assert_eq!(session.phase(), SessionPhase::InProgress);

    answer_all_correctly(&session);
    let result = session.finish().await.unwrap().expect("first finish writes");
    assert_eq!(result.score(), 2);
    assert_eq!(result.max_score(), 2);
    assert_eq!(result.examinee(), "Ann");
    assert_eq!(result.group(), Some("7B"));
    assert_eq!(result.completed_at(), fixed_now());
    assert_eq!(result.elapsed_secs(), 0);
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(session.result(), Some(result.clone()));

    let stored = storage.results.find_by_test(test.id()).await.unwrap();
    assert_eq!(stored, vec![result]);
}

#[tokio::test]
async fn finishing_twice_writes_one_result() {
    let storage = sqlite("session_finish_twice").await;
    let app = AppServices::from_storage(&storage, fixed_clock());
    let test = imported(&app, "Twice", 5, TWO_BLOCKS).await;

    let session = app.sessions().start(&test, "Bob", None).await.unwrap();
    assert!(session.finish().await.unwrap().is_some());
    assert!(session.finish().await.unwrap().is_none());
    assert!(!session.cancel());

    let stored = storage.results.find_by_test(test.id()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score(), 0);
}

#[tokio::test]
async fn cancel_writes_no_result_and_closes_the_session() {
    let storage = sqlite("session_cancel").await;
    let app = AppServices::from_storage(&storage, fixed_clock());
    let test = imported(&app, "Cancel", 5, TWO_BLOCKS).await;

    let session = app.sessions().start(&test, "Cy", None).await.unwrap();
    session.select_answer(0).unwrap();
    assert!(session.cancel());
    assert_eq!(session.phase(), SessionPhase::Cancelled);
    assert_eq!(session.wait_finished().await, SessionPhase::Cancelled);

    assert!(session.finish().await.unwrap().is_none());
    assert!(matches!(session.select_answer(0), Err(SessionError::NotInProgress)));
    assert!(matches!(session.next(), Err(SessionError::NotInProgress)));
    assert!(storage.results.find_all(Page::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn draws_sample_size_and_keeps_order_while_navigating() {
    let app = AppServices::in_memory(fixed_clock());
    let test = imported(&app, "Five", 3, &five_blocks()).await;

    let session = app.sessions().start(&test, "Dee", None).await.unwrap();
    let before = session.questions();
    assert_eq!(before.len(), 3);
    let mut ids: Vec<_> = before.iter().map(|q| q.question.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    session.next().unwrap();
    session.select_answer(2).unwrap();
    session.next().unwrap();
    session.previous().unwrap();
    session.previous().unwrap();
    assert_eq!(session.questions(), before);
    assert_eq!(session.choices(), vec![None, Some(2), None]);

    let current = session.current_question();
    assert_eq!(current.index, 0);
    assert_eq!(current.text, before[0].question.text);
    let expected: Vec<&str> = before[0].answers.iter().map(|a| a.text.as_str()).collect();
    assert_eq!(current.options, expected);
}

#[tokio::test]
async fn sample_larger_than_pool_takes_everything() {
    let app = AppServices::in_memory(fixed_clock());
    let test = imported(&app, "Small pool", 50, TWO_BLOCKS).await;

    let session = app.sessions().start(&test, "Eve", None).await.unwrap();
    assert_eq!(session.status().total, 2);
}

#[tokio::test]
async fn same_seed_gives_same_draw() {
    let storage = Storage::in_memory();
    let app = AppServices::from_storage(&storage, fixed_clock());
    let test = imported(&app, "Seeded", 3, &five_blocks()).await;

    let first = app.clone().with_session_seed(7).sessions();
    let second = app.with_session_seed(7).sessions();
    let a = first.start(&test, "Fay", None).await.unwrap().questions();
    let b = second.start(&test, "Gus", None).await.unwrap().questions();
    assert_eq!(a, b);
}

#[tokio::test]
async fn start_rejects_tests_without_usable_questions() {
    let storage = Storage::in_memory();
    let app = AppServices::from_storage(&storage, fixed_clock());
    let launcher = app.sessions();

    let empty = app
        .tests()
        .save(TestDraft::new("Empty", None, TestSettings::new(3, 60).unwrap()).unwrap())
        .await
        .unwrap();
    let err = launcher.start(&empty, "Hal", None).await.unwrap_err();
    assert!(matches!(err, SessionError::NoQuestions));

    storage
        .questions
        .create(NewQuestion::new(empty.id(), "No options").unwrap())
        .await
        .unwrap();
    let err = launcher.start(&empty, "Hal", None).await.unwrap_err();
    assert!(matches!(err, SessionError::NoAnsweredQuestions));

    let err = launcher.start(&empty, "   ", None).await.unwrap_err();
    assert!(matches!(err, SessionError::EmptyExaminee));

    let err = launcher
        .start_by_id(TestId::new(999), "Hal", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::TestNotFound(_)));
}

#[tokio::test]
async fn out_of_range_option_is_rejected() {
    let app = AppServices::in_memory(fixed_clock());
    let test = imported(&app, "Range", 2, TWO_BLOCKS).await;

    let session = app.sessions().start(&test, "Ivy", None).await.unwrap();
    let err = session.select_answer(2).unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidOption {
            index: 2,
            available: 2
        }
    ));
}

/// Result store whose first write fails.
struct FlakyResults {
    inner: InMemoryRepository,
    fail_next: AtomicBool,
}

#[async_trait]
impl RecordStore<TestResult> for FlakyResults {
    async fn find_by_id(
        &self,
        id: quiz_core::model::ResultId,
    ) -> Result<Option<TestResult>, StorageError> {
        RecordStore::<TestResult>::find_by_id(&self.inner, id).await
    }

    async fn find_all(&self, page: Page) -> Result<Vec<TestResult>, StorageError> {
        RecordStore::<TestResult>::find_all(&self.inner, page).await
    }

    async fn create(&self, fields: ResultDraft) -> Result<TestResult, StorageError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Connection("disk unavailable".into()));
        }
        RecordStore::<TestResult>::create(&self.inner, fields).await
    }

    async fn delete(&self, id: quiz_core::model::ResultId) -> Result<bool, StorageError> {
        RecordStore::<TestResult>::delete(&self.inner, id).await
    }
}

#[async_trait]
impl ResultRepository for FlakyResults {
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<TestResult>, StorageError> {
        ResultRepository::find_by_test(&self.inner, test_id).await
    }

    async fn find_by_examinee(&self, examinee: &str) -> Result<Vec<TestResult>, StorageError> {
        self.inner.find_by_examinee(examinee).await
    }
}

#[tokio::test]
async fn failed_result_write_can_be_retried() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(&repo);
    let flaky = Arc::new(FlakyResults {
        inner: repo.clone(),
        fail_next: AtomicBool::new(true),
    });
    let app = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let test = imported(&app, "Flaky", 2, TWO_BLOCKS).await;

    let launcher = SessionLauncher::new(
        fixed_clock(),
        Arc::clone(&storage.tests),
        Arc::clone(&storage.questions),
        Arc::clone(&storage.answers),
        flaky,
    );
    let session = launcher.start(&test, "Jo", None).await.unwrap();

    let err = session.finish().await.unwrap_err();
    assert!(matches!(err, SessionError::SaveResult(StorageError::Connection(_))));
    assert_eq!(
        err.to_string(),
        "could not save your result: connection error: disk unavailable"
    );
    let status = session.status();
    assert_eq!(status.phase, SessionPhase::InProgress);
    assert!(!status.timer_active);

    assert!(session.finish().await.unwrap().is_some());
    assert_eq!(storage.results.find_by_test(test.id()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_the_test_mid_session_names_the_failure() {
    let storage = sqlite("session_test_deleted").await;
    let app = AppServices::from_storage(&storage, fixed_clock());
    let test = imported(&app, "Vanishing", 2, TWO_BLOCKS).await;

    let session = app.sessions().start(&test, "Kim", None).await.unwrap();
    assert!(app.tests().delete(test.id()).await.unwrap());

    let err = session.finish().await.unwrap_err();
    assert!(matches!(err, SessionError::TestDeleted(id) if id == test.id()));
    assert_eq!(
        err.to_string(),
        format!(
            "test {} was deleted during the session; your result could not be saved",
            test.id()
        )
    );
    assert_eq!(session.phase(), SessionPhase::InProgress);
}
