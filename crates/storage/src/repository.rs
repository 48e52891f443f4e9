use async_trait::async_trait;
use quiz_core::import::ParsedQuestion;
use quiz_core::model::{
    Answer, AnswerId, NewAnswer, NewQuestion, Question, QuestionId, ResultDraft, ResultId,
    TestDefinition, TestDraft, TestId, TestResult,
};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Window over an ordered listing. `limit: None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }
}

//
// ─── RECORD KINDS ──────────────────────────────────────────────────────────────
//

/// Describes one kind of stored record: its id type and the fields needed to create it.
pub trait RecordKind: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static;
    type New: Send + 'static;

    /// Human-readable kind name used in logs and errors.
    const KIND: &'static str;

    fn id_from_u64(raw: u64) -> Self::Id;
    fn id_to_u64(id: Self::Id) -> u64;
}

impl RecordKind for TestDefinition {
    type Id = TestId;
    type New = TestDraft;
    const KIND: &'static str = "test";

    fn id_from_u64(raw: u64) -> TestId {
        TestId::new(raw)
    }
    fn id_to_u64(id: TestId) -> u64 {
        id.value()
    }
}

impl RecordKind for Question {
    type Id = QuestionId;
    type New = NewQuestion;
    const KIND: &'static str = "question";

    fn id_from_u64(raw: u64) -> QuestionId {
        QuestionId::new(raw)
    }
    fn id_to_u64(id: QuestionId) -> u64 {
        id.value()
    }
}

impl RecordKind for Answer {
    type Id = AnswerId;
    type New = NewAnswer;
    const KIND: &'static str = "answer";

    fn id_from_u64(raw: u64) -> AnswerId {
        AnswerId::new(raw)
    }
    fn id_to_u64(id: AnswerId) -> u64 {
        id.value()
    }
}

impl RecordKind for TestResult {
    type Id = ResultId;
    type New = ResultDraft;
    const KIND: &'static str = "result";

    fn id_from_u64(raw: u64) -> ResultId {
        ResultId::new(raw)
    }
    fn id_to_u64(id: ResultId) -> u64 {
        id.value()
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Generic CRUD over one record kind.
///
/// Writes are visible to the next read. Ids grow monotonically per kind and are
/// never reused. Deleting a parent removes its dependents (tests own questions
/// and results, questions own answers).
#[async_trait]
pub trait RecordStore<K: RecordKind>: Send + Sync {
    /// Fetch a record by id; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_id(&self, id: K::Id) -> Result<Option<K>, StorageError>;

    /// List records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_all(&self, page: Page) -> Result<Vec<K>, StorageError>;

    /// Insert a record and return it as read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on a uniqueness violation,
    /// `StorageError::NotFound` when a referenced parent is missing.
    async fn create(&self, fields: K::New) -> Result<K, StorageError>;

    /// Delete a record; returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete(&self, id: K::Id) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait TestRepository: RecordStore<TestDefinition> {
    /// Exact-match lookup used for upsert-by-name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_name(&self, name: &str) -> Result<Option<TestDefinition>, StorageError>;

    /// Substring search over name and description, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<TestDefinition>, StorageError>;

    /// Overwrite name, description and settings of an existing test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown id and
    /// `StorageError::Conflict` if the name belongs to another test.
    async fn update(&self, id: TestId, draft: TestDraft) -> Result<TestDefinition, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: RecordStore<Question> {
    /// Questions of a test in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn count_by_test(&self, test_id: TestId) -> Result<u32, StorageError>;
}

#[async_trait]
pub trait AnswerRepository: RecordStore<Answer> {
    /// Answers of a question in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_question(&self, question_id: QuestionId) -> Result<Vec<Answer>, StorageError>;
}

#[async_trait]
pub trait ResultRepository: RecordStore<TestResult> {
    /// Results of a test, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<TestResult>, StorageError>;

    /// Results of one examinee across tests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_by_examinee(&self, examinee: &str) -> Result<Vec<TestResult>, StorageError>;
}

/// Atomic replacement of a test's question pool.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Delete every question (and answer) of the test and insert `questions`
    /// in order, as one unit. On error the previous pool is left untouched.
    ///
    /// Returns the number of questions inserted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the test does not exist, or other
    /// storage errors; in both cases nothing is changed.
    async fn replace_questions(
        &self,
        test_id: TestId,
        questions: &[ParsedQuestion],
    ) -> Result<usize, StorageError>;
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the per-kind repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub tests: Arc<dyn TestRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub question_bank: Arc<dyn QuestionBankRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Build a `Storage` sharing the given in-memory tables.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        Self {
            tests: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            question_bank: Arc::new(repo.clone()),
        }
    }
}
