use async_trait::async_trait;
use quiz_core::import::ParsedQuestion;
use quiz_core::model::{
    Answer, AnswerId, NewAnswer, NewQuestion, Question, QuestionId, ResultDraft, ResultId,
    TestDefinition, TestDraft, TestId, TestResult,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::{
    AnswerRepository, Page, QuestionBankRepository, QuestionRepository, RecordKind, RecordStore,
    ResultRepository, StorageError, TestRepository,
};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    tests: u64,
    questions: u64,
    answers: u64,
    results: u64,
}

fn next_id(seq: &mut u64) -> u64 {
    *seq += 1;
    *seq
}

/// Row storage of the in-memory backend, keyed by id so iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    tests: BTreeMap<u64, TestDefinition>,
    questions: BTreeMap<u64, Question>,
    answers: BTreeMap<u64, Answer>,
    results: BTreeMap<u64, TestResult>,
    sequences: Sequences,
}

impl Tables {
    fn remove_answers_of(&mut self, question_id: QuestionId) {
        self.answers.retain(|_, a| a.question_id != question_id);
    }

    fn remove_questions_of(&mut self, test_id: TestId) {
        let owned: Vec<QuestionId> = self
            .questions
            .values()
            .filter(|q| q.test_id == test_id)
            .map(|q| q.id)
            .collect();
        for question_id in owned {
            self.questions.remove(&question_id.value());
            self.remove_answers_of(question_id);
        }
    }

    fn name_taken(&self, name: &str, except: Option<TestId>) -> bool {
        self.tests
            .values()
            .any(|t| t.name() == name && Some(t.id()) != except)
    }

    fn insert_question(&mut self, fields: NewQuestion) -> Result<Question, StorageError> {
        if !self.tests.contains_key(&fields.test_id().value()) {
            return Err(StorageError::NotFound);
        }
        let id = next_id(&mut self.sequences.questions);
        let question = fields.into_question(QuestionId::new(id));
        self.questions.insert(id, question.clone());
        Ok(question)
    }

    fn insert_answer(&mut self, fields: NewAnswer) -> Result<Answer, StorageError> {
        if !self.questions.contains_key(&fields.question_id().value()) {
            return Err(StorageError::NotFound);
        }
        let id = next_id(&mut self.sequences.answers);
        let answer = fields.into_answer(AnswerId::new(id));
        self.answers.insert(id, answer.clone());
        Ok(answer)
    }
}

/// Per-kind hooks that let one generic `RecordStore` impl serve every table.
pub trait MemoryRecord: RecordKind {
    fn table(tables: &Tables) -> &BTreeMap<u64, Self>;
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self>;
    fn insert(tables: &mut Tables, fields: Self::New) -> Result<Self, StorageError>;

    /// Remove rows owned by the deleted record.
    fn cascade(_tables: &mut Tables, _id: u64) {}
}

impl MemoryRecord for TestDefinition {
    fn table(tables: &Tables) -> &BTreeMap<u64, Self> {
        &tables.tests
    }

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
        &mut tables.tests
    }

    fn insert(tables: &mut Tables, fields: TestDraft) -> Result<Self, StorageError> {
        if tables.name_taken(fields.name(), None) {
            return Err(StorageError::Conflict(format!(
                "a test named '{}' already exists",
                fields.name()
            )));
        }
        let id = next_id(&mut tables.sequences.tests);
        let test = TestDefinition::from_draft(TestId::new(id), fields);
        tables.tests.insert(id, test.clone());
        Ok(test)
    }

    fn cascade(tables: &mut Tables, id: u64) {
        let test_id = TestId::new(id);
        tables.remove_questions_of(test_id);
        tables.results.retain(|_, r| r.test_id() != test_id);
    }
}

impl MemoryRecord for Question {
    fn table(tables: &Tables) -> &BTreeMap<u64, Self> {
        &tables.questions
    }

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
        &mut tables.questions
    }

    fn insert(tables: &mut Tables, fields: NewQuestion) -> Result<Self, StorageError> {
        tables.insert_question(fields)
    }

    fn cascade(tables: &mut Tables, id: u64) {
        tables.remove_answers_of(QuestionId::new(id));
    }
}

impl MemoryRecord for Answer {
    fn table(tables: &Tables) -> &BTreeMap<u64, Self> {
        &tables.answers
    }

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
        &mut tables.answers
    }

    fn insert(tables: &mut Tables, fields: NewAnswer) -> Result<Self, StorageError> {
        tables.insert_answer(fields)
    }
}

impl MemoryRecord for TestResult {
    fn table(tables: &Tables) -> &BTreeMap<u64, Self> {
        &tables.results
    }

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
        &mut tables.results
    }

    fn insert(tables: &mut Tables, fields: ResultDraft) -> Result<Self, StorageError> {
        if !tables.tests.contains_key(&fields.test_id().value()) {
            return Err(StorageError::NotFound);
        }
        let id = next_id(&mut tables.sequences.results);
        let result = TestResult::from_draft(ResultId::new(id), fields);
        tables.results.insert(id, result.clone());
        Ok(result)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl<K: MemoryRecord> RecordStore<K> for InMemoryRepository {
    async fn find_by_id(&self, id: K::Id) -> Result<Option<K>, StorageError> {
        let guard = self.lock()?;
        Ok(K::table(&guard).get(&K::id_to_u64(id)).cloned())
    }

    async fn find_all(&self, page: Page) -> Result<Vec<K>, StorageError> {
        let guard = self.lock()?;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = page
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(K::table(&guard)
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create(&self, fields: K::New) -> Result<K, StorageError> {
        let mut guard = self.lock()?;
        K::insert(&mut guard, fields)
    }

    async fn delete(&self, id: K::Id) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let raw = K::id_to_u64(id);
        let existed = K::table_mut(&mut guard).remove(&raw).is_some();
        if existed {
            K::cascade(&mut guard, raw);
        }
        Ok(existed)
    }
}

#[async_trait]
impl TestRepository for InMemoryRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<TestDefinition>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.tests.values().find(|t| t.name() == name).cloned())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<TestDefinition>, StorageError> {
        let needle = query.to_lowercase();
        let guard = self.lock()?;
        let mut found: Vec<TestDefinition> = guard
            .tests
            .values()
            .filter(|t| {
                t.name().to_lowercase().contains(&needle)
                    || t
                        .description()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name().cmp(b.name()));
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }

    async fn update(&self, id: TestId, draft: TestDraft) -> Result<TestDefinition, StorageError> {
        let mut guard = self.lock()?;
        if !guard.tests.contains_key(&id.value()) {
            return Err(StorageError::NotFound);
        }
        if guard.name_taken(draft.name(), Some(id)) {
            return Err(StorageError::Conflict(format!(
                "a test named '{}' already exists",
                draft.name()
            )));
        }
        let updated = TestDefinition::from_draft(id, draft);
        guard.tests.insert(id.value(), updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| q.test_id == test_id)
            .cloned()
            .collect())
    }

    async fn count_by_test(&self, test_id: TestId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let count = guard
            .questions
            .values()
            .filter(|q| q.test_id == test_id)
            .count();
        u32::try_from(count).map_err(ser)
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn find_by_question(&self, question_id: QuestionId) -> Result<Vec<Answer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }
}

fn newest_first(mut results: Vec<TestResult>) -> Vec<TestResult> {
    results.sort_by(|a, b| {
        b.completed_at()
            .cmp(&a.completed_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
    results
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<TestResult>, StorageError> {
        let guard = self.lock()?;
        Ok(newest_first(
            guard
                .results
                .values()
                .filter(|r| r.test_id() == test_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_examinee(&self, examinee: &str) -> Result<Vec<TestResult>, StorageError> {
        let guard = self.lock()?;
        Ok(newest_first(
            guard
                .results
                .values()
                .filter(|r| r.examinee() == examinee)
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn replace_questions(
        &self,
        test_id: TestId,
        questions: &[ParsedQuestion],
    ) -> Result<usize, StorageError> {
        let mut guard = self.lock()?;
        if !guard.tests.contains_key(&test_id.value()) {
            return Err(StorageError::NotFound);
        }

        // Work on a copy so a failure leaves the committed tables untouched.
        let mut staged = guard.clone();
        staged.remove_questions_of(test_id);
        for parsed in questions {
            let question =
                staged.insert_question(NewQuestion::new(test_id, &parsed.text).map_err(ser)?)?;
            for answer in &parsed.answers {
                staged.insert_answer(
                    NewAnswer::new(question.id, &answer.text, answer.is_correct).map_err(ser)?,
                )?;
            }
        }
        *guard = staged;
        Ok(questions.len())
    }
}
