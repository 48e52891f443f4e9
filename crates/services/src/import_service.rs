use std::path::Path;
use std::sync::Arc;

use quiz_core::import::ImportDocument;
use quiz_core::model::{TestDefinition, TestDraft, TestId};
use storage::repository::{QuestionBankRepository, StorageError, TestRepository};

use crate::error::ImportServiceError;
use crate::test_service::TestService;

/// Outcome of importing a document into a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub test: TestDefinition,
    pub questions_created: usize,
    /// Blocks skipped because they had no usable answer option.
    pub blocks_dropped: usize,
}

/// Loads question documents into a test's question pool.
///
/// Documents are parsed completely before anything is written, and the pool
/// swap itself is atomic, so a failed import leaves the previous pool intact.
#[derive(Clone)]
pub struct ImportService {
    tests: Arc<dyn TestRepository>,
    question_bank: Arc<dyn QuestionBankRepository>,
    test_service: TestService,
}

impl ImportService {
    #[must_use]
    pub fn new(
        tests: Arc<dyn TestRepository>,
        question_bank: Arc<dyn QuestionBankRepository>,
    ) -> Self {
        let test_service = TestService::new(Arc::clone(&tests));
        Self {
            tests,
            question_bank,
            test_service,
        }
    }

    /// Replace the questions of an existing test with those in `document`.
    ///
    /// Returns the number of questions created.
    ///
    /// # Errors
    ///
    /// Returns `ImportServiceError::Parse` for an empty or answerless document,
    /// `ImportServiceError::TestNotFound` for an unknown test,
    /// `ImportServiceError::LoadTest` if the lookup fails and
    /// `ImportServiceError::ReplaceQuestions` if the write fails.
    pub async fn import_or_replace(
        &self,
        test_id: TestId,
        document: &str,
    ) -> Result<usize, ImportServiceError> {
        let test = self
            .tests
            .find_by_id(test_id)
            .await
            .map_err(ImportServiceError::LoadTest)?
            .ok_or(ImportServiceError::TestNotFound(test_id))?;
        let parsed = ImportDocument::parse(document)?;
        Ok(self.replace(test, parsed).await?.questions_created)
    }

    /// Read a UTF-8 file and import it into an existing test.
    ///
    /// # Errors
    ///
    /// Returns `ImportServiceError::Unreadable` if the file cannot be read, and
    /// the errors of [`ImportService::import_or_replace`] otherwise.
    pub async fn import_file(
        &self,
        test_id: TestId,
        path: &Path,
    ) -> Result<usize, ImportServiceError> {
        let document = read_document(path).await?;
        self.import_or_replace(test_id, &document).await
    }

    /// Create or update the test named in `draft`, then replace its questions.
    ///
    /// The document is parsed first, so a bad document changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ImportServiceError::Parse` for an unusable document,
    /// `ImportServiceError::Test` if saving the test fails and
    /// `ImportServiceError::ReplaceQuestions` if the question write fails.
    pub async fn upsert_and_import(
        &self,
        draft: TestDraft,
        document: &str,
    ) -> Result<ImportReport, ImportServiceError> {
        let parsed = ImportDocument::parse(document)?;
        let test = self.test_service.save(draft).await?;
        self.replace(test, parsed).await
    }

    /// File-based variant of [`ImportService::upsert_and_import`].
    ///
    /// # Errors
    ///
    /// Returns `ImportServiceError::Unreadable` if the file cannot be read.
    pub async fn upsert_and_import_file(
        &self,
        draft: TestDraft,
        path: &Path,
    ) -> Result<ImportReport, ImportServiceError> {
        let document = read_document(path).await?;
        self.upsert_and_import(draft, &document).await
    }

    async fn replace(
        &self,
        test: TestDefinition,
        parsed: ImportDocument,
    ) -> Result<ImportReport, ImportServiceError> {
        let created = self
            .question_bank
            .replace_questions(test.id(), parsed.questions())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ImportServiceError::TestNotFound(test.id()),
                other => ImportServiceError::ReplaceQuestions(other),
            })?;

        if parsed.dropped_blocks() > 0 {
            tracing::warn!(
                "skipped {} question block(s) without answer options while importing into '{}'",
                parsed.dropped_blocks(),
                test.name()
            );
        }
        tracing::info!("imported {created} question(s) into '{}'", test.name());

        Ok(ImportReport {
            blocks_dropped: parsed.dropped_blocks(),
            questions_created: created,
            test,
        })
    }
}

async fn read_document(path: &Path) -> Result<String, ImportServiceError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportServiceError::Unreadable {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::import::ImportError;
    use quiz_core::model::TestSettings;
    use storage::repository::Storage;

    fn import_service(storage: &Storage) -> ImportService {
        ImportService::new(
            Arc::clone(&storage.tests),
            Arc::clone(&storage.question_bank),
        )
    }

    fn draft(name: &str) -> TestDraft {
        TestDraft::new(name, None, TestSettings::new(5, 60).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn import_into_unknown_test_fails() {
        let storage = Storage::in_memory();
        let err = import_service(&storage)
            .import_or_replace(TestId::new(9), "<question>Q\n<variant>A")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportServiceError::TestNotFound(id) if id == TestId::new(9)));
    }

    #[tokio::test]
    async fn bad_document_does_not_create_test() {
        let storage = Storage::in_memory();
        let err = import_service(&storage)
            .upsert_and_import(draft("Never"), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportServiceError::Parse(ImportError::EmptyDocument)));
        assert!(storage.tests.find_by_name("Never").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn report_counts_dropped_blocks() {
        let storage = Storage::in_memory();
        let report = import_service(&storage)
            .upsert_and_import(
                draft("Mixed"),
                "<question>Kept\n<variant>yes\n<question>No options here\n",
            )
            .await
            .unwrap();
        assert_eq!(report.questions_created, 1);
        assert_eq!(report.blocks_dropped, 1);
        assert_eq!(report.test.name(), "Mixed");
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let storage = Storage::in_memory();
        let test = storage.tests.create(draft("Files")).await.unwrap();
        let err = import_service(&storage)
            .import_file(test.id(), Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportServiceError::Unreadable { .. }));
    }
}
