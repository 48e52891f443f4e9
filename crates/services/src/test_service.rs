use std::sync::Arc;

use quiz_core::model::{TestDefinition, TestDraft, TestId};
use storage::repository::{Page, StorageError, TestRepository};

use crate::error::TestServiceError;

/// Orchestrates test definition creation, lookup and maintenance.
#[derive(Clone)]
pub struct TestService {
    tests: Arc<dyn TestRepository>,
}

impl TestService {
    #[must_use]
    pub fn new(tests: Arc<dyn TestRepository>) -> Self {
        Self { tests }
    }

    /// Create the test, or update the one that already carries this name.
    ///
    /// Only description, sample size and time limit change on update.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Load` if the name lookup fails and
    /// `TestServiceError::Save` if the write fails.
    pub async fn save(&self, draft: TestDraft) -> Result<TestDefinition, TestServiceError> {
        let existing = self
            .tests
            .find_by_name(draft.name())
            .await
            .map_err(TestServiceError::Load)?;
        let saved = match existing {
            Some(existing) => self.tests.update(existing.id(), draft).await,
            None => self.tests.create(draft).await,
        };
        saved.map_err(|e| name_conflict(e, None))
    }

    /// Fetch a test by id.
    ///
    /// Returns `Ok(None)` when the test does not exist.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Load` if repository access fails.
    pub async fn get(&self, id: TestId) -> Result<Option<TestDefinition>, TestServiceError> {
        self.tests
            .find_by_id(id)
            .await
            .map_err(TestServiceError::Load)
    }

    /// # Errors
    ///
    /// Returns `TestServiceError::Load` if repository access fails.
    pub async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<TestDefinition>, TestServiceError> {
        self.tests
            .find_by_name(name.trim())
            .await
            .map_err(TestServiceError::Load)
    }

    /// List tests in creation order.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Load` if repository access fails.
    pub async fn list(&self, page: Page) -> Result<Vec<TestDefinition>, TestServiceError> {
        self.tests
            .find_all(page)
            .await
            .map_err(TestServiceError::Load)
    }

    /// Tests whose name or description contains `query`, ordered by name.
    ///
    /// Surrounding whitespace in `query` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Load` if repository access fails.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<TestDefinition>, TestServiceError> {
        self.tests
            .search(query.trim(), limit)
            .await
            .map_err(TestServiceError::Load)
    }

    /// Rename a test while preserving its description and settings.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Test` for an empty name,
    /// `TestServiceError::NameTaken` if another test already uses it and
    /// `TestServiceError::NotFound` for an unknown id.
    pub async fn rename(
        &self,
        id: TestId,
        new_name: &str,
    ) -> Result<TestDefinition, TestServiceError> {
        let test = self
            .tests
            .find_by_id(id)
            .await
            .map_err(TestServiceError::Load)?
            .ok_or(TestServiceError::NotFound(id))?;

        let draft = TestDraft::new(
            new_name,
            test.description().map(str::to_owned),
            test.settings(),
        )?;
        let name = draft.name().to_owned();
        self.tests.update(id, draft).await.map_err(|e| match e {
            StorageError::NotFound => TestServiceError::NotFound(id),
            other => name_conflict(other, Some(name)),
        })
    }

    /// Delete a test together with its questions, answers and results.
    ///
    /// Returns whether the test existed.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Delete` if repository access fails.
    pub async fn delete(&self, id: TestId) -> Result<bool, TestServiceError> {
        let removed = self
            .tests
            .delete(id)
            .await
            .map_err(TestServiceError::Delete)?;
        if removed {
            tracing::info!("deleted test {id} and everything it owned");
        }
        Ok(removed)
    }
}

fn name_conflict(err: StorageError, name: Option<String>) -> TestServiceError {
    match err {
        StorageError::Conflict(msg) => TestServiceError::NameTaken(name.unwrap_or(msg)),
        other => TestServiceError::Save(other),
    }
}
