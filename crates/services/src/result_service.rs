use std::sync::Arc;

use quiz_core::model::{TestId, TestResult};
use storage::repository::ResultRepository;

use crate::error::ResultServiceError;

/// Read-only access to recorded results.
#[derive(Clone)]
pub struct ResultService {
    results: Arc<dyn ResultRepository>,
}

impl ResultService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Results of a test, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::Load` if repository access fails.
    pub async fn for_test(&self, test_id: TestId) -> Result<Vec<TestResult>, ResultServiceError> {
        self.results
            .find_by_test(test_id)
            .await
            .map_err(ResultServiceError::Load)
    }

    /// Results of one examinee across all tests, newest first.
    ///
    /// Surrounding whitespace in `examinee` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::Load` if repository access fails.
    pub async fn for_examinee(
        &self,
        examinee: &str,
    ) -> Result<Vec<TestResult>, ResultServiceError> {
        self.results
            .find_by_examinee(examinee.trim())
            .await
            .map_err(ResultServiceError::Load)
    }
}
