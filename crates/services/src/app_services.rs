use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::import_service::ImportService;
use crate::result_service::ResultService;
use crate::sessions::SessionLauncher;
use crate::test_service::TestService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    tests: Arc<TestService>,
    imports: Arc<ImportService>,
    results: Arc<ResultService>,
    sessions: Arc<SessionLauncher>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let tests = Arc::new(TestService::new(Arc::clone(&storage.tests)));
        let imports = Arc::new(ImportService::new(
            Arc::clone(&storage.tests),
            Arc::clone(&storage.question_bank),
        ));
        let results = Arc::new(ResultService::new(Arc::clone(&storage.results)));
        let sessions = Arc::new(SessionLauncher::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.results),
        ));

        Self {
            tests,
            imports,
            results,
            sessions,
        }
    }

    /// Replace the session launcher with one that shuffles from a fixed seed.
    #[must_use]
    pub fn with_session_seed(mut self, seed: u64) -> Self {
        self.sessions = Arc::new(self.sessions.as_ref().clone().with_seed(seed));
        self
    }

    #[must_use]
    pub fn tests(&self) -> Arc<TestService> {
        Arc::clone(&self.tests)
    }

    #[must_use]
    pub fn imports(&self) -> Arc<ImportService> {
        Arc::clone(&self.imports)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionLauncher> {
        Arc::clone(&self.sessions)
    }
}
