//! Shared error types for the services crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use quiz_core::import::ImportError;
use quiz_core::model::{ResultError, TestDefinitionError, TestId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `TestService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestServiceError {
    #[error(transparent)]
    Test(#[from] TestDefinitionError),
    #[error("no test with id {0}")]
    NotFound(TestId),
    #[error("a test named '{0}' already exists")]
    NameTaken(String),
    #[error("could not load tests: {0}")]
    Load(#[source] StorageError),
    #[error("could not save the test: {0}")]
    Save(#[source] StorageError),
    #[error("could not delete the test: {0}")]
    Delete(#[source] StorageError),
}

/// Errors emitted by `ImportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportServiceError {
    #[error(transparent)]
    Parse(#[from] ImportError),
    #[error("no test with id {0}; create the test before importing questions")]
    TestNotFound(TestId),
    #[error("could not read question file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Test(#[from] TestServiceError),
    #[error("could not look up the test to import into: {0}")]
    LoadTest(#[source] StorageError),
    #[error("could not replace the test's questions: {0}")]
    ReplaceQuestions(#[source] StorageError),
}

/// Errors emitted by the session engine and its launcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no test with id {0}")]
    TestNotFound(TestId),
    #[error("this test has no questions yet; import questions first")]
    NoQuestions,
    #[error("none of the drawn questions has answer options")]
    NoAnsweredQuestions,
    #[error("examinee name must not be empty")]
    EmptyExaminee,
    #[error("the session is no longer in progress")]
    NotInProgress,
    /// `index` is zero-based; the message counts options from one.
    #[error("option {} does not exist; this question has {available} options", .index + 1)]
    InvalidOption { index: usize, available: usize },
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error("could not look up the test: {0}")]
    LoadTest(#[source] StorageError),
    #[error("could not load the test's questions: {0}")]
    LoadQuestions(#[source] StorageError),
    #[error("test {0} was deleted during the session; your result could not be saved")]
    TestDeleted(TestId),
    #[error("could not save your result: {0}")]
    SaveResult(#[source] StorageError),
}

/// Errors emitted by `ResultService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultServiceError {
    #[error("could not load results: {0}")]
    Load(#[source] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("could not open the database: {0}")]
    Sqlite(#[from] SqliteInitError),
}
