use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::TestId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestDefinitionError {
    #[error("test name cannot be empty")]
    EmptyName,

    #[error("number of questions per session must be at least 1")]
    InvalidSampleSize,

    #[error("time limit must be at least 1 second")]
    InvalidTimeLimit,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// How a session of this test is drawn and timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSettings {
    sample_size: u32,
    time_limit_secs: u32,
}

impl TestSettings {
    /// Creates validated settings.
    ///
    /// Zero is rejected for both values; there is no silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError::InvalidSampleSize` or
    /// `TestDefinitionError::InvalidTimeLimit` when a value is zero.
    pub fn new(sample_size: u32, time_limit_secs: u32) -> Result<Self, TestDefinitionError> {
        if sample_size == 0 {
            return Err(TestDefinitionError::InvalidSampleSize);
        }
        if time_limit_secs == 0 {
            return Err(TestDefinitionError::InvalidTimeLimit);
        }
        Ok(Self {
            sample_size,
            time_limit_secs,
        })
    }

    /// Number of questions a session draws from the pool.
    #[must_use]
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }
}

impl Default for TestSettings {
    /// Ten questions in five minutes.
    fn default() -> Self {
        Self {
            sample_size: 10,
            time_limit_secs: 300,
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Validated fields of a test that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDraft {
    name: String,
    description: Option<String>,
    settings: TestSettings,
}

impl TestDraft {
    /// Validates a name and description for a new or updated test.
    ///
    /// The name is trimmed; a blank description becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError::EmptyName` if the trimmed name is empty.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        settings: TestSettings,
    ) -> Result<Self, TestDefinitionError> {
        let name = normalize_name(name.into())?;
        Ok(Self {
            name,
            description: normalize_description(description),
            settings,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn settings(&self) -> TestSettings {
        self.settings
    }
}

//
// ─── TEST DEFINITION ───────────────────────────────────────────────────────────
//

/// A named, reusable quiz: question pool owner, sample size and time limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    id: TestId,
    name: String,
    description: Option<String>,
    settings: TestSettings,
}

impl TestDefinition {
    /// Build a test definition from persisted or freshly validated fields.
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError::EmptyName` if the trimmed name is empty.
    pub fn new(
        id: TestId,
        name: impl Into<String>,
        description: Option<String>,
        settings: TestSettings,
    ) -> Result<Self, TestDefinitionError> {
        let draft = TestDraft::new(name, description, settings)?;
        Ok(Self::from_draft(id, draft))
    }

    #[must_use]
    pub fn from_draft(id: TestId, draft: TestDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            settings: draft.settings,
        }
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn settings(&self) -> TestSettings {
        self.settings
    }

    #[must_use]
    pub fn sample_size(&self) -> u32 {
        self.settings.sample_size()
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.settings.time_limit_secs()
    }
}

fn normalize_name(name: String) -> Result<String, TestDefinitionError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TestDefinitionError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
}
