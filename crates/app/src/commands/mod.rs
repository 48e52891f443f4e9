pub mod manage;
pub mod results;
pub mod take;

use anyhow::{Result, bail};
use quiz_core::model::{TestDefinition, TestId};
use services::AppServices;

/// Find a test by numeric id, falling back to an exact name match.
pub async fn resolve_test(app: &AppServices, reference: &str) -> Result<TestDefinition> {
    let tests = app.tests();
    if let Ok(id) = reference.parse::<TestId>() {
        if let Some(test) = tests.get(id).await? {
            return Ok(test);
        }
    }
    match tests.find_by_name(reference).await? {
        Some(test) => Ok(test),
        None => bail!("no test matches '{reference}'; use `quizmaster list` to see ids and names"),
    }
}

pub fn print_test_row(test: &TestDefinition) {
    println!(
        "{:>4}  {:<32}  {:>3} q  {:>5}s  {}",
        test.id().value(),
        test.name(),
        test.sample_size(),
        test.time_limit_secs(),
        test.description().unwrap_or("")
    );
}
