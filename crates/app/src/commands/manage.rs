//! Test maintenance commands: save, import, list, search, rename, delete.

use std::path::Path;

use anyhow::{Result, bail};
use quiz_core::model::{TestDraft, TestSettings};
use services::AppServices;
use storage::Page;

use super::{print_test_row, resolve_test};

pub struct TestFields {
    pub name: String,
    pub description: Option<String>,
    pub sample_size: u32,
    pub time_limit: u32,
}

impl TestFields {
    fn into_draft(self) -> Result<TestDraft> {
        let settings = TestSettings::new(self.sample_size, self.time_limit)?;
        Ok(TestDraft::new(self.name, self.description, settings)?)
    }
}

pub async fn save(app: &AppServices, fields: TestFields) -> Result<()> {
    let test = app.tests().save(fields.into_draft()?).await?;
    println!("Saved test {} '{}'.", test.id(), test.name());
    Ok(())
}

/// Import into an existing test (`target`) or upsert the test described by `fields`.
pub async fn import(
    app: &AppServices,
    file: &Path,
    target: Option<&str>,
    fields: Option<TestFields>,
) -> Result<()> {
    let imports = app.imports();
    match (target, fields) {
        (Some(reference), _) => {
            let test = resolve_test(app, reference).await?;
            let created = imports.import_file(test.id(), file).await?;
            println!("Imported {created} question(s) into '{}'.", test.name());
        }
        (None, Some(fields)) => {
            let report = imports
                .upsert_and_import_file(fields.into_draft()?, file)
                .await?;
            println!(
                "Imported {} question(s) into test {} '{}'.",
                report.questions_created,
                report.test.id(),
                report.test.name()
            );
            if report.blocks_dropped > 0 {
                println!(
                    "Skipped {} block(s) without answer options.",
                    report.blocks_dropped
                );
            }
        }
        (None, None) => bail!("pass --test to import into an existing test, or --name to create one"),
    }
    Ok(())
}

pub async fn list(app: &AppServices, limit: Option<u32>, offset: u32) -> Result<()> {
    let tests = app.tests().list(Page { limit, offset }).await?;
    if tests.is_empty() {
        println!("No tests yet. Create one with `quizmaster save` or `quizmaster import`.");
    }
    for test in &tests {
        print_test_row(test);
    }
    Ok(())
}

pub async fn search(app: &AppServices, query: &str, limit: u32) -> Result<()> {
    let found = app.tests().search(query, limit).await?;
    if found.is_empty() {
        println!("No tests match '{query}'.");
    }
    for test in &found {
        print_test_row(test);
    }
    Ok(())
}

pub async fn rename(app: &AppServices, reference: &str, new_name: &str) -> Result<()> {
    let test = resolve_test(app, reference).await?;
    let renamed = app.tests().rename(test.id(), new_name).await?;
    println!("Renamed '{}' to '{}'.", test.name(), renamed.name());
    Ok(())
}

pub async fn delete(app: &AppServices, reference: &str) -> Result<()> {
    let test = resolve_test(app, reference).await?;
    if app.tests().delete(test.id()).await? {
        println!(
            "Deleted '{}' with its questions and results.",
            test.name()
        );
    }
    Ok(())
}
