use anyhow::{Result, bail};
use chrono::{DateTime, Local, TimeZone, Utc};
use quiz_core::model::TestResult;
use services::AppServices;

use super::resolve_test;

pub async fn execute(
    app: &AppServices,
    test: Option<&str>,
    examinee: Option<&str>,
) -> Result<()> {
    let results = match (test, examinee) {
        (Some(reference), _) => {
            let test = resolve_test(app, reference).await?;
            app.results().for_test(test.id()).await?
        }
        (None, Some(name)) => app.results().for_examinee(name).await?,
        (None, None) => bail!("pass --test or --examinee"),
    };

    if results.is_empty() {
        println!("No results recorded.");
    } else {
        println!("Completed times are local.");
    }
    for result in &results {
        print_result(result);
    }
    Ok(())
}

fn print_result(result: &TestResult) {
    println!(
        "{}  test {:>4}  {:<24} {:<8} {:>3}/{:<3} {:>5.1}%  {}s",
        completed_in(result.completed_at(), &Local),
        result.test_id().value(),
        result.examinee(),
        result.group().unwrap_or("-"),
        result.score(),
        result.max_score(),
        result.percent(),
        result.elapsed_secs()
    );
}

fn completed_in<Tz: TimeZone>(at: DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(zone).format("%Y-%m-%d %H:%M").to_string()
}
