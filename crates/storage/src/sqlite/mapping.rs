use quiz_core::model::{
    Answer, AnswerId, Question, QuestionId, ResultId, TestDefinition, TestId, TestResult,
    TestSettings,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors onto the storage taxonomy.
///
/// Unique violations become `Conflict`; a dangling foreign key means the
/// referenced parent row is gone, which callers see as `NotFound`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn raw_id_from_row(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    i64_to_u64(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

pub(crate) fn map_test_row(row: &SqliteRow) -> Result<TestDefinition, StorageError> {
    let settings = TestSettings::new(
        u32_from_i64("sample_size", row.try_get::<i64, _>("sample_size").map_err(ser)?)?,
        u32_from_i64(
            "time_limit_secs",
            row.try_get::<i64, _>("time_limit_secs").map_err(ser)?,
        )?,
    )
    .map_err(ser)?;

    TestDefinition::new(
        TestId::new(raw_id_from_row(row, "id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        settings,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Ok(Question {
        id: QuestionId::new(raw_id_from_row(row, "id")?),
        test_id: TestId::new(raw_id_from_row(row, "test_id")?),
        text: row.try_get("text").map_err(ser)?,
    })
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    Ok(Answer {
        id: AnswerId::new(raw_id_from_row(row, "id")?),
        question_id: QuestionId::new(raw_id_from_row(row, "question_id")?),
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
    })
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<TestResult, StorageError> {
    TestResult::from_persisted(
        ResultId::new(raw_id_from_row(row, "id")?),
        TestId::new(raw_id_from_row(row, "test_id")?),
        row.try_get("examinee").map_err(ser)?,
        row.try_get("group_name").map_err(ser)?,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64("max_score", row.try_get::<i64, _>("max_score").map_err(ser)?)?,
        u32_from_i64(
            "elapsed_secs",
            row.try_get::<i64, _>("elapsed_secs").map_err(ser)?,
        )?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}
