use quiz_core::model::{ResultDraft, TestId, TestResult};
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_result_row};
use super::table::{SqliteQuery, SqliteRecord, map_rows};
use crate::repository::{ResultRepository, StorageError};

const RESULT_COLUMNS: &str =
    "id, test_id, examinee, group_name, score, max_score, elapsed_secs, completed_at";

impl SqliteRecord for TestResult {
    const TABLE: &'static str = "results";
    const COLUMNS: &'static str = RESULT_COLUMNS;
    const INSERT_COLUMNS: &'static str =
        "test_id, examinee, group_name, score, max_score, elapsed_secs, completed_at";
    const INSERT_PARAMS: &'static str = "?1, ?2, ?3, ?4, ?5, ?6, ?7";

    fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        map_result_row(row)
    }

    fn bind_new(
        query: SqliteQuery<'_>,
        fields: ResultDraft,
    ) -> Result<SqliteQuery<'_>, StorageError> {
        Ok(query
            .bind(id_to_i64("test_id", fields.test_id().value())?)
            .bind(fields.examinee().to_owned())
            .bind(fields.group().map(str::to_owned))
            .bind(i64::from(fields.score()))
            .bind(i64::from(fields.max_score()))
            .bind(i64::from(fields.elapsed_secs()))
            .bind(fields.completed_at()))
    }
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<TestResult>, StorageError> {
        let sql = format!(
            r"
            SELECT {RESULT_COLUMNS}
            FROM results
            WHERE test_id = ?1
            ORDER BY completed_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("test_id", test_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_rows(&rows)
    }

    async fn find_by_examinee(&self, examinee: &str) -> Result<Vec<TestResult>, StorageError> {
        let sql = format!(
            r"
            SELECT {RESULT_COLUMNS}
            FROM results
            WHERE examinee = ?1
            ORDER BY completed_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(examinee)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_rows(&rows)
    }
}
