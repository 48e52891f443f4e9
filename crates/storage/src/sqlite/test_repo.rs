use quiz_core::model::{TestDefinition, TestDraft, TestId};
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_test_row};
use super::table::{SqliteQuery, SqliteRecord, fetch_by_id, map_rows};
use crate::repository::{StorageError, TestRepository};

const TEST_COLUMNS: &str = "id, name, description, sample_size, time_limit_secs";

impl SqliteRecord for TestDefinition {
    const TABLE: &'static str = "tests";
    const COLUMNS: &'static str = TEST_COLUMNS;
    const INSERT_COLUMNS: &'static str = "name, description, sample_size, time_limit_secs";
    const INSERT_PARAMS: &'static str = "?1, ?2, ?3, ?4";

    fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        map_test_row(row)
    }

    fn bind_new(query: SqliteQuery<'_>, fields: TestDraft) -> Result<SqliteQuery<'_>, StorageError> {
        let settings = fields.settings();
        Ok(query
            .bind(fields.name().to_owned())
            .bind(fields.description().map(str::to_owned))
            .bind(i64::from(settings.sample_size()))
            .bind(i64::from(settings.time_limit_secs())))
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait::async_trait]
impl TestRepository for SqliteRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<TestDefinition>, StorageError> {
        let sql = format!("SELECT {TEST_COLUMNS} FROM tests WHERE name = ?1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(map_test_row).transpose()
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<TestDefinition>, StorageError> {
        let sql = format!(
            r"
            SELECT {TEST_COLUMNS}
            FROM tests
            WHERE name LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\'
            ORDER BY name ASC
            LIMIT ?2
            "
        );
        let rows = sqlx::query(&sql)
            .bind(like_pattern(query))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_rows(&rows)
    }

    async fn update(&self, id: TestId, draft: TestDraft) -> Result<TestDefinition, StorageError> {
        let settings = draft.settings();
        let res = sqlx::query(
            r"
            UPDATE tests
            SET name = ?1, description = ?2, sample_size = ?3, time_limit_secs = ?4
            WHERE id = ?5
            ",
        )
        .bind(draft.name())
        .bind(draft.description())
        .bind(i64::from(settings.sample_size()))
        .bind(i64::from(settings.time_limit_secs()))
        .bind(id_to_i64("test_id", id.value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        fetch_by_id::<TestDefinition>(&self.pool, id)
            .await?
            .ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("math"), "%math%");
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
