use quiz_core::import::ParsedQuestion;
use quiz_core::model::{Answer, NewAnswer, NewQuestion, Question, QuestionId, TestId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_answer_row, map_question_row, ser, u32_from_i64};
use super::table::{SqliteQuery, SqliteRecord, map_rows};
use crate::repository::{
    AnswerRepository, QuestionBankRepository, QuestionRepository, StorageError,
};

impl SqliteRecord for Question {
    const TABLE: &'static str = "questions";
    const COLUMNS: &'static str = "id, test_id, text";
    const INSERT_COLUMNS: &'static str = "test_id, text";
    const INSERT_PARAMS: &'static str = "?1, ?2";

    fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        map_question_row(row)
    }

    fn bind_new(
        query: SqliteQuery<'_>,
        fields: NewQuestion,
    ) -> Result<SqliteQuery<'_>, StorageError> {
        Ok(query
            .bind(id_to_i64("test_id", fields.test_id().value())?)
            .bind(fields.text().to_owned()))
    }
}

impl SqliteRecord for Answer {
    const TABLE: &'static str = "answers";
    const COLUMNS: &'static str = "id, question_id, text, is_correct";
    const INSERT_COLUMNS: &'static str = "question_id, text, is_correct";
    const INSERT_PARAMS: &'static str = "?1, ?2, ?3";

    fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        map_answer_row(row)
    }

    fn bind_new(query: SqliteQuery<'_>, fields: NewAnswer) -> Result<SqliteQuery<'_>, StorageError> {
        Ok(query
            .bind(id_to_i64("question_id", fields.question_id().value())?)
            .bind(fields.text().to_owned())
            .bind(i64::from(fields.is_correct())))
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn find_by_test(&self, test_id: TestId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, test_id, text
            FROM questions
            WHERE test_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("test_id", test_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        map_rows(&rows)
    }

    async fn count_by_test(&self, test_id: TestId) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions WHERE test_id = ?1")
            .bind(id_to_i64("test_id", test_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u32_from_i64("count", row.try_get::<i64, _>("n").map_err(ser)?)
    }
}

#[async_trait::async_trait]
impl AnswerRepository for SqliteRepository {
    async fn find_by_question(&self, question_id: QuestionId) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question_id, text, is_correct
            FROM answers
            WHERE question_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("question_id", question_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        map_rows(&rows)
    }
}

#[async_trait::async_trait]
impl QuestionBankRepository for SqliteRepository {
    async fn replace_questions(
        &self,
        test_id: TestId,
        questions: &[ParsedQuestion],
    ) -> Result<usize, StorageError> {
        let test_id = id_to_i64("test_id", test_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists = sqlx::query("SELECT 1 FROM tests WHERE id = ?1")
            .bind(test_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        // Answers go with their questions through the cascade.
        sqlx::query("DELETE FROM questions WHERE test_id = ?1")
            .bind(test_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for parsed in questions {
            let inserted = sqlx::query("INSERT INTO questions (test_id, text) VALUES (?1, ?2)")
                .bind(test_id)
                .bind(&parsed.text)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            let question_id = inserted.last_insert_rowid();

            for answer in &parsed.answers {
                sqlx::query(
                    "INSERT INTO answers (question_id, text, is_correct) VALUES (?1, ?2, ?3)",
                )
                .bind(question_id)
                .bind(&answer.text)
                .bind(i64::from(answer.is_correct))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(questions.len())
    }
}
