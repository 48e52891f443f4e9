use sqlx::SqlitePool;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, ser};
use crate::repository::{Page, RecordKind, RecordStore, StorageError};

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Table description for one record kind: where it lives and how rows map.
pub trait SqliteRecord: RecordKind {
    const TABLE: &'static str;
    /// Select list, always starting with `id`.
    const COLUMNS: &'static str;
    const INSERT_COLUMNS: &'static str;
    const INSERT_PARAMS: &'static str;

    fn from_row(row: &SqliteRow) -> Result<Self, StorageError>;

    /// Bind `fields` in `INSERT_COLUMNS` order.
    fn bind_new(query: SqliteQuery<'_>, fields: Self::New) -> Result<SqliteQuery<'_>, StorageError>;
}

pub(crate) fn bind_id<K: SqliteRecord>(id: K::Id) -> Result<i64, StorageError> {
    id_to_i64(K::KIND, K::id_to_u64(id))
}

pub(crate) async fn fetch_by_id<K: SqliteRecord>(
    pool: &SqlitePool,
    id: K::Id,
) -> Result<Option<K>, StorageError> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", K::COLUMNS, K::TABLE);
    let row = sqlx::query(&sql)
        .bind(bind_id::<K>(id)?)
        .fetch_optional(pool)
        .await
        .map_err(db_err)?;
    row.as_ref().map(K::from_row).transpose()
}

pub(crate) fn map_rows<K: SqliteRecord>(rows: &[SqliteRow]) -> Result<Vec<K>, StorageError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(K::from_row(row)?);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl<K: SqliteRecord> RecordStore<K> for SqliteRepository {
    async fn find_by_id(&self, id: K::Id) -> Result<Option<K>, StorageError> {
        fetch_by_id::<K>(&self.pool, id).await
    }

    async fn find_all(&self, page: Page) -> Result<Vec<K>, StorageError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id ASC LIMIT ?1 OFFSET ?2",
            K::COLUMNS,
            K::TABLE
        );
        // SQLite treats a negative LIMIT as "no limit".
        let limit = page.limit.map_or(-1, i64::from);
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_rows(&rows)
    }

    async fn create(&self, fields: K::New) -> Result<K, StorageError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            K::TABLE,
            K::INSERT_COLUMNS,
            K::INSERT_PARAMS
        );
        let res = K::bind_new(sqlx::query(&sql), fields)?
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let raw = u64::try_from(res.last_insert_rowid()).map_err(ser)?;
        fetch_by_id::<K>(&self.pool, K::id_from_u64(raw))
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn delete(&self, id: K::Id) -> Result<bool, StorageError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", K::TABLE);
        let res = sqlx::query(&sql)
            .bind(bind_id::<K>(id)?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}
