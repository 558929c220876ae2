// ==========================================
// 价格目录去重系统 - 规范记录仓储实现
// ==========================================
// 职责: 基于 SQLite 连接池实现 ProductStore
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::SqlitePool;
use crate::domain::product::{CanonicalRecord, MergeOutcome, NewRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::product_repo::ProductStore;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "id, article, brand, name, fingerprint";

fn map_record(row: &Row<'_>) -> rusqlite::Result<CanonicalRecord> {
    Ok(CanonicalRecord {
        id: row.get(0)?,
        article: row.get(1)?,
        brand: row.get(2)?,
        name: row.get(3)?,
        fingerprint: row.get(4)?,
    })
}

/// 事务内的 upsert：合并判定由 ON CONFLICT ... WHERE 完成，
/// 预读仅用于区分插入与更新
fn upsert_in_transaction(conn: &Connection, record: &NewRecord) -> RepositoryResult<MergeOutcome> {
    let prior: Option<i64> = conn
        .query_row(
            "SELECT id FROM products WHERE fingerprint = ?1",
            params![record.fingerprint],
            |row| row.get(0),
        )
        .optional()?;

    // RETURNING 仅在插入或实际更新时返回行
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO products (article, brand, name, fingerprint)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(fingerprint) DO UPDATE SET name = excluded.name
            WHERE length(excluded.name) > length(products.name)
        RETURNING id
        "#,
    )?;
    let returned: Option<i64> = stmt
        .query_row(
            params![record.article, record.brand, record.name, record.fingerprint],
            |row| row.get(0),
        )
        .optional()?;

    Ok(match (prior, returned) {
        (None, _) => MergeOutcome::Inserted,
        (Some(_), Some(_)) => MergeOutcome::Updated,
        (Some(_), None) => MergeOutcome::Unchanged,
    })
}

// ==========================================
// SqliteProductStore
// ==========================================
pub struct SqliteProductStore {
    pool: SqlitePool,
}

impl SqliteProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ProductStore for SqliteProductStore {
    fn find_by_fingerprint(&self, fingerprint: &str) -> RepositoryResult<Option<CanonicalRecord>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {} FROM products WHERE fingerprint = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![fingerprint], map_record)
            .optional()?;
        Ok(record)
    }

    fn find_by_article_brand(
        &self,
        article: &str,
        brand: &str,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM products WHERE article = ?1 AND brand = ?2 ORDER BY id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let records = stmt
            .query_map(params![article, brand], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn upsert_by_fingerprint(&self, record: &NewRecord) -> RepositoryResult<MergeOutcome> {
        let conn = self.pool.get()?;

        // IMMEDIATE: 预读与 upsert 之间不会插入其他写入方
        conn.execute_batch("BEGIN IMMEDIATE")?;
        match upsert_in_transaction(&conn, record) {
            Ok(outcome) => match conn.execute_batch("COMMIT") {
                Ok(()) => Ok(outcome),
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn create_if_absent(&self, record: &NewRecord) -> RepositoryResult<bool> {
        let conn = self.pool.get()?;

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM products WHERE fingerprint = ?1",
                params![record.fingerprint],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if exists {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO products (article, brand, name, fingerprint) VALUES (?1, ?2, ?3, ?4)",
            params![record.article, record.brand, record.name, record.fingerprint],
        )
        .map_err(RepositoryError::from)?;
        Ok(true)
    }

    fn update_name(&self, fingerprint: &str, name: &str) -> RepositoryResult<bool> {
        let conn = self.pool.get()?;
        let affected = conn.execute(
            "UPDATE products SET name = ?1 WHERE fingerprint = ?2",
            params![name, fingerprint],
        )?;
        Ok(affected > 0)
    }

    fn reset(&self) -> RepositoryResult<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            r#"
            DELETE FROM products;
            DELETE FROM sqlite_sequence WHERE name = 'products';
            "#,
        )?;
        Ok(())
    }

    fn count(&self) -> RepositoryResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn list_page(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<CanonicalRecord>> {
        if limit == 0 {
            return Err(RepositoryError::InvalidPage { limit });
        }
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM products ORDER BY id LIMIT ?1 OFFSET ?2",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let records = stmt
            .query_map(params![limit as i64, offset as i64], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
