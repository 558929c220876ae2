// ==========================================
// 价格目录去重系统 - SQLite 连接初始化与连接池
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA（WAL + busy_timeout），减少并发写入时的 busy 错误
// - 以 r2d2 连接池供所有导入 worker 共享（最大打开数/常驻空闲数/最长存活时间）
// ==========================================

use crate::config::PoolSettings;
use crate::repository::error::{RepositoryError, RepositoryResult};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;
use tracing::info;

/// 共享连接池
pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 规范记录表名
pub const PRODUCTS_TABLE: &str = "products";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - journal_mode 对文件库生效；内存库返回 "memory"，不视为错误
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    prepare_connection(&mut conn)?;
    Ok(conn)
}

/// 新连接的初始化钩子（独立连接与连接池共用）
fn prepare_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    configure_sqlite_connection(conn)?;
    crate::perf::install_sqlite_tracing(conn);
    Ok(())
}

/// 建表（幂等）
///
/// - fingerprint 唯一：每个指纹至多一条规范记录
/// - (article, brand) 仅建普通索引：用于漂移检测，不保证唯一
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            article     TEXT NOT NULL,
            brand       TEXT NOT NULL,
            name        TEXT NOT NULL,
            fingerprint TEXT NOT NULL UNIQUE
        );
        CREATE INDEX IF NOT EXISTS idx_products_article_brand
            ON products (article, brand);
        "#,
    )
}

// ==========================================
// 连接池
// ==========================================

/// 打开连接池
///
/// 先用独立连接验证数据库可达并建表：r2d2 在建连失败时会重试直到超时，
/// 启动期错误需要立即返回
///
/// # 参数
/// - max_open → max_size
/// - max_idle → min_idle（r2d2 只有常驻下限，不超过 max_open）
/// - max_lifetime_secs → max_lifetime（0 表示不限）
///
/// # 返回
/// - Err: 数据库不可达 / 建表失败（属于启动期致命错误）
pub fn open_pool(db_path: &str, settings: PoolSettings) -> RepositoryResult<SqlitePool> {
    let conn = open_sqlite_connection(db_path)
        .map_err(|e| RepositoryError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
    init_schema(&conn)?;
    drop(conn);

    let max_size = u32::try_from(settings.max_open.max(1)).unwrap_or(u32::MAX);
    let min_idle = u32::try_from(settings.max_idle)
        .unwrap_or(u32::MAX)
        .min(max_size);
    let max_lifetime =
        (settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs));

    let manager = SqliteConnectionManager::file(db_path).with_init(prepare_connection);
    let pool = r2d2::Pool::builder()
        .max_size(max_size)
        .min_idle(Some(min_idle))
        .max_lifetime(max_lifetime)
        .build(manager)?;

    info!(
        db_path = %db_path,
        max_open = max_size,
        min_idle,
        max_lifetime_secs = settings.max_lifetime_secs,
        "连接池已初始化"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn settings(max_open: usize, max_idle: usize) -> PoolSettings {
        PoolSettings {
            max_open,
            max_idle,
            max_lifetime_secs: 300,
        }
    }

    #[test]
    fn test_open_initializes_schema() {
        let temp = NamedTempFile::new().unwrap();
        let pool = open_pool(temp.path().to_str().unwrap(), settings(4, 2)).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='products'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_pool_settings_are_applied() {
        let temp = NamedTempFile::new().unwrap();
        let pool = open_pool(temp.path().to_str().unwrap(), settings(4, 2)).unwrap();

        assert_eq!(pool.max_size(), 4);
        assert_eq!(pool.min_idle(), Some(2));
        assert_eq!(pool.max_lifetime(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_idle_floor_never_exceeds_max_open() {
        let temp = NamedTempFile::new().unwrap();
        let pool = open_pool(
            temp.path().to_str().unwrap(),
            PoolSettings {
                max_open: 2,
                max_idle: 20,
                max_lifetime_secs: 0,
            },
        )
        .unwrap();

        assert_eq!(pool.min_idle(), Some(2));
        assert_eq!(pool.max_lifetime(), None);
    }

    #[test]
    fn test_pooled_connections_use_wal() {
        let temp = NamedTempFile::new().unwrap();
        let pool = open_pool(temp.path().to_str().unwrap(), settings(2, 1)).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        for conn in [&a, &b] {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap();
            assert_eq!(mode.to_lowercase(), "wal");
        }
    }

    #[test]
    fn test_unreachable_database_fails() {
        let result = open_pool("/nonexistent-dir/for/sure/db.sqlite", settings(1, 1));
        assert!(matches!(
            result,
            Err(RepositoryError::DatabaseConnectionError(_))
        ));
    }
}
