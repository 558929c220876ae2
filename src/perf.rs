// ==========================================
// 价格目录去重系统 - 性能观测
// ==========================================
// - StageTimer: 阶段耗时 Guard（drop 时输出 elapsed_ms）
// - 慢 SQL 日志: 连接级 profile 回调
// ==========================================
// 开关（环境变量）:
// - PRICE_DEDUP_SLOW_SQL_MS=50   慢 SQL 阈值（毫秒），0 或未设置表示关闭
// ==========================================

use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

fn truncate_sql(sql: &str, max_chars: usize) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}…", head)
}

/// 为连接安装慢 SQL 日志（阈值取自环境变量）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let threshold = std::env::var("PRICE_DEDUP_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    SLOW_SQL_THRESHOLD_MS.store(threshold, Ordering::Relaxed);

    if threshold == 0 {
        conn.profile(None);
        return;
    }
    conn.profile(Some(sql_profile_callback));
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %truncate_sql(sql, 240),
            "slow sql"
        );
    }
}

/// 阶段耗时 Guard
///
/// ```ignore
/// let _perf = price_dedup::perf::StageTimer::new("export");
/// ```
pub struct StageTimer {
    op: &'static str,
    start: Instant,
}

impl StageTimer {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "done"
        );
    }
}
