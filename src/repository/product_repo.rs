// ==========================================
// 价格目录去重系统 - 规范记录仓储 Trait
// ==========================================
// 职责: 定义规范记录的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含合并决策，只做数据 CRUD
// ==========================================

use crate::domain::product::{CanonicalRecord, MergeOutcome, NewRecord};
use crate::repository::error::RepositoryResult;

// ==========================================
// ProductStore Trait
// ==========================================
// 用途: 冲突解析器 / 导出器访问存储
// 实现者: SqliteProductStore（使用 rusqlite）
// 并发: 所有方法为阻塞调用，可被多个 worker 同时调用
pub trait ProductStore: Send + Sync {
    // ===== 查询 =====

    /// 按指纹查询规范记录
    fn find_by_fingerprint(&self, fingerprint: &str) -> RepositoryResult<Option<CanonicalRecord>>;

    /// 按归一化后的 (article, brand) 查询
    ///
    /// 仅用于漂移检测与日志，不参与正确性决策
    fn find_by_article_brand(
        &self,
        article: &str,
        brand: &str,
    ) -> RepositoryResult<Vec<CanonicalRecord>>;

    // ===== 单语句原子合并 =====

    /// 按指纹插入或更新（单条 SQL，原子）
    ///
    /// # 返回
    /// - Inserted: 指纹不存在，已插入
    /// - Updated: 指纹存在且新名称更长，仅更新 name
    /// - Unchanged: 指纹存在且已有名称不短于新名称
    ///
    /// # 说明
    /// - article / brand / id 永不被改写
    /// - 唯一约束冲突在语句内部消化，不会以错误形式浮出
    fn upsert_by_fingerprint(&self, record: &NewRecord) -> RepositoryResult<MergeOutcome>;

    // ===== 两步协议（调用方需持有该指纹的独占锁）=====

    /// 指纹不存在时插入
    ///
    /// # 返回
    /// - Ok(true): 已插入
    /// - Ok(false): 记录已存在（未改动）
    /// - Err(UniqueConstraintViolation): 并发竞争下的唯一约束冲突
    fn create_if_absent(&self, record: &NewRecord) -> RepositoryResult<bool>;

    /// 将指纹对应记录的 name 改为给定值
    ///
    /// # 返回
    /// - Ok(true): 已更新；Ok(false): 指纹不存在
    fn update_name(&self, fingerprint: &str, name: &str) -> RepositoryResult<bool>;

    // ===== 运维 / 导出 =====

    /// 清空整表（仅在运行开始前调用）
    fn reset(&self) -> RepositoryResult<()>;

    /// 记录总数
    fn count(&self) -> RepositoryResult<usize>;

    /// 按 id 升序分页读取
    fn list_page(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<CanonicalRecord>>;
}
