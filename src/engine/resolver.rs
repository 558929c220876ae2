// ==========================================
// 价格目录去重系统 - 冲突解析器
// ==========================================
// 职责: 对单个 (article, brand, name) 三元组决定存储变更
// 流程: 归一化 → 指纹 → 按指纹查询 → 漂移检测 → 决策 → 写入
// ==========================================
// 合并规则（"最完整者胜"）:
// - 指纹不存在 → 插入
// - 新名称字符数严格更长 → 更新 name
// - 否则（含等长）→ 保留已有记录
// ==========================================

use crate::config::MergeStrategy;
use crate::domain::product::{MergeOutcome, NewRecord, Resolution, SoftConflict};
use crate::engine::fingerprint::{fingerprint, Fingerprint};
use crate::engine::keyed_lock::KeyedLock;
use crate::engine::normalizer::{normalize_article, normalize_brand, normalize_name};
use crate::repository::{ProductStore, RepositoryResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// 纯决策：给定已有名称（若有）与新名称，决定变更
pub fn decide(existing_name: Option<&str>, new_name: &str) -> MergeOutcome {
    match existing_name {
        None => MergeOutcome::Inserted,
        Some(existing) if new_name.chars().count() > existing.chars().count() => {
            MergeOutcome::Updated
        }
        Some(_) => MergeOutcome::Unchanged,
    }
}

/// 由原始三元组构造候选记录（归一化 + 指纹）
pub fn candidate(raw_article: &str, raw_brand: &str, raw_name: &str) -> (NewRecord, Fingerprint) {
    let article = normalize_article(raw_article);
    let brand = normalize_brand(raw_brand);
    let name = normalize_name(raw_name);
    let fp = fingerprint(&article, &brand);
    let record = NewRecord {
        article,
        brand,
        name,
        fingerprint: fp.as_str().to_string(),
    };
    (record, fp)
}

// ==========================================
// ConflictResolver
// ==========================================
pub struct ConflictResolver {
    store: Arc<dyn ProductStore>,
    strategy: MergeStrategy,
    locks: KeyedLock,
}

impl ConflictResolver {
    /// 创建解析器
    ///
    /// # 参数
    /// - store: 共享存储
    /// - strategy: Atomic 使用单语句 upsert；Locked 使用两步协议 + 分片锁
    /// - lock_shards: Locked 模式下的分片数（1 = 全局锁）
    pub fn new(store: Arc<dyn ProductStore>, strategy: MergeStrategy, lock_shards: usize) -> Self {
        Self {
            store,
            strategy,
            locks: KeyedLock::new(lock_shards),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    /// 解析一行原始数据并写入存储
    pub fn resolve(
        &self,
        raw_article: &str,
        raw_brand: &str,
        raw_name: &str,
    ) -> RepositoryResult<Resolution> {
        let (record, fp) = candidate(raw_article, raw_brand, raw_name);
        self.resolve_record(record, &fp)
    }

    /// 对已归一化的候选记录执行解析
    pub fn resolve_record(&self, record: NewRecord, fp: &Fingerprint) -> RepositoryResult<Resolution> {
        match self.strategy {
            MergeStrategy::Atomic => self.resolve_atomic(record, fp),
            MergeStrategy::Locked => {
                let _guard = self.locks.lock(fp);
                self.resolve_locked(record, fp)
            }
        }
    }

    // ===== Atomic：判定交给存储层单语句 =====
    fn resolve_atomic(&self, record: NewRecord, fp: &Fingerprint) -> RepositoryResult<Resolution> {
        let existing = self.store.find_by_fingerprint(fp.as_str())?;

        let soft_conflicts = match existing {
            None => self.detect_drift(&record)?,
            Some(_) => Vec::new(),
        };

        // 预判只用于跳过必然无效的写入；权威结果以 upsert 返回值为准
        let outcome = match decide(existing.as_ref().map(|r| r.name.as_str()), &record.name) {
            MergeOutcome::Unchanged => MergeOutcome::Unchanged,
            _ => self.store.upsert_by_fingerprint(&record)?,
        };

        debug!(fingerprint = %fp, ?outcome, "行解析完成");
        Ok(Resolution {
            fingerprint: record.fingerprint,
            outcome,
            soft_conflicts,
            race_recovered: false,
        })
    }

    // ===== Locked：调用方已持有该指纹分片锁 =====
    fn resolve_locked(&self, record: NewRecord, fp: &Fingerprint) -> RepositoryResult<Resolution> {
        let existing = self.store.find_by_fingerprint(fp.as_str())?;
        let mut race_recovered = false;

        let (outcome, soft_conflicts) = match existing {
            None => {
                let soft_conflicts = self.detect_drift(&record)?;
                match self.store.create_if_absent(&record) {
                    Ok(true) => (MergeOutcome::Inserted, soft_conflicts),
                    Ok(false) => (self.merge_into_existing(&record, fp)?, soft_conflicts),
                    Err(e) if e.is_unique_violation() => {
                        // 其他写入方（非本进程锁覆盖）抢先插入：读回胜者后按规则合并
                        warn!(
                            fingerprint = %fp,
                            error = %e,
                            "插入时唯一约束冲突，按已有记录合并"
                        );
                        race_recovered = true;
                        (self.merge_into_existing(&record, fp)?, soft_conflicts)
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(current) => match decide(Some(&current.name), &record.name) {
                MergeOutcome::Updated => {
                    self.store.update_name(fp.as_str(), &record.name)?;
                    (MergeOutcome::Updated, Vec::new())
                }
                other => (other, Vec::new()),
            },
        };

        debug!(fingerprint = %fp, ?outcome, race_recovered, "行解析完成");
        Ok(Resolution {
            fingerprint: record.fingerprint,
            outcome,
            soft_conflicts,
            race_recovered,
        })
    }

    fn merge_into_existing(&self, record: &NewRecord, fp: &Fingerprint) -> RepositoryResult<MergeOutcome> {
        let current = self.store.find_by_fingerprint(fp.as_str())?;
        match decide(current.as_ref().map(|r| r.name.as_str()), &record.name) {
            MergeOutcome::Updated => {
                self.store.update_name(fp.as_str(), &record.name)?;
                Ok(MergeOutcome::Updated)
            }
            MergeOutcome::Inserted => {
                // 读回仍为空：记录在两次查询之间消失，只能再次尝试插入
                let inserted = self.store.create_if_absent(record)?;
                Ok(if inserted {
                    MergeOutcome::Inserted
                } else {
                    MergeOutcome::Unchanged
                })
            }
            MergeOutcome::Unchanged => Ok(MergeOutcome::Unchanged),
        }
    }

    /// 归一化漂移检测：同 (article, brand) 但指纹不同的已有记录
    fn detect_drift(&self, record: &NewRecord) -> RepositoryResult<Vec<SoftConflict>> {
        let conflicts: Vec<SoftConflict> = self
            .store
            .find_by_article_brand(&record.article, &record.brand)?
            .into_iter()
            .filter(|existing| existing.fingerprint != record.fingerprint)
            .map(|existing| SoftConflict {
                existing_id: existing.id,
                existing_fingerprint: existing.fingerprint,
                expected_fingerprint: record.fingerprint.clone(),
                article: record.article.clone(),
                brand: record.brand.clone(),
            })
            .collect();

        for conflict in &conflicts {
            warn!(
                id = conflict.existing_id,
                hash = %conflict.existing_fingerprint,
                expected_hash = %conflict.expected_fingerprint,
                article = %conflict.article,
                brand = %conflict.brand,
                "发现 article/brand 相同但指纹不同的记录"
            );
        }
        Ok(conflicts)
    }
}
