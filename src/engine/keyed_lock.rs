// ==========================================
// 价格目录去重系统 - 按指纹分片的互斥锁
// ==========================================
// 约束: 同一指纹的「查询 → 决策 → 写入」在同一分片锁内完成；
//       不同分片互不阻塞；锁从不嵌套
// 说明: shards = 1 时退化为全局锁
// ==========================================

use crate::engine::fingerprint::Fingerprint;
use std::sync::{Mutex, MutexGuard};

pub struct KeyedLock {
    shards: Vec<Mutex<()>>,
}

impl KeyedLock {
    /// 创建分片锁（shards 至少为 1）
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(())).collect(),
        }
    }

    /// 全局锁（单分片）
    pub fn global() -> Self {
        Self::new(1)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// 获取指纹所在分片的独占访问
    ///
    /// 持锁线程 panic 导致的中毒会被忽略：锁内不维护共享数据，
    /// 真实状态始终以存储层为准
    pub fn lock(&self, fingerprint: &Fingerprint) -> MutexGuard<'_, ()> {
        let idx = fingerprint.shard(self.shards.len());
        self.shards[idx]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
