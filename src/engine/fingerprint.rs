// ==========================================
// 价格目录去重系统 - 内容指纹
// ==========================================
// 算法: sha256(deep_clean(article) + deep_clean(brand)) → 小写十六进制
// 注意: 两段直接拼接、无分隔符（"ab"+"c" 与 "a"+"bc" 碰撞），
//       改动会使全部历史指纹失效，因此保留
// ==========================================

use crate::engine::normalizer::deep_clean;
use sha2::{Digest, Sha256};
use std::fmt;

/// 指纹长度（十六进制字符数）
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// 定长内容指纹（64 位小写十六进制）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 按摘要前 8 字节映射到分片（与平台字节序无关）
    pub fn shard(&self, shards: usize) -> usize {
        if shards <= 1 {
            return 0;
        }
        let prefix = &self.0[..16];
        let value = u64::from_str_radix(prefix, 16).unwrap_or(0);
        (value % shards as u64) as usize
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 计算 (article, brand) 的内容指纹
pub fn fingerprint(article: &str, brand: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(deep_clean(article).as_bytes());
    hasher.update(deep_clean(brand).as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}
