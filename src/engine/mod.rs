// ==========================================
// 价格目录去重系统 - 去重合并引擎
// ==========================================
// 职责: 归一化规则、内容指纹、按指纹互斥、冲突解析
// 红线: 引擎不感知文件格式,不直接拼接 SQL
// ==========================================

pub mod fingerprint;
pub mod keyed_lock;
pub mod normalizer;
pub mod resolver;

// 重导出核心类型
pub use fingerprint::{fingerprint, Fingerprint, FINGERPRINT_HEX_LEN};
pub use keyed_lock::KeyedLock;
pub use normalizer::{deep_clean, normalize_article, normalize_brand, normalize_name};
pub use resolver::{candidate, decide, ConflictResolver};
