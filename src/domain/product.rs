// ==========================================
// 价格目录去重系统 - 商品领域模型
// ==========================================
// 职责: 定义规范记录、候选记录、原始行与合并结果
// 红线: 不含数据访问逻辑,不含归一化规则
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CanonicalRecord - 规范记录
// ==========================================
// 用途: 去重后的唯一商品记录（每个指纹至多一条）
// 对齐: products 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: i64,             // 存储层分配的自增 ID（清表后从 1 重新开始）
    pub article: String,     // 归一化后的货号
    pub brand: String,       // 归一化后的品牌
    pub name: String,        // 展示名称（仅 TRIM）
    pub fingerprint: String, // sha256(deep_clean(article) + deep_clean(brand)) 十六进制
}

// ==========================================
// NewRecord - 待写入的候选记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub article: String,
    pub brand: String,
    pub name: String,
    pub fingerprint: String,
}

// ==========================================
// PriceRow - 价目表原始行
// ==========================================
// 用途: 文件解析器按列映射抽取后的三元组（未归一化）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRow {
    pub sheet: String,     // 工作表名称（CSV 为文件名）
    pub row_number: usize, // 1-based 行号
    pub brand: String,
    pub article: String,
    pub name: String,
}

// ==========================================
// SoftConflict - 软冲突
// ==========================================
// 含义: 已存在 (article, brand) 相同但指纹不同的记录（归一化漂移）
// 处理: 仅记录日志并上报，不自动合并
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftConflict {
    pub existing_id: i64,
    pub existing_fingerprint: String,
    pub expected_fingerprint: String,
    pub article: String,
    pub brand: String,
}

// ==========================================
// MergeOutcome - 单行合并结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutcome {
    Inserted,  // 首次出现该指纹
    Updated,   // 新名称更长，已覆盖
    Unchanged, // 已有名称不短于新名称
}

// ==========================================
// Resolution - 冲突解析器的完整输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub fingerprint: String,
    pub outcome: MergeOutcome,
    pub soft_conflicts: Vec<SoftConflict>,
    /// 插入时撞上唯一约束（并发竞争）并已恢复
    pub race_recovered: bool,
}
