// ==========================================
// 价格目录去重系统 - 领域模型层
// ==========================================
// 职责: 定义规范记录、候选记录、合并结果与导入报告
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod product;
pub mod report;

// 重导出核心类型
pub use product::{
    CanonicalRecord, MergeOutcome, NewRecord, PriceRow, Resolution, SoftConflict,
};
pub use report::{FileReport, IngestReport};
