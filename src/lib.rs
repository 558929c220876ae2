// ==========================================
// 价格目录去重系统 - 核心库
// ==========================================
// 职责: 多供应商价目表 → 归一化 → 指纹去重 → 合并 → SQL dump
// 技术栈: Rust + SQLite + calamine
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 归一化 / 指纹 / 冲突解析
pub mod engine;

// 导入层 - 外部价目表
pub mod importer;

// 导出层 - SQL dump
pub mod export;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化 / PRAGMA 统一 / 连接池）
pub mod db;

// 运行管线
pub mod pipeline;

// 日志系统
pub mod logging;

// 性能观测
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ColumnMapping, FileMapping, MergeStrategy, RunConfig};
pub use domain::{
    CanonicalRecord, FileReport, IngestReport, MergeOutcome, NewRecord, Resolution, SoftConflict,
};
pub use engine::{fingerprint, ConflictResolver, Fingerprint};
pub use export::CatalogExporter;
pub use importer::IngestionCoordinator;
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use repository::{ProductStore, SqliteProductStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "价格目录去重系统";
