// ==========================================
// 价格目录去重系统 - 配置层
// ==========================================
// 职责: 运行配置加载与校验、按文件名提供列映射
// 存储: config.json
// ==========================================

pub mod mapping_reader;
pub mod run_config;

// 重导出核心配置
pub use mapping_reader::{ColumnMapping, ColumnMappingReader, FileMapping};
pub use run_config::{
    ConfigError, FileConfig, MergeStrategy, PoolSettings, RunConfig, DEFAULT_LOCK_SHARDS,
    DEFAULT_PAGE_SIZE,
};
