// ==========================================
// 价格目录去重系统 - 运行配置
// ==========================================
// 存储: config.json（serde_json 反序列化）
// 形态: {"files": [{"filename": "...", "columns": {"brand": 0, "article": 1, "name": 2}}], ...}
// 说明: 除 files 外的键均可省略，取默认值
// ==========================================

use crate::config::mapping_reader::{ColumnMapping, ColumnMappingReader, FileMapping};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 导出分页大小默认值
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// 分片锁默认分片数
pub const DEFAULT_LOCK_SHARDS: usize = 64;

// ==========================================
// ConfigError - 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("配置值无效 (key: {key}): {message}")]
    Invalid { key: String, message: String },
}

// ==========================================
// MergeStrategy - 写入协议
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// 单语句 upsert，无应用层锁
    #[default]
    Atomic,
    /// 查询 + 插入/更新两步，按指纹分片加锁
    Locked,
}

// ==========================================
// PoolSettings - 连接池参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_open: usize,
    pub max_idle: usize,
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: 50,
            max_idle: 20,
            max_lifetime_secs: 300,
        }
    }
}

// ==========================================
// FileConfig - 单文件配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub filename: String,
    pub columns: ColumnMapping,
    #[serde(default)]
    pub skip_header_rows: usize,
}

// ==========================================
// RunConfig - 一次运行的全部配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub files: Vec<FileConfig>,
    pub prices_dir: PathBuf,
    pub database_path: String,
    pub output_path: PathBuf,
    pub page_size: usize,
    pub max_parallel_files: usize,
    pub merge_strategy: MergeStrategy,
    pub lock_shards: usize,
    pub reset_before_run: bool,
    pub pool: PoolSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            prices_dir: PathBuf::from("./prices"),
            database_path: "./price_dedup.db".to_string(),
            output_path: PathBuf::from("output.sql"),
            page_size: DEFAULT_PAGE_SIZE,
            max_parallel_files: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            merge_strategy: MergeStrategy::default(),
            lock_shards: DEFAULT_LOCK_SHARDS,
            reset_before_run: true,
            pool: PoolSettings::default(),
        }
    }
}

impl RunConfig {
    /// 从 JSON 文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// 从 JSON 字符串解析并校验
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("page_size", self.page_size),
            ("max_parallel_files", self.max_parallel_files),
            ("lock_shards", self.lock_shards),
            ("pool.max_open", self.pool.max_open),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    message: "必须大于 0".to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        for file in &self.files {
            if !seen.insert(file.filename.as_str()) {
                return Err(ConfigError::Invalid {
                    key: "files".to_string(),
                    message: format!("文件名重复: {}", file.filename),
                });
            }
        }
        Ok(())
    }
}

impl ColumnMappingReader for RunConfig {
    fn mapping_for(&self, file_name: &str) -> Option<FileMapping> {
        self.files
            .iter()
            .find(|f| f.filename == file_name)
            .map(|f| FileMapping {
                columns: f.columns,
                skip_header_rows: f.skip_header_rows,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = RunConfig::from_json(
            r#"{"files": [{"filename": "a.xlsx", "columns": {"brand": 0, "article": 1, "name": 2}}]}"#,
        )
        .unwrap();

        assert_eq!(config.files.len(), 1);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.merge_strategy, MergeStrategy::Atomic);
        assert_eq!(config.pool, PoolSettings::default());
        assert!(config.reset_before_run);
        assert_eq!(config.prices_dir, PathBuf::from("./prices"));
    }

    #[test]
    fn test_parse_overrides() {
        let config = RunConfig::from_json(
            r#"{
                "files": [],
                "page_size": 10,
                "merge_strategy": "locked",
                "lock_shards": 1,
                "pool": {"max_open": 4}
            }"#,
        )
        .unwrap();

        assert_eq!(config.page_size, 10);
        assert_eq!(config.merge_strategy, MergeStrategy::Locked);
        assert_eq!(config.lock_shards, 1);
        assert_eq!(config.pool.max_open, 4);
        assert_eq!(config.pool.max_idle, 20);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = RunConfig::from_json(r#"{"page_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "page_size"));
    }

    #[test]
    fn test_duplicate_filename_rejected() {
        let err = RunConfig::from_json(
            r#"{"files": [
                {"filename": "a.xlsx", "columns": {"brand": 0, "article": 1, "name": 2}},
                {"filename": "a.xlsx", "columns": {"brand": 1, "article": 0, "name": 2}}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            RunConfig::from_json("{not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_mapping_for() {
        let config = RunConfig::from_json(
            r#"{"files": [{"filename": "a.xlsx", "columns": {"brand": 2, "article": 0, "name": 1}, "skip_header_rows": 1}]}"#,
        )
        .unwrap();

        let mapping = config.mapping_for("a.xlsx").unwrap();
        assert_eq!(mapping.columns.brand, 2);
        assert_eq!(mapping.skip_header_rows, 1);
        assert!(config.mapping_for("b.xlsx").is_none());
    }

    #[test]
    fn test_missing_config_file_is_read_error() {
        assert!(matches!(
            RunConfig::load("/definitely/not/here/config.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
