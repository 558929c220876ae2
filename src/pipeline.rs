// ==========================================
// 价格目录去重系统 - 运行管线
// ==========================================
// 流程: 打开存储（致命）→ 可选清表 → 扫描目录（致命）→ 并发导入 → 分页导出（致命）
// 说明: 只有启动期 / 导出文件创建失败向上传播；文件级与行级问题已在导入层隔离
// ==========================================

use crate::config::{ConfigError, RunConfig};
use crate::db::open_pool;
use crate::domain::report::IngestReport;
use crate::engine::resolver::ConflictResolver;
use crate::export::{CatalogExporter, ExportError};
use crate::importer::{collect_jobs, ImportError, IngestionCoordinator, UniversalFileParser};
use crate::repository::{ProductStore, RepositoryError, SqliteProductStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

/// 管线错误（均为致命错误）
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("存储初始化失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// 一次完整运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ingest: IngestReport,
    pub exported: usize,
    pub elapsed: Duration,
}

// ==========================================
// Pipeline
// ==========================================
pub struct Pipeline {
    config: RunConfig,
    store: Arc<SqliteProductStore>,
}

impl Pipeline {
    /// 打开存储并初始化 schema
    ///
    /// # 返回
    /// - Err: 配置无效 / 数据库不可达（致命）
    pub fn open(config: RunConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let pool = open_pool(&config.database_path, config.pool)?;
        Ok(Self {
            config,
            store: Arc::new(SqliteProductStore::new(pool)),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ProductStore> {
        self.store.clone()
    }

    /// 导入阶段：按配置清表、扫描目录、并发导入
    pub async fn ingest(&self) -> Result<IngestReport, PipelineError> {
        if self.config.reset_before_run {
            self.store.reset()?;
            info!("运行前已清空 products 表");
        }

        let jobs = collect_jobs(&self.config.prices_dir, &self.config)?;

        let resolver = Arc::new(ConflictResolver::new(
            self.store(),
            self.config.merge_strategy,
            self.config.lock_shards,
        ));
        let coordinator = IngestionCoordinator::new(
            resolver,
            Arc::new(UniversalFileParser),
            self.config.max_parallel_files,
        );
        Ok(coordinator.run(jobs).await)
    }

    /// 导出阶段：分页读取并写出 SQL dump
    pub fn export(&self) -> Result<usize, PipelineError> {
        let exporter = CatalogExporter::new(self.store.as_ref(), self.config.page_size);
        Ok(exporter.export_to_path(&self.config.output_path)?)
    }

    /// 完整运行：导入 + 导出
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let ingest = self.ingest().await?;
        let exported = self.export()?;
        Ok(RunSummary {
            ingest,
            exported,
            elapsed: start.elapsed(),
        })
    }
}
