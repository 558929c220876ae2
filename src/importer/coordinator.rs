// ==========================================
// 价格目录去重系统 - 导入协调器
// ==========================================
// 职责: 每个文件一个并发单元，文件内逐行顺序解析 → 冲突解析 → 落库
// 并发: tokio 阻塞线程池 + 信号量限制并行文件数；互斥由 ConflictResolver 负责
// 容错: 单文件失败（含 worker panic）只影响该文件，不中断整次运行
// ==========================================

use crate::domain::report::{FileReport, IngestReport};
use crate::engine::resolver::{candidate, ConflictResolver};
use crate::importer::file_parser::FileParser;
use crate::importer::scanner::IngestJob;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// IngestionCoordinator
// ==========================================
pub struct IngestionCoordinator {
    resolver: Arc<ConflictResolver>,
    parser: Arc<dyn FileParser>,
    max_parallel_files: usize,
}

impl IngestionCoordinator {
    /// 创建协调器
    ///
    /// # 参数
    /// - resolver: 所有 worker 共享的冲突解析器
    /// - parser: 文件解析器
    /// - max_parallel_files: 同时处理的文件数上限（至少为 1）
    pub fn new(
        resolver: Arc<ConflictResolver>,
        parser: Arc<dyn FileParser>,
        max_parallel_files: usize,
    ) -> Self {
        Self {
            resolver,
            parser,
            max_parallel_files: max_parallel_files.max(1),
        }
    }

    /// 并发处理全部文件，等待所有文件完成后返回汇总
    ///
    /// # 说明
    /// - 文件之间无顺序保证；文件内按解析顺序应用
    /// - 返回的 files 与 jobs 顺序一致
    pub async fn run(&self, jobs: Vec<IngestJob>) -> IngestReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(run_id = %run_id, files = jobs.len(), "开始批量导入文件");

        let semaphore = Arc::new(Semaphore::new(self.max_parallel_files));
        let tasks = jobs.into_iter().map(|job| {
            let resolver = Arc::clone(&self.resolver);
            let parser = Arc::clone(&self.parser);
            let semaphore = Arc::clone(&semaphore);
            async move {
                let file = job.file_name.clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return FileReport::failed(file, e.to_string()),
                };

                let handle = tokio::task::spawn_blocking(move || {
                    process_file(&resolver, parser.as_ref(), &job)
                });
                match handle.await {
                    Ok(report) => report,
                    Err(e) => {
                        error!(file = %file, error = %e, "文件处理线程异常退出");
                        FileReport::failed(file, format!("worker 异常退出: {}", e))
                    }
                }
            }
        });

        // 并发执行所有导入任务
        let files = join_all(tasks).await;

        let report = IngestReport {
            run_id,
            started_at,
            files,
            elapsed: start.elapsed(),
        };

        info!(
            run_id = %report.run_id,
            total = report.files.len(),
            failed = report.files_failed(),
            inserted = report.total_inserted(),
            updated = report.total_updated(),
            unchanged = report.total_unchanged(),
            soft_conflicts = report.soft_conflicts().count(),
            "批量导入完成"
        );
        report
    }
}

/// 处理单个文件（阻塞）
///
/// 行级问题（列数不足、货号或品牌归一化后为空、单行存储失败）只跳过该行
#[instrument(skip(resolver, parser, job), fields(file = %job.file_name))]
pub fn process_file(resolver: &ConflictResolver, parser: &dyn FileParser, job: &IngestJob) -> FileReport {
    let _perf = crate::perf::StageTimer::new("process_file");
    let mut report = FileReport::new(job.file_name.clone());

    let parsed = match parser.parse(&job.path, &job.mapping) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "文件解析失败，跳过该文件");
            report.error = Some(e.to_string());
            return report;
        }
    };

    report.sheets = parsed.sheets;
    report.rows_read = parsed.rows.len() + parsed.rows_skipped;
    report.rows_skipped = parsed.rows_skipped;
    debug!(rows = parsed.rows.len(), sheets = parsed.sheets, "文件解析完成");

    for row in parsed.rows {
        let (record, fp) = candidate(&row.article, &row.brand, &row.name);
        if record.article.is_empty() || record.brand.is_empty() {
            report.rows_skipped += 1;
            continue;
        }

        match resolver.resolve_record(record, &fp) {
            Ok(resolution) => {
                report.record(resolution.outcome);
                if resolution.race_recovered {
                    report.races_recovered += 1;
                }
                report.soft_conflicts.extend(resolution.soft_conflicts);
            }
            Err(e) => {
                warn!(
                    sheet = %row.sheet,
                    row = row.row_number,
                    fingerprint = %fp,
                    error = %e,
                    "行写入失败，跳过"
                );
                report.row_errors += 1;
            }
        }
    }

    info!(
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        skipped = report.rows_skipped,
        "文件导入完成"
    );
    report
}
