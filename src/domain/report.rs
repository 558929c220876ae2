// ==========================================
// 价格目录去重系统 - 导入报告
// ==========================================
// 职责: 汇总单文件与整次运行的导入统计
// ==========================================

use crate::domain::product::{MergeOutcome, SoftConflict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// FileReport - 单文件导入统计
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub sheets: usize,
    pub rows_read: usize,
    pub rows_skipped: usize, // 列数不足 / 关键字段为空
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub races_recovered: usize,
    pub soft_conflicts: Vec<SoftConflict>,
    pub row_errors: usize, // 单行存储失败（已跳过）
    /// 文件级错误（文件被跳过时填写）
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn failed(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

// ==========================================
// IngestReport - 整次运行汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub elapsed: Duration,
}

impl IngestReport {
    pub fn files_failed(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }

    pub fn total_inserted(&self) -> usize {
        self.files.iter().map(|f| f.inserted).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.files.iter().map(|f| f.updated).sum()
    }

    pub fn total_unchanged(&self) -> usize {
        self.files.iter().map(|f| f.unchanged).sum()
    }

    pub fn total_rows_skipped(&self) -> usize {
        self.files.iter().map(|f| f.rows_skipped).sum()
    }

    pub fn soft_conflicts(&self) -> impl Iterator<Item = &SoftConflict> {
        self.files.iter().flat_map(|f| f.soft_conflicts.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_report_counts_outcomes() {
        let mut report = FileReport::new("a.xlsx");
        report.record(MergeOutcome::Inserted);
        report.record(MergeOutcome::Inserted);
        report.record(MergeOutcome::Updated);
        report.record(MergeOutcome::Unchanged);

        assert_eq!(report.inserted, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 1);
        assert!(!report.is_failed());
    }

    #[test]
    fn test_ingest_report_aggregates() {
        let mut ok = FileReport::new("a.xlsx");
        ok.inserted = 3;
        ok.rows_skipped = 1;
        let failed = FileReport::failed("b.xlsx", "无法打开");

        let report = IngestReport {
            run_id: "run".to_string(),
            started_at: Utc::now(),
            files: vec![ok, failed],
            elapsed: Duration::from_millis(5),
        };

        assert_eq!(report.files_failed(), 1);
        assert_eq!(report.total_inserted(), 3);
        assert_eq!(report.total_rows_skipped(), 1);
        assert_eq!(report.soft_conflicts().count(), 0);
    }
}
