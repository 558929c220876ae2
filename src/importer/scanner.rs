// ==========================================
// 价格目录去重系统 - 价目表目录扫描
// ==========================================
// 职责: 列出目录中的价目表文件，并按文件名配对列映射
// 规则: 非普通文件 / 无映射的文件记录日志后跳过；结果按文件名排序
// ==========================================

use crate::config::{ColumnMappingReader, FileMapping};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::is_supported;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 单个文件的导入任务（worker 启动时获得自己的不可变映射）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestJob {
    pub path: PathBuf,
    pub file_name: String,
    pub mapping: FileMapping,
}

/// 扫描目录，生成导入任务
///
/// # 返回
/// - Err(DirectoryReadError): 目录不可读（启动期致命错误）
pub fn collect_jobs<R>(dir: &Path, reader: &R) -> ImportResult<Vec<IngestJob>>
where
    R: ColumnMappingReader + ?Sized,
{
    let entries = std::fs::read_dir(dir).map_err(|e| ImportError::DirectoryReadError {
        dir: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut jobs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "目录项读取失败，跳过");
                continue;
            }
        };
        let path = entry.path();
        if !is_supported(&path) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();

        if !path.is_file() {
            warn!(file = %path.display(), "文件不存在或不是普通文件，跳过");
            continue;
        }

        let Some(mapping) = reader.mapping_for(&file_name) else {
            warn!(file = %file_name, "配置中未找到该文件的列映射，跳过");
            continue;
        };

        jobs.push(IngestJob {
            path,
            file_name,
            mapping,
        });
    }

    jobs.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    info!(dir = %dir.display(), files = jobs.len(), "目录扫描完成");
    Ok(jobs)
}
