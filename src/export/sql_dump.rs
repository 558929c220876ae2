// ==========================================
// 价格目录去重系统 - 目录导出（SQL dump）
// ==========================================
// 输出: 一条 CREATE TABLE IF NOT EXISTS + 每条记录一条 INSERT
// 分页: 按 id 升序定长分页，遇到空页结束；每页为独立分配的 Vec
// 转义: 先双写反斜杠，再双写单引号（顺序不可颠倒）
// ==========================================

use crate::db::PRODUCTS_TABLE;
use crate::domain::product::CanonicalRecord;
use crate::repository::{ProductStore, RepositoryError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// 写缓冲区大小（1 MiB）
pub const WRITE_BUFFER_SIZE: usize = 1 << 20;

/// 导出错误
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("导出文件创建失败 ({path}): {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("导出写入失败: {0}")]
    Write(#[from] std::io::Error),

    #[error("导出读取失败: {0}")]
    Repository(#[from] RepositoryError),
}

/// SQL 字符串字面量转义
pub fn escape_sql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// 表结构声明（仅作说明，不要求与存储 schema 逐字段一致）
pub fn schema_header() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS `{table}` (\n\
         `id` INT AUTO_INCREMENT PRIMARY KEY,\n\
         `article` VARCHAR(255) NOT NULL,\n\
         `brand` VARCHAR(255) NOT NULL,\n\
         `name` VARCHAR(255) NOT NULL\n\
         );\n\n",
        table = PRODUCTS_TABLE
    )
}

/// 单条记录的 INSERT 语句（含换行）
pub fn insert_statement(record: &CanonicalRecord) -> String {
    format!(
        "INSERT INTO `{}` (`article`, `brand`, `name`) VALUES ('{}', '{}', '{}');\n",
        PRODUCTS_TABLE,
        escape_sql(&record.article),
        escape_sql(&record.brand),
        escape_sql(&record.name)
    )
}

// ==========================================
// CatalogExporter
// ==========================================
pub struct CatalogExporter<'a> {
    store: &'a dyn ProductStore,
    page_size: usize,
}

impl<'a> CatalogExporter<'a> {
    pub fn new(store: &'a dyn ProductStore, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// 导出到文件
    ///
    /// # 返回
    /// - Ok(usize): 写出的 INSERT 条数
    /// - Err(CreateFile): 输出文件无法创建（致命）
    pub fn export_to_path<P: AsRef<Path>>(&self, output_path: P) -> Result<usize, ExportError> {
        let path = output_path.as_ref();
        let file = File::create(path).map_err(|source| ExportError::CreateFile {
            path: path.display().to_string(),
            source,
        })?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let written = self.export_to_writer(&mut writer)?;
        writer.flush()?;

        info!(path = %path.display(), records = written, "SQL 导出完成");
        Ok(written)
    }

    /// 导出到任意 Write
    pub fn export_to_writer<W: Write>(&self, writer: &mut W) -> Result<usize, ExportError> {
        let _perf = crate::perf::StageTimer::new("export");
        writer.write_all(schema_header().as_bytes())?;

        let mut offset = 0;
        let mut written = 0;
        loop {
            let page = self.store.list_page(self.page_size, offset)?;
            if page.is_empty() {
                break;
            }
            debug!(offset, records = page.len(), "导出分页");

            for record in &page {
                writer.write_all(insert_statement(record).as_bytes())?;
            }
            written += page.len();
            offset += self.page_size;
        }

        Ok(written)
    }
}
