// ==========================================
// 价格目录去重系统 - 列映射读取 Trait
// ==========================================
// 职责: 定义导入模块所需的列映射读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ColumnMapping - 单个文件的列映射
// ==========================================
// 说明: 0-based 列索引，对应 config.json 中的 columns.{brand, article, name}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub brand: usize,
    pub article: usize,
    pub name: usize,
}

impl ColumnMapping {
    /// 行至少需要的列数（最大索引 + 1）
    pub fn required_width(&self) -> usize {
        self.brand.max(self.article).max(self.name) + 1
    }
}

// ==========================================
// FileMapping - 列映射 + 行级选项
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    pub columns: ColumnMapping,
    /// 每个工作表开头跳过的行数（表头）
    pub skip_header_rows: usize,
}

// ==========================================
// ColumnMappingReader Trait
// ==========================================
// 用途: 按文件名查询列映射
// 实现者: RunConfig（从 config.json 读取）
pub trait ColumnMappingReader: Send + Sync {
    /// 按文件名（不含目录）查询映射
    ///
    /// # 返回
    /// - Some(FileMapping): 已配置
    /// - None: 未配置，文件应被跳过
    fn mapping_for(&self, file_name: &str) -> Option<FileMapping>;
}
