// ==========================================
// 价格目录去重系统 - 导出层
// ==========================================

pub mod sql_dump;

pub use sql_dump::{escape_sql, insert_statement, schema_header, CatalogExporter, ExportError};
