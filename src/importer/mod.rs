// ==========================================
// 价格目录去重系统 - 导入层
// ==========================================
// 职责: 目录扫描、价目表解析、并发导入协调
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod coordinator;
pub mod error;
pub mod file_parser;
pub mod scanner;

// 重导出核心类型
pub use coordinator::{process_file, IngestionCoordinator};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, ParsedFile, UniversalFileParser};
pub use scanner::{collect_jobs, IngestJob};
