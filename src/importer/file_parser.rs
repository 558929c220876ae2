// ==========================================
// 价格目录去重系统 - 价目表文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls/.ods) / CSV (.csv)
// 输出: 按列映射抽取的原始三元组（未归一化），保持解析顺序
// 规则: 行的列数少于映射所需宽度时跳过；每个工作表开头可跳过表头行
// ==========================================

use crate::config::FileMapping;
use crate::domain::product::PriceRow;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Excel 系扩展名（小写）
pub const EXCEL_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub sheets: usize,
    pub rows: Vec<PriceRow>,
    /// 列数不足而跳过的行数（不含表头）
    pub rows_skipped: usize,
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件 → 行三元组
// 实现者: ExcelParser, CsvParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    fn parse(&self, file_path: &Path, mapping: &FileMapping) -> ImportResult<ParsedFile>;
}

/// 小写扩展名
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 是否为支持的价目表文件
pub fn is_supported(path: &Path) -> bool {
    let ext = extension_of(path);
    ext == "csv" || EXCEL_EXTENSIONS.contains(&ext.as_str())
}

/// 从一行单元格中按映射抽取三元组；列数不足返回 None
pub fn extract_row(
    cells: &[String],
    mapping: &FileMapping,
    sheet: &str,
    row_number: usize,
) -> Option<PriceRow> {
    let columns = mapping.columns;
    if cells.len() < columns.required_width() {
        return None;
    }
    Some(PriceRow {
        sheet: sheet.to_string(),
        row_number,
        brand: cells[columns.brand].clone(),
        article: cells[columns.article].clone(),
        name: cells[columns.name].clone(),
    })
}

fn collect_sheet_rows<I>(parsed: &mut ParsedFile, sheet: &str, rows: I, mapping: &FileMapping)
where
    I: Iterator<Item = Vec<String>>,
{
    for (idx, cells) in rows.enumerate().skip(mapping.skip_header_rows) {
        match extract_row(&cells, mapping, sheet, idx + 1) {
            Some(row) => parsed.rows.push(row),
            None => parsed.rows_skipped += 1,
        }
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 单元格转文本，并去掉行尾的空单元格
    fn row_to_strings(row: &[Data]) -> Vec<String> {
        let mut cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        cells
    }
}

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path, mapping: &FileMapping) -> ImportResult<ParsedFile> {
        let path = file_path;

        // 检查文件存在
        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = extension_of(path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 打开 Excel 文件
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::NoSheets(path.display().to_string()));
        }

        // 逐个工作表读取
        let mut parsed = ParsedFile::default();
        for sheet_name in sheet_names {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        sheet = %sheet_name,
                        error = %e,
                        "工作表读取失败，跳过"
                    );
                    continue;
                }
            };
            parsed.sheets += 1;
            let rows = range.rows().map(Self::row_to_strings);
            collect_sheet_rows(&mut parsed, &sheet_name, rows, mapping);
            debug!(sheet = %sheet_name, rows = parsed.rows.len(), "工作表解析完成");
        }

        // 所有工作表都读取失败：按无工作表处理
        if parsed.sheets == 0 {
            return Err(ImportError::NoSheets(path.display().to_string()));
        }

        Ok(parsed)
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 说明: 无表头约定（与 Excel 一致按列索引取值），整个文件视为一个工作表
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path, mapping: &FileMapping) -> ImportResult<ParsedFile> {
        let path = file_path;

        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = extension_of(path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut raw_rows = Vec::new();
        for result in reader.records() {
            match result {
                Ok(record) => raw_rows.push(record.iter().map(str::to_string).collect::<Vec<_>>()),
                // I/O 错误之后读取器无法继续，按文件级错误处理
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        line = e.position().map(|p| p.line()),
                        error = %e,
                        "CSV 行无法解析，跳过"
                    );
                    // 空行占位：计入 rows_skipped，后续行号保持连续
                    raw_rows.push(Vec::new());
                }
            }
        }

        let sheet = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();

        let mut parsed = ParsedFile {
            sheets: 1,
            ..Default::default()
        };
        collect_sheet_rows(&mut parsed, &sheet, raw_rows.into_iter(), mapping);
        Ok(parsed)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path, mapping: &FileMapping) -> ImportResult<ParsedFile> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse(file_path, mapping),
            ext if EXCEL_EXTENSIONS.contains(&ext) => ExcelParser.parse(file_path, mapping),
            ext => Err(ImportError::UnsupportedFormat(ext.to_string())),
        }
    }
}
