// ==========================================
// 销售发票管理系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 按列位置排列的原始行（不按表头名取值）
// ==========================================

use crate::domain::import::RawSalesRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sales_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 检查文件存在性与扩展名
fn check_file(path: &Path, allowed: &[&str]) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !allowed.contains(&ext.as_str()) {
        return Err(ImportError::UnsupportedFormat(ext));
    }

    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意 Reader 解析（便于测试与上传流）
    pub fn parse_reader<R: std::io::Read>(
        &self,
        reader: R,
        has_header: bool,
    ) -> ImportResult<Vec<RawSalesRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致，缺列由行映射阶段报错
            .from_reader(reader);

        let mut rows = Vec::new();
        for (idx, result) in reader.byte_records().enumerate() {
            let record = result?;
            // 行号取记录起始的源文件行，引号内换行不会使其偏移
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 1);

            if has_header && idx == 0 {
                continue;
            }

            // 非法 UTF-8 按替换字符处理
            let cells: Vec<String> = record
                .iter()
                .map(|field| String::from_utf8_lossy(field).trim().to_string())
                .collect();

            // 跳过完全空白的行
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            rows.push(RawSalesRow::new(row_number, cells));
        }

        Ok(rows)
    }
}

impl FileParser for CsvParser {
    fn parse_to_rows(&self, file_path: &Path, has_header: bool) -> ImportResult<Vec<RawSalesRow>> {
        check_file(file_path, &["csv"])?;
        let file = File::open(file_path)?;
        self.parse_reader(file, has_header)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 单元格转文本；整数值的浮点单元格不带小数部分
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            other => other.to_string().trim().to_string(),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_to_rows(&self, file_path: &Path, has_header: bool) -> ImportResult<Vec<RawSalesRow>> {
        check_file(file_path, &["xlsx", "xls"])?;

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // 行号从工作表实际起始行算起
        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

        let mut rows = Vec::new();
        for (idx, data_row) in range.rows().enumerate() {
            if has_header && idx == 0 {
                continue;
            }

            let cells: Vec<String> = data_row.iter().map(Self::cell_to_string).collect();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            rows.push(RawSalesRow::new(first_row + idx + 1, cells));
        }

        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_rows(&self, file_path: &Path, has_header: bool) -> ImportResult<Vec<RawSalesRow>> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_rows(file_path, has_header),
            "xlsx" | "xls" => ExcelParser.parse_to_rows(file_path, has_header),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
