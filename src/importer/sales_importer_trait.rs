// ==========================================
// 销售发票管理系统 - 销售数据导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// ==========================================

use crate::domain::import::{ImportReport, RawSalesRow, SalesRow};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// SalesImporter Trait
// ==========================================
// 用途: 销售数据导入主接口
// 实现者: SalesImporterImpl
#[async_trait]
pub trait SalesImporter: Send + Sync {
    /// 从文件导入销售数据（按扩展名选择 CSV / Excel 解析）
    ///
    /// # 参数
    /// - file_path: 文件路径（.csv / .xlsx / .xls）
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入结果（落库统计、被隔离的错误行）
    /// - Err: 文件错误；AbortBatch 策略下的首个错误行；落库失败
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 按列位置映射与类型转换
    /// 3. 自然键去重对账
    /// 4. 按外键顺序落库（单事务，insert-if-absent）
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportReport>;

    /// 导入已解析的行（调用方自行完成文件读取）
    async fn import_rows(
        &self,
        rows: Vec<RawSalesRow>,
        file_name: Option<String>,
    ) -> ImportResult<ImportReport>;

    /// 批量导入多个文件（并发执行，互不影响）
    ///
    /// # 返回
    /// - 每个文件各自的导入结果（失败时为错误描述）
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportReport, String>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 1）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 将文件解析为按列位置排列的原始行
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - has_header: 首行是否为表头（为真时跳过）
    ///
    /// # 说明
    /// - 完全空白的行被跳过
    /// - 行号按源文件计算（表头为第 1 行）
    fn parse_to_rows(&self, file_path: &Path, has_header: bool) -> ImportResult<Vec<RawSalesRow>>;
}

// ==========================================
// RowMapper Trait
// ==========================================
// 用途: 列位置映射 + 类型转换接口（阶段 2）
// 实现者: SalesRowMapper
pub trait RowMapper: Send + Sync {
    /// 将原始行转换为 SalesRow
    ///
    /// # 返回
    /// - Err(ImportError::MalformedRow): 缺列 / 编码为空 / 数值无法解析
    fn map_row(&self, row: &RawSalesRow) -> ImportResult<SalesRow>;
}
