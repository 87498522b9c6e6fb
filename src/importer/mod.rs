// ==========================================
// 销售发票管理系统 - 导入层
// ==========================================
// 职责: 外部销售数据导入，生成门店/客户/商品/发票数据
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod reconciler;
pub mod row_mapper;
pub mod sales_importer_impl;
pub mod sales_importer_trait;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use reconciler::{reconcile, BatchReconciler};
pub use row_mapper::SalesRowMapper;
pub use sales_importer_impl::SalesImporterImpl;

// 重导出 Trait 接口
pub use sales_importer_trait::{FileParser, RowMapper, SalesImporter};
