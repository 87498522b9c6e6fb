// ==========================================
// 销售发票管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行入口调用
// ==========================================

pub mod catalog_api;
pub mod config_api;
pub mod error;
pub mod import_api;
pub mod invoice_api;
pub mod report_api;

// 重导出核心类型
pub use catalog_api::{CatalogApi, CatalogEntry};
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{BatchImportItem, ImportApi};
pub use invoice_api::{InvoiceApi, InvoicePage};
pub use report_api::ReportApi;
