// ==========================================
// 销售发票管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod invoice_repo;
pub mod persistence;
pub mod report_repo;
pub mod sales_import_repo;
pub mod sales_import_repo_impl;

// 重导出核心仓储
pub use catalog_repo::CatalogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use invoice_repo::InvoiceRepository;
pub use persistence::{bulk_insert_if_absent, get_or_create, max_code, CodedRecord, InsertIfAbsent};
pub use report_repo::ReportRepository;
pub use sales_import_repo::SalesImportRepository;
pub use sales_import_repo_impl::SalesImportRepositoryImpl;
