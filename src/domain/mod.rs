// ==========================================
// 销售发票管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、导入中间结构
// 红线: 不含数据访问逻辑
// ==========================================

pub mod import;
pub mod invoice;
pub mod report;
pub mod types;

// 重导出核心类型
pub use import::{
    FlushReport, ImportBatch, ImportReport, InsertCounts, LookupTable, RawSalesRow, ReconciledBatch,
    RowRejection, SalesRow,
};
pub use invoice::{
    Customer, CustomerGroup, Invoice, InvoiceDetail, InvoiceLine, InvoiceLineView,
    InvoiceSummary, LineRemoval, NewInvoiceLine, Product, ProductCategory, Store,
};
pub use report::{CustomerGroupShare, InvoiceExportRow, MonthlyRevenue, ProductSales};
pub use types::{AmountPolicy, CodeSeries, EntityKind, FailurePolicy};
