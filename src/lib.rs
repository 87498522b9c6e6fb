// ==========================================
// 销售发票管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批量导入销售明细，对账生成门店/客户/商品/发票
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 编码规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AmountPolicy, CodeSeries, EntityKind, FailurePolicy};

// 领域实体
pub use domain::{
    Customer, CustomerGroup, ImportReport, Invoice, InvoiceLine, Product, ProductCategory,
    SalesRow, Store,
};

// 导入
pub use importer::{ImportError, SalesImporter, SalesImporterImpl};

// API
pub use api::{CatalogApi, ImportApi, InvoiceApi, ReportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售发票管理系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
