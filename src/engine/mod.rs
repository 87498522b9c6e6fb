// ==========================================
// 销售发票管理系统 - 引擎层
// ==========================================
// 职责: 纯业务规则（编码序列），不拼 SQL
// ==========================================

pub mod code_series;

pub use code_series::{format_code, next_code, parse_number, CodeSeriesError};
