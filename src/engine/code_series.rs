// ==========================================
// 销售发票管理系统 - 编码序列
// ==========================================
// 职责: 由当前最大编码推导下一个编码（纯函数）
// 规则: 去掉前缀 → 解析数字后缀 → +1 → 按定长补零
// 原子性由仓储层保证（IMMEDIATE 事务 + 唯一约束重试）
// ==========================================

use crate::domain::types::CodeSeries;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeSeriesError {
    #[error("编码 {code} 不属于序列 {series}（前缀 {prefix}）")]
    PrefixMismatch {
        series: String,
        prefix: String,
        code: String,
    },

    #[error("编码 {code} 的数字后缀无法解析")]
    InvalidSuffix { code: String },

    #[error("序列 {series} 已耗尽（{digits} 位）")]
    Exhausted { series: String, digits: usize },
}

/// 格式化序列中第 number 个编码
pub fn format_code(series: CodeSeries, number: u64) -> Result<String, CodeSeriesError> {
    let digits = series.digits();
    let code = format!("{}{:0width$}", series.prefix(), number, width = digits);
    if code.len() != series.prefix().len() + digits {
        return Err(CodeSeriesError::Exhausted {
            series: series.to_string(),
            digits,
        });
    }
    Ok(code)
}

/// 解析编码的数字部分
pub fn parse_number(series: CodeSeries, code: &str) -> Result<u64, CodeSeriesError> {
    let suffix = code
        .strip_prefix(series.prefix())
        .ok_or_else(|| CodeSeriesError::PrefixMismatch {
            series: series.to_string(),
            prefix: series.prefix().to_string(),
            code: code.to_string(),
        })?;

    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodeSeriesError::InvalidSuffix {
            code: code.to_string(),
        });
    }

    suffix
        .parse::<u64>()
        .map_err(|_| CodeSeriesError::InvalidSuffix {
            code: code.to_string(),
        })
}

/// 由当前最大编码推导下一个编码；无既有编码时从 1 开始
pub fn next_code(series: CodeSeries, max_code: Option<&str>) -> Result<String, CodeSeriesError> {
    let next = match max_code {
        Some(code) => parse_number(series, code)? + 1,
        None => 1,
    };
    format_code(series, next)
}
