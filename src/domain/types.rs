// ==========================================
// 销售发票管理系统 - 领域类型定义
// ==========================================
// 职责: 导入策略枚举 + 编码序列定义
// 序列化格式: SCREAMING_SNAKE_CASE (与 config_kv 一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 失败策略 (Failure Policy)
// ==========================================
// 批次中出现格式错误行时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    #[default]
    AbortBatch,      // 首个错误行即中止整批，不落库
    SkipInvalidRows, // 隔离错误行，提交其余有效行
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AbortBatch => write!(f, "ABORT_BATCH"),
            FailurePolicy::SkipInvalidRows => write!(f, "SKIP_INVALID_ROWS"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ABORT_BATCH" => Ok(FailurePolicy::AbortBatch),
            "SKIP_INVALID_ROWS" => Ok(FailurePolicy::SkipInvalidRows),
            other => Err(format!("未知的失败策略: {}", other)),
        }
    }
}

// ==========================================
// 金额口径 (Amount Policy)
// ==========================================
// 第 15 列的含义：单价 或 行小计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountPolicy {
    #[default]
    UnitPrice, // 第 15 列为单价，小计 = 数量 × 单价
    LineTotal, // 第 15 列为行小计，直接采用
}

impl fmt::Display for AmountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountPolicy::UnitPrice => write!(f, "UNIT_PRICE"),
            AmountPolicy::LineTotal => write!(f, "LINE_TOTAL"),
        }
    }
}

impl FromStr for AmountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UNIT_PRICE" => Ok(AmountPolicy::UnitPrice),
            "LINE_TOTAL" => Ok(AmountPolicy::LineTotal),
            other => Err(format!("未知的金额口径: {}", other)),
        }
    }
}

// ==========================================
// 实体类型 (Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Store,
    CustomerGroup,
    Customer,
    ProductCategory,
    Product,
    Invoice,
    InvoiceLine,
}

impl EntityKind {
    /// 对应的数据表名
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Store => "store",
            EntityKind::CustomerGroup => "customer_group",
            EntityKind::Customer => "customer",
            EntityKind::ProductCategory => "product_category",
            EntityKind::Product => "product",
            EntityKind::Invoice => "invoice",
            EntityKind::InvoiceLine => "invoice_line",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

// ==========================================
// 编码序列 (Code Series)
// ==========================================
// 前缀 + 定长数字后缀，例如 CUS0000042 / B000000007
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeSeries {
    Customer,
    Invoice,
}

impl CodeSeries {
    pub fn prefix(&self) -> &'static str {
        match self {
            CodeSeries::Customer => "CUS",
            CodeSeries::Invoice => "B",
        }
    }

    pub fn digits(&self) -> usize {
        match self {
            CodeSeries::Customer => 7,
            CodeSeries::Invoice => 9,
        }
    }

    /// 编码所在实体
    pub fn entity(&self) -> EntityKind {
        match self {
            CodeSeries::Customer => EntityKind::Customer,
            CodeSeries::Invoice => EntityKind::Invoice,
        }
    }

    /// SQLite GLOB 模式，只匹配本序列格式的编码
    pub fn glob_pattern(&self) -> String {
        format!("{}{}", self.prefix(), "[0-9]".repeat(self.digits()))
    }
}

impl fmt::Display for CodeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSeries::Customer => write!(f, "CUSTOMER"),
            CodeSeries::Invoice => write!(f, "INVOICE"),
        }
    }
}
