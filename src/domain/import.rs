// ==========================================
// 销售发票管理系统 - 导入领域模型
// ==========================================
// 导入管道中间产物与导入结果
// 流程: 文件解析(RawSalesRow) → 行映射(SalesRow) → 对账(ReconciledBatch) → 落库(FlushReport)
// ==========================================

use crate::domain::invoice::{
    Customer, CustomerGroup, Invoice, InvoiceLine, Product, ProductCategory, Store,
};
use crate::domain::types::{AmountPolicy, EntityKind, FailurePolicy};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ==========================================
// RawSalesRow - 文件解析产物
// ==========================================
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSalesRow {
    pub row_number: usize,   // 源文件行号（从 1 开始，含表头）
    pub cells: Vec<String>,  // 已 TRIM 的单元格文本，按列位置排列
}

impl RawSalesRow {
    pub fn new(row_number: usize, cells: Vec<String>) -> Self {
        Self { row_number, cells }
    }
}

// ==========================================
// SalesRow - 类型转换后的销售行
// ==========================================
// 所有编码非空、数值已解析
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRow {
    pub row_number: usize,

    // 门店
    pub enterprise: String,
    pub store_code: String,
    pub address: String,

    // 发票
    pub year: i32,
    pub month: u32,
    pub invoice_code: String,

    // 客户
    pub group_code: String,
    pub group_info: String,
    pub customer_code: String,

    // 商品
    pub category_code: String,
    pub product_code: String,
    pub product_name: String,
    pub unit: String,

    // 数量与金额
    pub quantity: i64,
    pub amount: Decimal, // 第 15 列，含义由 AmountPolicy 决定
}

// ==========================================
// LookupTable - 按编码索引、保持插入顺序的记录表
// ==========================================
#[derive(Debug, Clone)]
pub struct LookupTable<T> {
    index: HashMap<String, usize>,
    records: Vec<T>,
}

impl<T> Default for LookupTable<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            records: Vec::new(),
        }
    }
}

impl<T> LookupTable<T> {
    pub fn get(&self, code: &str) -> Option<&T> {
        self.index.get(code).map(|&i| &self.records[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// 首次出现时构造并插入；已存在时直接返回既有记录
    pub fn get_or_insert_with<F>(&mut self, code: &str, build: F) -> &T
    where
        F: FnOnce() -> T,
    {
        let idx = match self.index.get(code) {
            Some(&idx) => idx,
            None => {
                self.records.push(build());
                let idx = self.records.len() - 1;
                self.index.insert(code.to_string(), idx);
                idx
            }
        };
        &self.records[idx]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按首次出现顺序
    pub fn records(&self) -> &[T] {
        &self.records
    }
}

// ==========================================
// ReconciledBatch - 对账结果（待落库）
// ==========================================
// 生命周期: 对账完成 → 落库
#[derive(Debug, Clone, Default)]
pub struct ReconciledBatch {
    pub stores: LookupTable<Store>,
    pub customer_groups: LookupTable<CustomerGroup>,
    pub customers: LookupTable<Customer>,
    pub product_categories: LookupTable<ProductCategory>,
    pub products: LookupTable<Product>,
    pub invoices: LookupTable<Invoice>,
    pub lines: Vec<InvoiceLine>,
}

impl ReconciledBatch {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ==========================================
// RowRejection - 被隔离的错误行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row_number: usize,
    pub field: String,
    pub message: String,
}

// ==========================================
// InsertCounts - 单实体落库统计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertCounts {
    pub inserted: usize, // 新写入
    pub skipped: usize,  // 已存在（insert-if-absent 跳过）
}

impl InsertCounts {
    pub fn total(&self) -> usize {
        self.inserted + self.skipped
    }
}

// ==========================================
// FlushReport - 批次落库统计（按外键顺序）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlushReport {
    pub stores: InsertCounts,
    pub customer_groups: InsertCounts,
    pub customers: InsertCounts,
    pub product_categories: InsertCounts,
    pub products: InsertCounts,
    pub invoices: InsertCounts,
    pub invoice_lines: InsertCounts,
}

impl FlushReport {
    /// 按实体取统计
    pub fn counts(&self, entity: EntityKind) -> InsertCounts {
        match entity {
            EntityKind::Store => self.stores,
            EntityKind::CustomerGroup => self.customer_groups,
            EntityKind::Customer => self.customers,
            EntityKind::ProductCategory => self.product_categories,
            EntityKind::Product => self.products,
            EntityKind::Invoice => self.invoices,
            EntityKind::InvoiceLine => self.invoice_lines,
        }
    }

    /// 本次新写入的记录总数
    pub fn total_inserted(&self) -> usize {
        [
            self.stores,
            self.customer_groups,
            self.customers,
            self.product_categories,
            self.products,
            self.invoices,
            self.invoice_lines,
        ]
        .iter()
        .map(|c| c.inserted)
        .sum()
    }
}

// ==========================================
// ImportReport - 导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub file_name: Option<String>,
    pub failure_policy: FailurePolicy,
    pub amount_policy: AmountPolicy,
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub rejections: Vec<RowRejection>,
    pub flush: FlushReport,
    #[serde(with = "duration_millis")]
    pub elapsed_time: Duration,
}

// ==========================================
// ImportBatch - 导入批次记录
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub file_name: Option<String>,
    pub failure_policy: FailurePolicy,
    pub amount_policy: AmountPolicy,
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
    pub inserted_rows: usize, // 本批次新写入记录数（全部实体）
    pub elapsed_ms: u64,
    pub imported_at: DateTime<Utc>,
}

impl ImportBatch {
    pub fn from_report(report: &ImportReport, imported_at: DateTime<Utc>) -> Self {
        Self {
            batch_id: report.batch_id.clone(),
            file_name: report.file_name.clone(),
            failure_policy: report.failure_policy,
            amount_policy: report.amount_policy,
            total_rows: report.total_rows,
            accepted_rows: report.accepted_rows,
            rejected_rows: report.rejections.len(),
            inserted_rows: report.flush.total_inserted(),
            elapsed_ms: report.elapsed_time.as_millis() as u64,
            imported_at,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
