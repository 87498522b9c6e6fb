// ==========================================
// 销售发票管理系统 - 报表视图模型
// ==========================================
// 只读聚合结果，由 ReportRepository 生成
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 按商品汇总的销量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_code: String,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_amount: Decimal,
}

/// 客户分组分布
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerGroupShare {
    pub group_code: String,
    pub group_info: String,
    pub customer_count: i64,
}

/// 月度营收
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub revenue: Decimal,
}

/// 发票导出行（扁平化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceExportRow {
    pub store_code: String,
    pub year: i32,
    pub month: u32,
    pub invoice_code: String,
    pub group_info: String,
    pub category_name: String,
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}
