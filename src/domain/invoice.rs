// ==========================================
// 销售发票管理系统 - 发票领域模型
// ==========================================
// 实体均以业务编码（自然键）标识，不使用代理主键
// 例外: InvoiceLine 以 (invoice_code, line_no) 为自然身份
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Store - 门店
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub store_code: String,   // 门店编码（唯一）
    pub enterprise: String,   // 所属企业
    pub address: String,      // 地址
}

// ==========================================
// CustomerGroup - 客户分组
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerGroup {
    pub group_code: String, // 分组编码（唯一）
    pub group_info: String, // 分组描述
}

// ==========================================
// Customer - 客户
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_code: String, // 客户编码（唯一）
    pub group_code: String,    // 所属分组（FK）
}

// ==========================================
// ProductCategory - 商品类别
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub category_code: String, // 类别编码（唯一）
    pub category_name: String, // 类别名称
}

// ==========================================
// Product - 商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_code: String,  // 商品编码（唯一）
    pub category_code: String, // 所属类别（FK）
    pub product_name: String,  // 显示名称
    pub unit: String,          // 计量单位
    pub unit_price: Decimal,   // 单价
}

impl Product {
    /// 按单价计算行小计；溢出时返回 None
    pub fn subtotal_for(&self, quantity: i64) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(quantity))
    }
}

// ==========================================
// Invoice - 发票抬头
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_code: String,  // 发票编码（唯一）
    pub store_code: String,    // 开票门店（FK）
    pub customer_code: String, // 客户（FK）
    pub year: i32,
    pub month: u32,
}

// ==========================================
// InvoiceLine - 发票明细行
// ==========================================
// line_id: 落库后的代理 ID（导入阶段为 None）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_id: Option<i64>,
    pub invoice_code: String, // 所属发票（FK）
    pub line_no: u32,         // 发票内序号（从 1 开始）
    pub product_code: String, // 商品（FK）
    pub quantity: i64,        // 销售数量
    pub subtotal: Decimal,    // 小计
}

// ==========================================
// 查询视图
// ==========================================

/// 发票列表行（含合计）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub invoice: Invoice,
    pub line_count: i64,
    pub total_price: Decimal,
}

/// 发票明细行视图（关联商品信息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineView {
    pub line: InvoiceLine,
    pub product_name: String,
    pub unit: String,
    pub unit_price: Decimal,
}

/// 发票详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLineView>,
    pub total_price: Decimal,
}

/// 删除明细行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineRemoval {
    LineRemoved,    // 仅删除明细行
    InvoiceRemoved, // 最后一行被删除，发票一并删除
}

/// 新建发票的明细请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceLine {
    pub product_code: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_product_subtotal() {
        let product = Product {
            product_code: "PR1".to_string(),
            category_code: "P1".to_string(),
            product_name: "Widget".to_string(),
            unit: "pcs".to_string(),
            unit_price: Decimal::from_str("9.50").unwrap(),
        };

        assert_eq!(product.subtotal_for(3), Some(Decimal::from_str("28.50").unwrap()));
        assert_eq!(product.subtotal_for(0), Some(Decimal::ZERO));

        let huge = Product {
            unit_price: Decimal::MAX,
            ..product
        };
        assert_eq!(huge.subtotal_for(2), None);
    }
}
