// ==========================================
// 销售发票管理系统 - 行映射器实现
// ==========================================
// 职责: 列位置 → 标准字段映射 + 类型转换
// 列布局（从 0 开始）:
//   0 企业 | 1 门店编码 | 2 地址 | 3 年 | 4 月 | 5 发票编码
//   6 客户分组编码 | 7 分组描述 | 8 客户编码 | 9 商品类别编码
//   10 (忽略) | 11 商品编码 | 12 商品名称 | 13 单位 | 14 数量 | 15 单价/小计
// ==========================================

use crate::domain::import::{RawSalesRow, SalesRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sales_importer_trait::RowMapper;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 列位置定义
pub mod columns {
    pub const ENTERPRISE: usize = 0;
    pub const STORE_CODE: usize = 1;
    pub const ADDRESS: usize = 2;
    pub const YEAR: usize = 3;
    pub const MONTH: usize = 4;
    pub const INVOICE_CODE: usize = 5;
    pub const GROUP_CODE: usize = 6;
    pub const GROUP_INFO: usize = 7;
    pub const CUSTOMER_CODE: usize = 8;
    pub const CATEGORY_CODE: usize = 9;
    pub const PRODUCT_CODE: usize = 11;
    pub const PRODUCT_NAME: usize = 12;
    pub const UNIT: usize = 13;
    pub const QUANTITY: usize = 14;
    pub const AMOUNT: usize = 15;

    /// 最少列数
    pub const REQUIRED: usize = AMOUNT + 1;
}

pub struct SalesRowMapper;

impl RowMapper for SalesRowMapper {
    fn map_row(&self, row: &RawSalesRow) -> ImportResult<SalesRow> {
        if row.cells.len() < columns::REQUIRED {
            return Err(malformed(
                row,
                "columns",
                format!("列数不足: 期望至少 {} 列，实际 {} 列", columns::REQUIRED, row.cells.len()),
            ));
        }

        let month = self.parse_integer(row, columns::MONTH, "month")?;
        if !(1..=12).contains(&month) {
            return Err(malformed(row, "month", format!("月份超出范围 [1, 12]: {}", month)));
        }

        let quantity = self.parse_integer(row, columns::QUANTITY, "quantity")?;
        if quantity < 0 {
            return Err(malformed(row, "quantity", format!("数量不能为负: {}", quantity)));
        }

        let year = self.parse_integer(row, columns::YEAR, "year")?;
        let year = i32::try_from(year)
            .map_err(|_| malformed(row, "year", format!("年份超出范围: {}", year)))?;

        Ok(SalesRow {
            row_number: row.row_number,
            enterprise: self.get_text(row, columns::ENTERPRISE),
            store_code: self.get_code(row, columns::STORE_CODE, "store_code")?,
            address: self.get_text(row, columns::ADDRESS),
            year,
            month: month as u32,
            invoice_code: self.get_code(row, columns::INVOICE_CODE, "invoice_code")?,
            group_code: self.get_code(row, columns::GROUP_CODE, "group_code")?,
            group_info: self.get_text(row, columns::GROUP_INFO),
            customer_code: self.get_code(row, columns::CUSTOMER_CODE, "customer_code")?,
            category_code: self.get_code(row, columns::CATEGORY_CODE, "category_code")?,
            product_code: self.get_code(row, columns::PRODUCT_CODE, "product_code")?,
            product_name: self.get_text(row, columns::PRODUCT_NAME),
            unit: self.get_text(row, columns::UNIT),
            quantity,
            amount: self.parse_decimal(row, columns::AMOUNT, "amount")?,
        })
    }
}

fn malformed(row: &RawSalesRow, field: &str, message: String) -> ImportError {
    ImportError::MalformedRow {
        row: row.row_number,
        field: field.to_string(),
        message,
    }
}

impl SalesRowMapper {
    /// 提取文本字段（缺失视为空串）
    fn get_text(&self, row: &RawSalesRow, col: usize) -> String {
        row.cells.get(col).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    /// 提取编码字段（不可为空）
    fn get_code(&self, row: &RawSalesRow, col: usize, field: &str) -> ImportResult<String> {
        let value = self.get_text(row, col);
        if value.is_empty() {
            return Err(malformed(row, field, "编码为空".to_string()));
        }
        Ok(value)
    }

    /// 解析整数；接受小数部分为零的数值（如表格导出的 "3.0"）
    fn parse_integer(&self, row: &RawSalesRow, col: usize, field: &str) -> ImportResult<i64> {
        let value = self.get_text(row, col);
        if let Ok(n) = value.parse::<i64>() {
            return Ok(n);
        }

        Decimal::from_str(&value)
            .ok()
            .filter(|d| d.fract().is_zero())
            .and_then(|d| i64::try_from(d).ok())
            .ok_or_else(|| malformed(row, field, format!("无法解析为整数: {}", value)))
    }

    /// 解析金额（支持科学计数法）
    fn parse_decimal(&self, row: &RawSalesRow, col: usize, field: &str) -> ImportResult<Decimal> {
        let value = self.get_text(row, col);
        Decimal::from_str(&value)
            .or_else(|_| Decimal::from_scientific(&value))
            .map(|d| d.normalize())
            .map_err(|_| malformed(row, field, format!("无法解析为金额: {}", value)))
    }
}
