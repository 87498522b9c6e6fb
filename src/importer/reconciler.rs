// ==========================================
// 销售发票管理系统 - 批量导入对账器
// ==========================================
// 职责: 将扁平销售行按自然键去重，构建
//       门店 / 客户分组 / 客户 / 商品类别 / 商品 / 发票 六张查找表 + 明细行列表
// 规则: 同一编码首次出现者生效，后续行复用内存记录，不再读取其余列
// ==========================================

use crate::domain::import::{ReconciledBatch, SalesRow};
use crate::domain::invoice::{
    Customer, CustomerGroup, Invoice, InvoiceLine, Product, ProductCategory, Store,
};
use crate::domain::types::AmountPolicy;
use crate::importer::error::{ImportError, ImportResult};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 由行小计反推单价时保留的小数位
const DERIVED_PRICE_SCALE: u32 = 4;

// ==========================================
// BatchReconciler - 逐行对账
// ==========================================
pub struct BatchReconciler {
    amount_policy: AmountPolicy,
    batch: ReconciledBatch,
    // 每张发票已分配的行号
    line_counters: HashMap<String, u32>,
}

impl BatchReconciler {
    pub fn new(amount_policy: AmountPolicy) -> Self {
        Self {
            amount_policy,
            batch: ReconciledBatch::default(),
            line_counters: HashMap::new(),
        }
    }

    /// 对账前校验并计算行小计：失败时不修改任何查找表
    pub fn check(&self, row: &SalesRow) -> ImportResult<Decimal> {
        match self.amount_policy {
            AmountPolicy::LineTotal => {
                if row.quantity == 0 && !self.batch.products.contains(&row.product_code) {
                    return Err(malformed(
                        row,
                        "quantity",
                        "数量为 0，无法由行小计推导商品单价".to_string(),
                    ));
                }
                Ok(row.amount)
            }
            AmountPolicy::UnitPrice => {
                // 批次内已登记的商品沿用首价
                let subtotal = match self.batch.products.get(&row.product_code) {
                    Some(product) => product.subtotal_for(row.quantity),
                    None => row.amount.checked_mul(Decimal::from(row.quantity)),
                };
                subtotal.ok_or_else(|| {
                    malformed(
                        row,
                        "amount",
                        format!("小计溢出: {} × {}", row.amount, row.quantity),
                    )
                })
            }
        }
    }

    /// 将一行并入批次
    pub fn apply(&mut self, row: &SalesRow) -> ImportResult<()> {
        let subtotal = self.check(row)?;

        let batch = &mut self.batch;

        batch.stores.get_or_insert_with(&row.store_code, || Store {
            store_code: row.store_code.clone(),
            enterprise: row.enterprise.clone(),
            address: row.address.clone(),
        });

        batch.customer_groups.get_or_insert_with(&row.group_code, || CustomerGroup {
            group_code: row.group_code.clone(),
            group_info: row.group_info.clone(),
        });

        // 客户归属首次出现时的分组
        batch.customers.get_or_insert_with(&row.customer_code, || Customer {
            customer_code: row.customer_code.clone(),
            group_code: row.group_code.clone(),
        });

        // 源数据无独立类别名称列，名称沿用编码
        batch
            .product_categories
            .get_or_insert_with(&row.category_code, || ProductCategory {
                category_code: row.category_code.clone(),
                category_name: row.category_code.clone(),
            });

        let amount_policy = self.amount_policy;
        batch.products.get_or_insert_with(&row.product_code, || Product {
            product_code: row.product_code.clone(),
            category_code: row.category_code.clone(),
            product_name: row.product_name.clone(),
            unit: row.unit.clone(),
            unit_price: match amount_policy {
                AmountPolicy::UnitPrice => row.amount,
                AmountPolicy::LineTotal => derive_unit_price(row.amount, row.quantity),
            },
        });

        // 发票复用已解析的门店与客户（首次出现者）
        let store_code = row.store_code.clone();
        let customer_code = row.customer_code.clone();
        batch.invoices.get_or_insert_with(&row.invoice_code, || Invoice {
            invoice_code: row.invoice_code.clone(),
            store_code,
            customer_code,
            year: row.year,
            month: row.month,
        });

        let line_no = self
            .line_counters
            .entry(row.invoice_code.clone())
            .and_modify(|n| *n += 1)
            .or_insert(1);

        batch.lines.push(InvoiceLine {
            line_id: None,
            invoice_code: row.invoice_code.clone(),
            line_no: *line_no,
            product_code: row.product_code.clone(),
            quantity: row.quantity,
            subtotal,
        });

        Ok(())
    }

    pub fn finish(self) -> ReconciledBatch {
        self.batch
    }
}

fn malformed(row: &SalesRow, field: &str, message: String) -> ImportError {
    ImportError::MalformedRow {
        row: row.row_number,
        field: field.to_string(),
        message,
    }
}

fn derive_unit_price(line_total: Decimal, quantity: i64) -> Decimal {
    // 调用前已由 check 保证 quantity != 0
    (line_total / Decimal::from(quantity))
        .round_dp(DERIVED_PRICE_SCALE)
        .normalize()
}

/// 一次性对账整批（任一行失败即返回错误）
pub fn reconcile(rows: &[SalesRow], amount_policy: AmountPolicy) -> ImportResult<ReconciledBatch> {
    let mut reconciler = BatchReconciler::new(amount_policy);
    for row in rows {
        reconciler.apply(row)?;
    }
    Ok(reconciler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::LookupTable;
    use std::str::FromStr;

    fn row(
        row_number: usize,
        invoice: &str,
        customer: &str,
        product: &str,
        quantity: i64,
        amount: &str,
    ) -> SalesRow {
        SalesRow {
            row_number,
            enterprise: "E1".to_string(),
            store_code: "S1".to_string(),
            address: "Addr".to_string(),
            year: 2023,
            month: 5,
            invoice_code: invoice.to_string(),
            group_code: "G1".to_string(),
            group_info: "GroupInfo".to_string(),
            customer_code: customer.to_string(),
            category_code: "P1".to_string(),
            product_code: product.to_string(),
            product_name: "Widget".to_string(),
            unit: "pcs".to_string(),
            quantity,
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn test_single_row_builds_one_of_each() {
        let batch = reconcile(
            &[row(2, "B000000001", "C1", "PR1", 3, "9.0")],
            AmountPolicy::UnitPrice,
        )
        .unwrap();

        assert_eq!(batch.stores.len(), 1);
        assert_eq!(batch.customer_groups.len(), 1);
        assert_eq!(batch.customers.len(), 1);
        assert_eq!(batch.product_categories.len(), 1);
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.invoices.len(), 1);
        assert_eq!(batch.lines.len(), 1);

        let invoice = batch.invoices.get("B000000001").unwrap();
        assert_eq!((invoice.year, invoice.month), (2023, 5));
        assert_eq!(invoice.store_code, "S1");
        assert_eq!(invoice.customer_code, "C1");

        let product = batch.products.get("PR1").unwrap();
        assert_eq!(product.unit_price, Decimal::from(9));

        let line = &batch.lines[0];
        assert_eq!(line.quantity, 3);
        assert_eq!(line.line_no, 1);
        assert_eq!(line.subtotal, Decimal::from(27));
    }

    #[test]
    fn test_first_seen_price_wins() {
        let rows = vec![
            row(2, "B1", "C1", "PR1", 1, "9.0"),
            row(3, "B1", "C1", "PR2", 1, "4.0"),
            row(4, "B2", "C2", "PR1", 2, "11.0"),
            row(5, "B2", "C2", "PR2", 1, "5.0"),
            row(6, "B3", "C1", "PR1", 1, "12.0"),
        ];

        let batch = reconcile(&rows, AmountPolicy::UnitPrice).unwrap();

        // N=5 行，K=2 个商品编码
        assert_eq!(batch.products.len(), 2);
        assert_eq!(batch.products.get("PR1").unwrap().unit_price, Decimal::from(9));
        assert_eq!(batch.products.get("PR2").unwrap().unit_price, Decimal::from(4));

        // 小计按批次首价计算
        assert_eq!(batch.lines[2].subtotal, Decimal::from(18));
        assert_eq!(batch.lines.len(), 5);
    }

    #[test]
    fn test_line_numbers_per_invoice() {
        let rows = vec![
            row(2, "B1", "C1", "PR1", 1, "1"),
            row(3, "B2", "C1", "PR1", 1, "1"),
            row(4, "B1", "C1", "PR1", 1, "1"),
        ];

        let batch = reconcile(&rows, AmountPolicy::UnitPrice).unwrap();
        let numbers: Vec<(String, u32)> = batch
            .lines
            .iter()
            .map(|l| (l.invoice_code.clone(), l.line_no))
            .collect();

        assert_eq!(
            numbers,
            vec![
                ("B1".to_string(), 1),
                ("B2".to_string(), 1),
                ("B1".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_invoice_keeps_first_customer() {
        let rows = vec![
            row(2, "B1", "C1", "PR1", 1, "1"),
            row(3, "B1", "C9", "PR1", 1, "1"),
        ];

        let batch = reconcile(&rows, AmountPolicy::UnitPrice).unwrap();
        assert_eq!(batch.invoices.len(), 1);
        assert_eq!(batch.invoices.get("B1").unwrap().customer_code, "C1");
        // 第二个客户仍被登记
        assert_eq!(batch.customers.len(), 2);
    }

    #[test]
    fn test_line_total_policy() {
        let rows = vec![
            row(2, "B1", "C1", "PR1", 4, "10"),
            row(3, "B1", "C1", "PR1", 2, "7"),
        ];

        let batch = reconcile(&rows, AmountPolicy::LineTotal).unwrap();

        assert_eq!(
            batch.products.get("PR1").unwrap().unit_price,
            Decimal::from_str("2.5").unwrap()
        );
        assert_eq!(batch.lines[0].subtotal, Decimal::from(10));
        assert_eq!(batch.lines[1].subtotal, Decimal::from(7));
    }

    #[test]
    fn test_line_total_zero_quantity_rejected_without_side_effects() {
        let mut reconciler = BatchReconciler::new(AmountPolicy::LineTotal);
        let err = reconciler
            .apply(&row(2, "B1", "C1", "PR1", 0, "10"))
            .unwrap_err();
        assert!(err.is_row_level());

        let batch = reconciler.finish();
        assert!(batch.stores.is_empty());
        assert!(batch.lines.is_empty());
    }

    #[test]
    fn test_subtotal_overflow_rejected_without_side_effects() {
        let mut reconciler = BatchReconciler::new(AmountPolicy::UnitPrice);
        let err = reconciler
            .apply(&row(2, "B1", "C1", "PR1", 2, "79228162514264337593543950335"))
            .unwrap_err();

        match err {
            ImportError::MalformedRow { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "amount");
            }
            other => panic!("错误类型不符: {:?}", other),
        }

        let batch = reconciler.finish();
        assert!(batch.products.is_empty());
        assert!(batch.lines.is_empty());
    }

    #[test]
    fn test_subtotal_overflow_on_known_product() {
        let mut reconciler = BatchReconciler::new(AmountPolicy::UnitPrice);
        reconciler
            .apply(&row(2, "B1", "C1", "PR1", 1, "79228162514264337593543950335"))
            .unwrap();

        // 沿用首价后数量 2 溢出
        let err = reconciler
            .apply(&row(3, "B1", "C1", "PR1", 2, "1"))
            .unwrap_err();
        assert!(err.is_row_level());
        assert_eq!(reconciler.finish().lines.len(), 1);
    }

    #[test]
    fn test_lookup_table_preserves_order() {
        let mut table: LookupTable<String> = LookupTable::default();
        table.get_or_insert_with("b", || "B".to_string());
        table.get_or_insert_with("a", || "A".to_string());
        table.get_or_insert_with("b", || "B2".to_string());

        assert_eq!(table.records(), &["B".to_string(), "A".to_string()]);
        assert_eq!(table.get("b").map(String::as_str), Some("B"));
    }
}
