// ==========================================
// 销售发票管理系统 - 报表数据仓储
// ==========================================
// 职责: 基于已落库数据的只读聚合
// 金额以 TEXT 存储，求和在 Decimal 上完成，不经 SQLite 浮点
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::report::{CustomerGroupShare, InvoiceExportRow, MonthlyRevenue, ProductSales};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence::decimal_column;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct ReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReportRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按商品汇总销量与销售额（按商品编码排序）
    pub fn sales_by_product(&self) -> RepositoryResult<Vec<ProductSales>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.product_code, p.product_name, l.quantity, l.subtotal
            FROM invoice_line l
            JOIN product p ON p.product_code = l.product_code
            ORDER BY p.product_code, l.line_id
            "#,
        )?;

        let mut rows = stmt.query([])?;
        let mut result: Vec<ProductSales> = Vec::new();
        while let Some(row) = rows.next()? {
            let product_code: String = row.get(0)?;
            let quantity: i64 = row.get(2)?;
            let subtotal = decimal_column(row, 3)?;

            if let Some(last) = result.last_mut().filter(|s| s.product_code == product_code) {
                last.total_quantity = last
                    .total_quantity
                    .checked_add(quantity)
                    .ok_or_else(|| sum_overflow("total_quantity", &product_code))?;
                last.total_amount = last
                    .total_amount
                    .checked_add(subtotal)
                    .ok_or_else(|| sum_overflow("total_amount", &product_code))?;
                continue;
            }
            result.push(ProductSales {
                product_code,
                product_name: row.get(1)?,
                total_quantity: quantity,
                total_amount: subtotal,
            });
        }

        Ok(result)
    }

    /// 客户分组分布（含无客户的分组）
    pub fn customer_group_distribution(&self) -> RepositoryResult<Vec<CustomerGroupShare>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT g.group_code, g.group_info, COUNT(c.customer_code)
            FROM customer_group g
            LEFT JOIN customer c ON c.group_code = g.group_code
            GROUP BY g.group_code, g.group_info
            ORDER BY g.group_code
            "#,
        )?;

        let shares = stmt
            .query_map([], |row| {
                Ok(CustomerGroupShare {
                    group_code: row.get(0)?,
                    group_info: row.get(1)?,
                    customer_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shares)
    }

    /// 指定年份的月度营收（仅含有销售的月份，按月排序）
    pub fn monthly_revenue(&self, year: i32) -> RepositoryResult<Vec<MonthlyRevenue>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT i.month, l.subtotal
            FROM invoice i
            JOIN invoice_line l ON l.invoice_code = i.invoice_code
            WHERE i.year = ?1
            ORDER BY i.month
            "#,
        )?;

        let mut rows = stmt.query(params![year])?;
        let mut result: Vec<MonthlyRevenue> = Vec::new();
        while let Some(row) = rows.next()? {
            let month: u32 = row.get(0)?;
            let subtotal = decimal_column(row, 1)?;

            if let Some(last) = result.last_mut().filter(|r| r.month == month) {
                last.revenue = last
                    .revenue
                    .checked_add(subtotal)
                    .ok_or_else(|| sum_overflow("revenue", &format!("{}-{:02}", year, month)))?;
                continue;
            }
            result.push(MonthlyRevenue {
                month,
                revenue: subtotal,
            });
        }

        Ok(result)
    }

    /// 发票导出行，按发票分页（发票编码倒序，发票内按行号）
    pub fn invoice_export_rows(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<InvoiceExportRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT i.store_code, i.year, i.month, i.invoice_code, g.group_info,
                   pc.category_name, p.product_name, p.unit, l.quantity, p.unit_price, l.subtotal
            FROM invoice i
            JOIN customer c ON c.customer_code = i.customer_code
            JOIN customer_group g ON g.group_code = c.group_code
            JOIN invoice_line l ON l.invoice_code = i.invoice_code
            JOIN product p ON p.product_code = l.product_code
            JOIN product_category pc ON pc.category_code = p.category_code
            WHERE i.invoice_code IN (
                SELECT invoice_code FROM invoice
                ORDER BY invoice_code DESC
                LIMIT ?1 OFFSET ?2
            )
            ORDER BY i.invoice_code DESC, l.line_no
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit, offset], |row| {
                Ok(InvoiceExportRow {
                    store_code: row.get(0)?,
                    year: row.get(1)?,
                    month: row.get(2)?,
                    invoice_code: row.get(3)?,
                    group_info: row.get(4)?,
                    category_name: row.get(5)?,
                    product_name: row.get(6)?,
                    unit: row.get(7)?,
                    quantity: row.get(8)?,
                    unit_price: decimal_column(row, 9)?,
                    subtotal: decimal_column(row, 10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn sum_overflow(field: &str, key: &str) -> RepositoryError {
    RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("汇总溢出: {}", key),
    }
}
