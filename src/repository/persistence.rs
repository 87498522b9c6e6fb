// ==========================================
// 销售发票管理系统 - 通用持久化操作
// ==========================================
// 红线: 仅做数据 CRUD，不含业务规则
// 对外只暴露三类操作:
//   - bulk_insert_if_absent: 批量写入，已存在的自然键静默跳过（不更新）
//   - get_or_create: 按编码查找，不存在则写入
//   - max_code: 读取编码序列当前最大值
// 所有函数接受 &Connection，可在事务内调用（Transaction 可解引用为 Connection）
// ==========================================

use crate::domain::import::InsertCounts;
use crate::domain::invoice::{
    Customer, CustomerGroup, Invoice, InvoiceLine, Product, ProductCategory, Store,
};
use crate::domain::types::{CodeSeries, EntityKind};
use crate::repository::error::RepositoryResult;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 从 TEXT 列读取 Decimal
pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 从 TEXT 列读取可空 Decimal（聚合结果为空时返回 0）
pub(crate) fn decimal_column_or_zero(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Decimal::ZERO),
        Some(s) => Decimal::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

// ==========================================
// InsertIfAbsent - 可按自然键幂等写入的记录
// ==========================================
pub trait InsertIfAbsent {
    const ENTITY: EntityKind;

    /// 写入记录；自然键已存在时不做任何修改
    ///
    /// # 返回
    /// - Ok(true): 新写入
    /// - Ok(false): 已存在，跳过
    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool>;
}

// ==========================================
// CodedRecord - 以单一业务编码为自然键的记录
// ==========================================
pub trait CodedRecord: InsertIfAbsent + Sized {
    fn code(&self) -> &str;

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>>;
}

impl InsertIfAbsent for Store {
    const ENTITY: EntityKind = EntityKind::Store;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            "INSERT OR IGNORE INTO store (store_code, enterprise, address) VALUES (?1, ?2, ?3)",
            params![self.store_code, self.enterprise, self.address],
        )?;
        Ok(n > 0)
    }
}

impl CodedRecord for Store {
    fn code(&self) -> &str {
        &self.store_code
    }

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            "SELECT store_code, enterprise, address FROM store WHERE store_code = ?1",
            params![code],
            |row| {
                Ok(Store {
                    store_code: row.get(0)?,
                    enterprise: row.get(1)?,
                    address: row.get(2)?,
                })
            },
        )
        .optional()
    }
}

impl InsertIfAbsent for CustomerGroup {
    const ENTITY: EntityKind = EntityKind::CustomerGroup;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            "INSERT OR IGNORE INTO customer_group (group_code, group_info) VALUES (?1, ?2)",
            params![self.group_code, self.group_info],
        )?;
        Ok(n > 0)
    }
}

impl CodedRecord for CustomerGroup {
    fn code(&self) -> &str {
        &self.group_code
    }

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            "SELECT group_code, group_info FROM customer_group WHERE group_code = ?1",
            params![code],
            |row| {
                Ok(CustomerGroup {
                    group_code: row.get(0)?,
                    group_info: row.get(1)?,
                })
            },
        )
        .optional()
    }
}

impl InsertIfAbsent for Customer {
    const ENTITY: EntityKind = EntityKind::Customer;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            "INSERT OR IGNORE INTO customer (customer_code, group_code) VALUES (?1, ?2)",
            params![self.customer_code, self.group_code],
        )?;
        Ok(n > 0)
    }
}

impl CodedRecord for Customer {
    fn code(&self) -> &str {
        &self.customer_code
    }

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            "SELECT customer_code, group_code FROM customer WHERE customer_code = ?1",
            params![code],
            |row| {
                Ok(Customer {
                    customer_code: row.get(0)?,
                    group_code: row.get(1)?,
                })
            },
        )
        .optional()
    }
}

impl InsertIfAbsent for ProductCategory {
    const ENTITY: EntityKind = EntityKind::ProductCategory;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            "INSERT OR IGNORE INTO product_category (category_code, category_name) VALUES (?1, ?2)",
            params![self.category_code, self.category_name],
        )?;
        Ok(n > 0)
    }
}

impl CodedRecord for ProductCategory {
    fn code(&self) -> &str {
        &self.category_code
    }

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            "SELECT category_code, category_name FROM product_category WHERE category_code = ?1",
            params![code],
            |row| {
                Ok(ProductCategory {
                    category_code: row.get(0)?,
                    category_name: row.get(1)?,
                })
            },
        )
        .optional()
    }
}

impl InsertIfAbsent for Product {
    const ENTITY: EntityKind = EntityKind::Product;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            r#"
            INSERT OR IGNORE INTO product (
                product_code, category_code, product_name, unit, unit_price
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                self.product_code,
                self.category_code,
                self.product_name,
                self.unit,
                self.unit_price.to_string(),
            ],
        )?;
        Ok(n > 0)
    }
}

impl CodedRecord for Product {
    fn code(&self) -> &str {
        &self.product_code
    }

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            r#"
            SELECT product_code, category_code, product_name, unit, unit_price
            FROM product WHERE product_code = ?1
            "#,
            params![code],
            |row| {
                Ok(Product {
                    product_code: row.get(0)?,
                    category_code: row.get(1)?,
                    product_name: row.get(2)?,
                    unit: row.get(3)?,
                    unit_price: decimal_column(row, 4)?,
                })
            },
        )
        .optional()
    }
}

impl InsertIfAbsent for Invoice {
    const ENTITY: EntityKind = EntityKind::Invoice;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            r#"
            INSERT OR IGNORE INTO invoice (invoice_code, store_code, customer_code, year, month)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                self.invoice_code,
                self.store_code,
                self.customer_code,
                self.year,
                self.month,
            ],
        )?;
        Ok(n > 0)
    }
}

impl CodedRecord for Invoice {
    fn code(&self) -> &str {
        &self.invoice_code
    }

    fn find_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            r#"
            SELECT invoice_code, store_code, customer_code, year, month
            FROM invoice WHERE invoice_code = ?1
            "#,
            params![code],
            |row| {
                Ok(Invoice {
                    invoice_code: row.get(0)?,
                    store_code: row.get(1)?,
                    customer_code: row.get(2)?,
                    year: row.get(3)?,
                    month: row.get(4)?,
                })
            },
        )
        .optional()
    }
}

// 明细行自然身份为 (invoice_code, line_no)
impl InsertIfAbsent for InvoiceLine {
    const ENTITY: EntityKind = EntityKind::InvoiceLine;

    fn insert_if_absent(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let n = conn.execute(
            r#"
            INSERT OR IGNORE INTO invoice_line (
                invoice_code, line_no, product_code, quantity, subtotal
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                self.invoice_code,
                self.line_no,
                self.product_code,
                self.quantity,
                self.subtotal.to_string(),
            ],
        )?;
        Ok(n > 0)
    }
}

// ==========================================
// 通用操作
// ==========================================

/// 批量写入，已存在者跳过
pub fn bulk_insert_if_absent<T: InsertIfAbsent>(
    conn: &Connection,
    records: &[T],
) -> RepositoryResult<InsertCounts> {
    let mut counts = InsertCounts::default();
    for record in records {
        if record.insert_if_absent(conn)? {
            counts.inserted += 1;
        } else {
            counts.skipped += 1;
        }
    }

    tracing::debug!(
        entity = %T::ENTITY,
        inserted = counts.inserted,
        skipped = counts.skipped,
        "批量写入完成"
    );
    Ok(counts)
}

/// 按编码查找，不存在则写入；已存在时返回库中记录（不更新）
///
/// # 返回
/// - (记录, 是否新建)
pub fn get_or_create<T: CodedRecord>(conn: &Connection, record: T) -> RepositoryResult<(T, bool)> {
    if record.insert_if_absent(conn)? {
        return Ok((record, true));
    }

    let existing = T::find_by_code(conn, record.code())?.ok_or_else(|| {
        crate::repository::error::RepositoryError::not_found(T::ENTITY.to_string(), record.code())
    })?;
    Ok((existing, false))
}

/// 按编码查找
pub fn find_by_code<T: CodedRecord>(conn: &Connection, code: &str) -> RepositoryResult<Option<T>> {
    Ok(T::find_by_code(conn, code)?)
}

/// 读取编码序列当前最大值（仅统计符合序列格式的编码）
pub fn max_code(conn: &Connection, series: CodeSeries) -> RepositoryResult<Option<String>> {
    let column = match series {
        CodeSeries::Customer => "customer_code",
        CodeSeries::Invoice => "invoice_code",
    };
    let sql = format!(
        "SELECT MAX({col}) FROM {table} WHERE {col} GLOB ?1",
        col = column,
        table = series.entity().table_name(),
    );

    let max: Option<String> = conn.query_row(&sql, params![series.glob_pattern()], |row| row.get(0))?;
    Ok(max)
}

/// 统计实体记录数
pub fn count_rows(conn: &Connection, entity: EntityKind) -> RepositoryResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", entity.table_name());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as usize)
}
