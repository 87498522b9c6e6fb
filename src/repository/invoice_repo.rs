// ==========================================
// 销售发票管理系统 - 发票数据仓储
// ==========================================
// 职责: 发票列表/详情查询、抬头与明细维护、新建发票
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 新建发票在 BEGIN IMMEDIATE 事务中分配编码，写锁被占用时重试
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::invoice::{
    Customer, CustomerGroup, Invoice, InvoiceDetail, InvoiceLine, InvoiceLineView,
    InvoiceSummary, LineRemoval, NewInvoiceLine, Product, Store,
};
use crate::domain::types::{CodeSeries, EntityKind};
use crate::engine::code_series::next_code;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence::{self, decimal_column, CodedRecord};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// 获取写锁的默认尝试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ==========================================
// InvoiceRepository - 发票仓储
// ==========================================
pub struct InvoiceRepository {
    conn: Arc<Mutex<Connection>>,
    max_attempts: u32,
}

impl InvoiceRepository {
    /// 创建新的发票仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// 设置获取写锁的尝试次数（至少 1 次）
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 分页查询发票（按编码倒序），附带合计与明细行数
    pub fn list_invoices(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<InvoiceSummary>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT invoice_code, store_code, customer_code, year, month
            FROM invoice
            ORDER BY invoice_code DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;

        let invoices = stmt
            .query_map(params![limit, offset], map_invoice)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut summaries = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let subtotals = line_subtotals(&conn, &invoice.invoice_code)?;
            summaries.push(InvoiceSummary {
                line_count: subtotals.len() as i64,
                total_price: sum_subtotals(&subtotals)?,
                invoice,
            });
        }

        Ok(summaries)
    }

    /// 发票总数
    pub fn count_invoices(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(persistence::count_rows(&conn, EntityKind::Invoice)? as i64)
    }

    /// 发票详情
    ///
    /// # 返回
    /// - Err(NotFound): 发票不存在
    pub fn get_invoice_detail(&self, invoice_code: &str) -> RepositoryResult<InvoiceDetail> {
        let conn = self.get_conn()?;
        load_detail(&conn, invoice_code)
    }

    // ==========================================
    // 维护
    // ==========================================

    /// 修改发票抬头
    pub fn update_invoice(&self, invoice: &Invoice) -> RepositoryResult<InvoiceDetail> {
        if !(1..=12).contains(&invoice.month) {
            return Err(RepositoryError::FieldValueError {
                field: "month".to_string(),
                message: format!("月份超出范围: {}", invoice.month),
            });
        }

        let conn = self.get_conn()?;
        require::<Store>(&conn, &invoice.store_code)?;
        require::<Customer>(&conn, &invoice.customer_code)?;

        let updated = conn.execute(
            r#"
            UPDATE invoice
            SET store_code = ?2, customer_code = ?3, year = ?4, month = ?5
            WHERE invoice_code = ?1
            "#,
            params![
                invoice.invoice_code,
                invoice.store_code,
                invoice.customer_code,
                invoice.year,
                invoice.month,
            ],
        )?;
        if updated == 0 {
            return Err(RepositoryError::not_found(
                EntityKind::Invoice.to_string(),
                invoice.invoice_code.as_str(),
            ));
        }

        info!(invoice_code = %invoice.invoice_code, "发票抬头已更新");
        load_detail(&conn, &invoice.invoice_code)
    }

    /// 修改明细行数量，小计按商品现行单价重算
    pub fn update_line_quantity(&self, line_id: i64, quantity: i64) -> RepositoryResult<InvoiceLine> {
        if quantity <= 0 {
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!("数量必须大于 0: {}", quantity),
            });
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut line = find_line(&tx, line_id)?;
        let product = require::<Product>(&tx, &line.product_code)?;

        line.quantity = quantity;
        line.subtotal = checked_subtotal(&product, quantity)?;

        tx.execute(
            "UPDATE invoice_line SET quantity = ?2, subtotal = ?3 WHERE line_id = ?1",
            params![line_id, line.quantity, line.subtotal.to_string()],
        )?;
        tx.commit()?;

        debug!(line_id, quantity, subtotal = %line.subtotal, "明细行数量已更新");
        Ok(line)
    }

    /// 删除明细行；若为发票最后一行则一并删除发票
    pub fn delete_line(&self, line_id: i64) -> RepositoryResult<LineRemoval> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let line = find_line(&tx, line_id)?;
        tx.execute("DELETE FROM invoice_line WHERE line_id = ?1", params![line_id])?;

        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM invoice_line WHERE invoice_code = ?1",
            params![line.invoice_code],
            |row| row.get(0),
        )?;

        let removal = if remaining == 0 {
            tx.execute(
                "DELETE FROM invoice WHERE invoice_code = ?1",
                params![line.invoice_code],
            )?;
            LineRemoval::InvoiceRemoved
        } else {
            LineRemoval::LineRemoved
        };

        tx.commit()?;
        info!(line_id, invoice_code = %line.invoice_code, ?removal, "明细行已删除");
        Ok(removal)
    }

    // ==========================================
    // 新建发票
    // ==========================================

    /// 新建发票：生成新客户（CUS 序列）与新发票（B 序列），写入明细
    ///
    /// # 参数
    /// - store_code: 开票门店（必须存在）
    /// - group_code: 新客户所属分组（必须存在）
    /// - year / month: 发票期间
    /// - lines: 明细（商品必须存在，数量 > 0）
    ///
    /// # 返回
    /// - Ok(InvoiceDetail): 新建的发票详情
    /// - Err(GenerationRace): max_attempts 次均未获得写锁
    pub fn create_invoice(
        &self,
        store_code: &str,
        group_code: &str,
        year: i32,
        month: u32,
        lines: &[NewInvoiceLine],
    ) -> RepositoryResult<InvoiceDetail> {
        if lines.is_empty() {
            return Err(RepositoryError::ValidationError("发票至少需要一行明细".to_string()));
        }
        if !(1..=12).contains(&month) {
            return Err(RepositoryError::FieldValueError {
                field: "month".to_string(),
                message: format!("月份超出范围: {}", month),
            });
        }
        if let Some(bad) = lines.iter().find(|l| l.quantity <= 0) {
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!("数量必须大于 0: {} ({})", bad.quantity, bad.product_code),
            });
        }

        let conn = self.get_conn()?;

        for attempt in 1..=self.max_attempts {
            // 写锁事务: 读取最大编码与写入之间不允许其他写者插入
            let tx = match Transaction::new_unchecked(&conn, TransactionBehavior::Immediate) {
                Ok(tx) => tx,
                Err(e) if is_busy(&e) => {
                    warn!(attempt, max_attempts = self.max_attempts, "写锁被占用，重试");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let invoice_code =
                Self::allocate_invoice_tx(&tx, store_code, group_code, year, month, lines)?;
            let detail = load_detail(&tx, &invoice_code)?;
            tx.commit()?;
            info!(
                invoice_code = %invoice_code,
                customer_code = %detail.invoice.customer_code,
                attempt,
                "发票已创建"
            );
            return Ok(detail);
        }

        Err(RepositoryError::GenerationRace {
            series: CodeSeries::Invoice.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// 在写锁事务中分配客户与发票编码并写入，返回发票编码
    fn allocate_invoice_tx(
        tx: &Transaction,
        store_code: &str,
        group_code: &str,
        year: i32,
        month: u32,
        lines: &[NewInvoiceLine],
    ) -> RepositoryResult<String> {
        require::<Store>(tx, store_code)?;
        require::<CustomerGroup>(tx, group_code)?;

        // 先校验商品与小计，再分配编码
        let mut subtotals = Vec::with_capacity(lines.len());
        for line in lines {
            let product = require::<Product>(tx, &line.product_code)?;
            subtotals.push(checked_subtotal(&product, line.quantity)?);
        }

        let max_customer = persistence::max_code(tx, CodeSeries::Customer)?;
        let customer_code = next_code(CodeSeries::Customer, max_customer.as_deref())?;
        tx.execute(
            "INSERT INTO customer (customer_code, group_code) VALUES (?1, ?2)",
            params![customer_code, group_code],
        )?;

        let max_invoice = persistence::max_code(tx, CodeSeries::Invoice)?;
        let invoice_code = next_code(CodeSeries::Invoice, max_invoice.as_deref())?;
        tx.execute(
            r#"
            INSERT INTO invoice (invoice_code, store_code, customer_code, year, month)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![invoice_code, store_code, customer_code, year, month],
        )?;

        let mut invoice_lines = Vec::with_capacity(lines.len());
        for (idx, (line, subtotal)) in lines.iter().zip(&subtotals).enumerate() {
            invoice_lines.push(InvoiceLine {
                line_id: None,
                invoice_code: invoice_code.clone(),
                line_no: idx as u32 + 1,
                product_code: line.product_code.clone(),
                quantity: line.quantity,
                subtotal: *subtotal,
            });
        }
        persistence::bulk_insert_if_absent(tx, &invoice_lines)?;

        Ok(invoice_code)
    }
}

// ==========================================
// 辅助函数（接受 &Connection，可在事务内使用）
// ==========================================

fn map_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        invoice_code: row.get(0)?,
        store_code: row.get(1)?,
        customer_code: row.get(2)?,
        year: row.get(3)?,
        month: row.get(4)?,
    })
}

/// 按编码查找，不存在时返回 NotFound
fn require<T: CodedRecord>(conn: &Connection, code: &str) -> RepositoryResult<T> {
    persistence::find_by_code::<T>(conn, code)?
        .ok_or_else(|| RepositoryError::not_found(T::ENTITY.to_string(), code))
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// 单价 × 数量，溢出时返回 FieldValueError
fn checked_subtotal(product: &Product, quantity: i64) -> RepositoryResult<Decimal> {
    product.subtotal_for(quantity).ok_or_else(|| RepositoryError::FieldValueError {
        field: "quantity".to_string(),
        message: format!(
            "小计溢出: {} × {} ({})",
            product.unit_price, quantity, product.product_code
        ),
    })
}

/// 小计求和，溢出时返回 FieldValueError
fn sum_subtotals(subtotals: &[Decimal]) -> RepositoryResult<Decimal> {
    subtotals
        .iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(*s))
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: "subtotal".to_string(),
            message: "发票合计溢出".to_string(),
        })
}

fn line_subtotals(conn: &Connection, invoice_code: &str) -> RepositoryResult<Vec<Decimal>> {
    let mut stmt = conn.prepare("SELECT subtotal FROM invoice_line WHERE invoice_code = ?1")?;
    let subtotals = stmt
        .query_map(params![invoice_code], |row| decimal_column(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subtotals)
}

fn find_line(conn: &Connection, line_id: i64) -> RepositoryResult<InvoiceLine> {
    conn.query_row(
        r#"
        SELECT line_id, invoice_code, line_no, product_code, quantity, subtotal
        FROM invoice_line WHERE line_id = ?1
        "#,
        params![line_id],
        |row| {
            Ok(InvoiceLine {
                line_id: row.get(0)?,
                invoice_code: row.get(1)?,
                line_no: row.get(2)?,
                product_code: row.get(3)?,
                quantity: row.get(4)?,
                subtotal: decimal_column(row, 5)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| RepositoryError::not_found(EntityKind::InvoiceLine.to_string(), line_id.to_string()))
}

fn load_detail(conn: &Connection, invoice_code: &str) -> RepositoryResult<InvoiceDetail> {
    let invoice = require::<Invoice>(conn, invoice_code)?;

    let mut stmt = conn.prepare(
        r#"
        SELECT l.line_id, l.invoice_code, l.line_no, l.product_code, l.quantity, l.subtotal,
               p.product_name, p.unit, p.unit_price
        FROM invoice_line l
        JOIN product p ON p.product_code = l.product_code
        WHERE l.invoice_code = ?1
        ORDER BY l.line_no
        "#,
    )?;

    let lines = stmt
        .query_map(params![invoice_code], |row| {
            Ok(InvoiceLineView {
                line: InvoiceLine {
                    line_id: row.get(0)?,
                    invoice_code: row.get(1)?,
                    line_no: row.get(2)?,
                    product_code: row.get(3)?,
                    quantity: row.get(4)?,
                    subtotal: decimal_column(row, 5)?,
                },
                product_name: row.get(6)?,
                unit: row.get(7)?,
                unit_price: decimal_column(row, 8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let subtotals: Vec<Decimal> = lines.iter().map(|l| l.line.subtotal).collect();
    let total_price = sum_subtotals(&subtotals)?;
    Ok(InvoiceDetail {
        invoice,
        lines,
        total_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use std::str::FromStr;

    const SEED_SQL: &str = r#"
        INSERT INTO store VALUES ('S1', 'E1', 'Addr');
        INSERT INTO customer_group VALUES ('G1', 'Retail');
        INSERT INTO customer VALUES ('C1', 'G1');
        INSERT INTO product_category VALUES ('P1', 'P1');
        INSERT INTO product VALUES ('PR1', 'P1', 'Widget', 'pcs', '9.5');
        INSERT INTO product VALUES ('PR2', 'P1', 'Gadget', 'box', '2');
        INSERT INTO product VALUES ('PRMAX', 'P1', 'Bulk', 'lot', '79228162514264337593543950335');
        INSERT INTO invoice VALUES ('B000000007', 'S1', 'C1', 2023, 5);
        INSERT INTO invoice_line (invoice_code, line_no, product_code, quantity, subtotal)
            VALUES ('B000000007', 1, 'PR1', 2, '19.0');
        INSERT INTO invoice_line (invoice_code, line_no, product_code, quantity, subtotal)
            VALUES ('B000000007', 2, 'PR2', 3, '6');
    "#;

    fn seeded_repo() -> InvoiceRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(SEED_SQL).unwrap();
        InvoiceRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 文件库（多连接并发测试用）
    fn seeded_file_db() -> (tempfile::NamedTempFile, String) {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();
        let conn = crate::db::open_and_init(&path).unwrap();
        conn.execute_batch(SEED_SQL).unwrap();
        (temp, path)
    }

    fn one_line(product_code: &str, quantity: i64) -> Vec<NewInvoiceLine> {
        vec![NewInvoiceLine {
            product_code: product_code.to_string(),
            quantity,
        }]
    }

    fn line_ids(repo: &InvoiceRepository, code: &str) -> Vec<i64> {
        repo.get_invoice_detail(code)
            .unwrap()
            .lines
            .iter()
            .map(|l| l.line.line_id.unwrap())
            .collect()
    }

    #[test]
    fn test_list_invoices_with_totals() {
        let repo = seeded_repo();

        let page = repo.list_invoices(10, 0).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].line_count, 2);
        assert_eq!(page[0].total_price, Decimal::from(25));
        assert_eq!(repo.count_invoices().unwrap(), 1);
    }

    #[test]
    fn test_detail_not_found() {
        let repo = seeded_repo();
        let err = repo.get_invoice_detail("B999999999").unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_update_line_quantity_recomputes_subtotal() {
        let repo = seeded_repo();
        let ids = line_ids(&repo, "B000000007");

        let line = repo.update_line_quantity(ids[0], 4).unwrap();
        assert_eq!(line.subtotal, Decimal::from(38));

        let err = repo.update_line_quantity(ids[0], 0).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }

    #[test]
    fn test_delete_last_line_removes_invoice() {
        let repo = seeded_repo();
        let ids = line_ids(&repo, "B000000007");

        assert_eq!(repo.delete_line(ids[0]).unwrap(), LineRemoval::LineRemoved);
        assert_eq!(repo.delete_line(ids[1]).unwrap(), LineRemoval::InvoiceRemoved);
        assert_eq!(repo.count_invoices().unwrap(), 0);
    }

    #[test]
    fn test_update_invoice_requires_existing_customer() {
        let repo = seeded_repo();
        let mut invoice = repo.get_invoice_detail("B000000007").unwrap().invoice;
        invoice.customer_code = "NOPE".to_string();

        let err = repo.update_invoice(&invoice).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        invoice.customer_code = "C1".to_string();
        invoice.month = 12;
        let detail = repo.update_invoice(&invoice).unwrap();
        assert_eq!(detail.invoice.month, 12);
    }

    #[test]
    fn test_create_invoice_generates_next_codes() {
        let repo = seeded_repo();
        let lines = vec![
            NewInvoiceLine {
                product_code: "PR1".to_string(),
                quantity: 2,
            },
            NewInvoiceLine {
                product_code: "PR2".to_string(),
                quantity: 1,
            },
        ];

        let first = repo.create_invoice("S1", "G1", 2024, 3, &lines).unwrap();
        assert_eq!(first.invoice.invoice_code, "B000000008");
        // 'C1' 不符合序列格式，不参与最大值计算
        assert_eq!(first.invoice.customer_code, "CUS0000001");
        assert_eq!(first.total_price, Decimal::from_str("21.0").unwrap());
        assert_eq!(first.lines[1].line.line_no, 2);

        let second = repo.create_invoice("S1", "G1", 2024, 3, &lines).unwrap();
        assert_eq!(second.invoice.invoice_code, "B000000009");
        assert_eq!(second.invoice.customer_code, "CUS0000002");
    }

    #[test]
    fn test_create_invoice_missing_product_leaves_nothing() {
        let repo = seeded_repo();
        let lines = vec![NewInvoiceLine {
            product_code: "MISSING".to_string(),
            quantity: 1,
        }];

        let err = repo.create_invoice("S1", "G1", 2024, 3, &lines).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(repo.count_invoices().unwrap(), 1);

        let conn = repo.get_conn().unwrap();
        assert!(persistence::find_by_code::<Customer>(&conn, "CUS0000001")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_line_quantity_overflow_rejected() {
        let repo = seeded_repo();
        let line_id = {
            let conn = repo.get_conn().unwrap();
            conn.execute(
                r#"
                INSERT INTO invoice_line (invoice_code, line_no, product_code, quantity, subtotal)
                VALUES ('B000000007', 3, 'PRMAX', 1, '79228162514264337593543950335')
                "#,
                [],
            )
            .unwrap();
            conn.last_insert_rowid()
        };

        let err = repo.update_line_quantity(line_id, 2).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));

        // 发票合计同样溢出时返回错误而非崩溃
        let err = repo.get_invoice_detail("B000000007").unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }

    #[test]
    fn test_create_invoice_overflow_leaves_nothing() {
        let repo = seeded_repo();

        let err = repo
            .create_invoice("S1", "G1", 2024, 3, &one_line("PRMAX", 2))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
        assert_eq!(repo.count_invoices().unwrap(), 1);

        let conn = repo.get_conn().unwrap();
        assert!(persistence::find_by_code::<Customer>(&conn, "CUS0000001")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_concurrent_create_invoice_codes_unique() {
        let (_temp, path) = seeded_file_db();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let repo = InvoiceRepository::new(&path).unwrap();
                    (0..10)
                        .map(|_| {
                            let detail = repo
                                .create_invoice("S1", "G1", 2024, 3, &one_line("PR1", 1))
                                .unwrap();
                            (detail.invoice.invoice_code, detail.invoice.customer_code)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let codes: Vec<(String, String)> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(codes.len(), 40);

        let invoices: std::collections::HashSet<_> = codes.iter().map(|(i, _)| i).collect();
        let customers: std::collections::HashSet<_> = codes.iter().map(|(_, c)| c).collect();
        assert_eq!(invoices.len(), 40);
        assert_eq!(customers.len(), 40);
        assert!(invoices.contains(&"B000000008".to_string()));
        assert!(invoices.contains(&"B000000047".to_string()));
        assert!(customers.contains(&"CUS0000040".to_string()));
    }

    #[test]
    fn test_create_invoice_write_lock_held_surfaces_generation_race() {
        let (_temp, path) = seeded_file_db();

        // 另一连接持有写锁
        let holder = crate::db::open_sqlite_connection(&path).unwrap();
        holder.execute_batch("BEGIN IMMEDIATE").unwrap();

        let conn = crate::db::open_sqlite_connection(&path).unwrap();
        conn.busy_timeout(std::time::Duration::ZERO).unwrap();
        let repo =
            InvoiceRepository::from_connection(Arc::new(Mutex::new(conn))).with_max_attempts(2);

        let err = repo
            .create_invoice("S1", "G1", 2024, 3, &one_line("PR1", 1))
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::GenerationRace { attempts: 2, .. }
        ));

        // 写锁释放后正常分配
        holder.execute_batch("ROLLBACK").unwrap();
        let detail = repo
            .create_invoice("S1", "G1", 2024, 3, &one_line("PR1", 1))
            .unwrap();
        assert_eq!(detail.invoice.invoice_code, "B000000008");
    }
}
