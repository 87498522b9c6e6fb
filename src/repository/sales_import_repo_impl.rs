// ==========================================
// 销售发票管理系统 - 销售导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{FlushReport, ImportBatch, ReconciledBatch};
use crate::domain::types::EntityKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence;
use crate::repository::sales_import_repo::SalesImportRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

fn text_conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

// ==========================================
// SalesImportRepositoryImpl
// ==========================================
pub struct SalesImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl SalesImportRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中按外键顺序写入
    fn flush_batch_tx(tx: &Transaction, batch: &ReconciledBatch) -> RepositoryResult<FlushReport> {
        Ok(FlushReport {
            stores: persistence::bulk_insert_if_absent(tx, batch.stores.records())?,
            customer_groups: persistence::bulk_insert_if_absent(tx, batch.customer_groups.records())?,
            customers: persistence::bulk_insert_if_absent(tx, batch.customers.records())?,
            product_categories: persistence::bulk_insert_if_absent(
                tx,
                batch.product_categories.records(),
            )?,
            products: persistence::bulk_insert_if_absent(tx, batch.products.records())?,
            invoices: persistence::bulk_insert_if_absent(tx, batch.invoices.records())?,
            invoice_lines: persistence::bulk_insert_if_absent(tx, &batch.lines)?,
        })
    }
}

#[async_trait]
impl SalesImportRepository for SalesImportRepositoryImpl {
    async fn flush_batch(&self, batch: &ReconciledBatch) -> RepositoryResult<FlushReport> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 出错时 tx 析构自动回滚
        let report = Self::flush_batch_tx(&tx, batch)?;

        tx.commit()?;
        Ok(report)
    }

    async fn insert_batch(&self, batch: ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, failure_policy, amount_policy,
                total_rows, accepted_rows, rejected_rows, inserted_rows,
                elapsed_ms, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.failure_policy.to_string(),
                batch.amount_policy.to_string(),
                batch.total_rows as i64,
                batch.accepted_rows as i64,
                batch.rejected_rows as i64,
                batch.inserted_rows as i64,
                batch.elapsed_ms as i64,
                batch.imported_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, failure_policy, amount_policy,
                   total_rows, accepted_rows, rejected_rows, inserted_rows,
                   elapsed_ms, imported_at
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit as i64], |row| {
                let failure_policy: String = row.get(2)?;
                let amount_policy: String = row.get(3)?;
                let imported_at: String = row.get(9)?;
                Ok(ImportBatch {
                    batch_id: row.get(0)?,
                    file_name: row.get(1)?,
                    failure_policy: failure_policy
                        .parse()
                        .map_err(|e| text_conversion_error(2, e))?,
                    amount_policy: amount_policy
                        .parse()
                        .map_err(|e| text_conversion_error(3, e))?,
                    total_rows: row.get::<_, i64>(4)? as usize,
                    accepted_rows: row.get::<_, i64>(5)? as usize,
                    rejected_rows: row.get::<_, i64>(6)? as usize,
                    inserted_rows: row.get::<_, i64>(7)? as usize,
                    elapsed_ms: row.get::<_, i64>(8)? as u64,
                    imported_at: DateTime::parse_from_rfc3339(&imported_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| text_conversion_error(9, e.to_string()))?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }

    async fn count_rows(&self, entity: EntityKind) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        persistence::count_rows(&conn, entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::invoice::{
        Customer, CustomerGroup, Invoice, InvoiceLine, Product, ProductCategory, Store,
    };
    use crate::domain::types::{AmountPolicy, FailurePolicy};
    use rust_decimal::Decimal;

    fn test_repo() -> SalesImportRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SalesImportRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn sample_batch(invoice_code: &str, line_count: u32) -> ReconciledBatch {
        let mut batch = ReconciledBatch::default();
        batch.stores.get_or_insert_with("S1", || Store {
            store_code: "S1".to_string(),
            enterprise: "E1".to_string(),
            address: "Addr".to_string(),
        });
        batch.customer_groups.get_or_insert_with("G1", || CustomerGroup {
            group_code: "G1".to_string(),
            group_info: "Info".to_string(),
        });
        batch.customers.get_or_insert_with("C1", || Customer {
            customer_code: "C1".to_string(),
            group_code: "G1".to_string(),
        });
        batch.product_categories.get_or_insert_with("P1", || ProductCategory {
            category_code: "P1".to_string(),
            category_name: "P1".to_string(),
        });
        batch.products.get_or_insert_with("PR1", || Product {
            product_code: "PR1".to_string(),
            category_code: "P1".to_string(),
            product_name: "Widget".to_string(),
            unit: "pcs".to_string(),
            unit_price: Decimal::from(9),
        });
        batch.invoices.get_or_insert_with(invoice_code, || Invoice {
            invoice_code: invoice_code.to_string(),
            store_code: "S1".to_string(),
            customer_code: "C1".to_string(),
            year: 2023,
            month: 5,
        });
        for line_no in 1..=line_count {
            batch.lines.push(InvoiceLine {
                line_id: None,
                invoice_code: invoice_code.to_string(),
                line_no,
                product_code: "PR1".to_string(),
                quantity: 3,
                subtotal: Decimal::from(27),
            });
        }
        batch
    }

    #[tokio::test]
    async fn test_flush_batch_is_idempotent() {
        let repo = test_repo();
        let batch = sample_batch("B000000001", 2);

        let first = repo.flush_batch(&batch).await.unwrap();
        assert_eq!(first.total_inserted(), 8);
        assert_eq!(first.invoice_lines.inserted, 2);

        let second = repo.flush_batch(&batch).await.unwrap();
        assert_eq!(second.total_inserted(), 0);
        assert_eq!(second.invoice_lines.skipped, 2);

        assert_eq!(repo.count_rows(EntityKind::InvoiceLine).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_flush_batch_rolls_back_on_error() {
        let repo = test_repo();
        let mut batch = sample_batch("B000000001", 1);
        // 引用不存在的商品，明细行写入失败
        batch.lines[0].product_code = "MISSING".to_string();

        let err = repo.flush_batch(&batch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));

        assert_eq!(repo.count_rows(EntityKind::Store).await.unwrap(), 0);
        assert_eq!(repo.count_rows(EntityKind::Invoice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_record_round_trip() {
        let repo = test_repo();
        let imported_at = DateTime::parse_from_rfc3339("2024-03-01T08:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let batch = ImportBatch {
            batch_id: "b-1".to_string(),
            file_name: Some("sales.csv".to_string()),
            failure_policy: FailurePolicy::SkipInvalidRows,
            amount_policy: AmountPolicy::LineTotal,
            total_rows: 10,
            accepted_rows: 9,
            rejected_rows: 1,
            inserted_rows: 30,
            elapsed_ms: 12,
            imported_at,
        };

        repo.insert_batch(batch.clone()).await.unwrap();
        let recent = repo.get_recent_batches(5).await.unwrap();
        assert_eq!(recent, vec![batch]);
    }
}
