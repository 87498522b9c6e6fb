// ==========================================
// 销售发票管理系统 - 基础资料仓储
// ==========================================
// 职责: 门店 / 客户分组 / 商品类别 / 商品 的创建与查询
// 创建语义: get-or-create，已存在时返回库中记录，不更新
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::invoice::{CustomerGroup, Product, ProductCategory, Store};
use crate::domain::types::EntityKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence::{self, decimal_column};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
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

    // ===== 创建 =====

    pub fn get_or_create_store(&self, store: Store) -> RepositoryResult<(Store, bool)> {
        let conn = self.get_conn()?;
        persistence::get_or_create(&conn, store)
    }

    pub fn get_or_create_customer_group(
        &self,
        group: CustomerGroup,
    ) -> RepositoryResult<(CustomerGroup, bool)> {
        let conn = self.get_conn()?;
        persistence::get_or_create(&conn, group)
    }

    pub fn get_or_create_category(
        &self,
        category: ProductCategory,
    ) -> RepositoryResult<(ProductCategory, bool)> {
        let conn = self.get_conn()?;
        persistence::get_or_create(&conn, category)
    }

    /// 商品所属类别必须已存在
    pub fn get_or_create_product(&self, product: Product) -> RepositoryResult<(Product, bool)> {
        let conn = self.get_conn()?;
        if persistence::find_by_code::<ProductCategory>(&conn, &product.category_code)?.is_none() {
            return Err(RepositoryError::not_found(
                EntityKind::ProductCategory.to_string(),
                product.category_code.as_str(),
            ));
        }
        persistence::get_or_create(&conn, product)
    }

    // ===== 查询 =====

    pub fn find_store(&self, store_code: &str) -> RepositoryResult<Option<Store>> {
        let conn = self.get_conn()?;
        persistence::find_by_code(&conn, store_code)
    }

    pub fn find_product(&self, product_code: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        persistence::find_by_code(&conn, product_code)
    }

    pub fn list_stores(&self) -> RepositoryResult<Vec<Store>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT store_code, enterprise, address FROM store ORDER BY store_code")?;
        let stores = stmt
            .query_map([], |row| {
                Ok(Store {
                    store_code: row.get(0)?,
                    enterprise: row.get(1)?,
                    address: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stores)
    }

    pub fn list_customer_groups(&self) -> RepositoryResult<Vec<CustomerGroup>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT group_code, group_info FROM customer_group ORDER BY group_code")?;
        let groups = stmt
            .query_map([], |row| {
                Ok(CustomerGroup {
                    group_code: row.get(0)?,
                    group_info: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    pub fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT product_code, category_code, product_name, unit, unit_price
            FROM product
            ORDER BY product_code
            "#,
        )?;
        let products = stmt
            .query_map([], |row| {
                Ok(Product {
                    product_code: row.get(0)?,
                    category_code: row.get(1)?,
                    product_name: row.get(2)?,
                    unit: row.get(3)?,
                    unit_price: decimal_column(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }
}
