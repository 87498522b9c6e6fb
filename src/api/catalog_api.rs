// ==========================================
// 基础资料 API
// ==========================================
// 职责: 门店 / 客户分组 / 商品类别 / 商品的创建与查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::invoice::{CustomerGroup, Product, ProductCategory, Store};
use crate::repository::CatalogRepository;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 创建结果：已存在时 created = false，record 为库中既有记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry<T> {
    pub record: T,
    pub created: bool,
}

impl<T> From<(T, bool)> for CatalogEntry<T> {
    fn from((record, created): (T, bool)) -> Self {
        Self { record, created }
    }
}

pub struct CatalogApi {
    catalog_repo: CatalogRepository,
}

impl CatalogApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            catalog_repo: CatalogRepository::from_connection(conn),
        }
    }

    pub fn create_store(&self, store: Store) -> ApiResult<CatalogEntry<Store>> {
        ensure_code("store_code", &store.store_code)?;
        Ok(self.catalog_repo.get_or_create_store(store)?.into())
    }

    pub fn create_customer_group(&self, group: CustomerGroup) -> ApiResult<CatalogEntry<CustomerGroup>> {
        ensure_code("group_code", &group.group_code)?;
        Ok(self.catalog_repo.get_or_create_customer_group(group)?.into())
    }

    pub fn create_category(
        &self,
        category: ProductCategory,
    ) -> ApiResult<CatalogEntry<ProductCategory>> {
        ensure_code("category_code", &category.category_code)?;
        Ok(self.catalog_repo.get_or_create_category(category)?.into())
    }

    pub fn create_product(&self, product: Product) -> ApiResult<CatalogEntry<Product>> {
        ensure_code("product_code", &product.product_code)?;
        ensure_code("category_code", &product.category_code)?;
        if product.unit_price < Decimal::ZERO {
            return Err(ApiError::InvalidInput(format!(
                "单价不能为负: {}",
                product.unit_price
            )));
        }
        Ok(self.catalog_repo.get_or_create_product(product)?.into())
    }

    pub fn list_stores(&self) -> ApiResult<Vec<Store>> {
        Ok(self.catalog_repo.list_stores()?)
    }

    pub fn list_customer_groups(&self) -> ApiResult<Vec<CustomerGroup>> {
        Ok(self.catalog_repo.list_customer_groups()?)
    }

    pub fn list_products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.catalog_repo.list_products()?)
    }
}

fn ensure_code(field: &str, code: &str) -> ApiResult<()> {
    if code.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} 不能为空", field)));
    }
    Ok(())
}
