// ==========================================
// 发票 API
// ==========================================
// 职责: 发票查询、维护与新建
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::invoice::{
    Invoice, InvoiceDetail, InvoiceLine, InvoiceSummary, LineRemoval, NewInvoiceLine,
};
use crate::repository::InvoiceRepository;
use chrono::{Datelike, Local};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 发票分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// 发票 API
pub struct InvoiceApi {
    conn: Arc<Mutex<Connection>>,
    invoice_repo: InvoiceRepository,
}

impl InvoiceApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            invoice_repo: InvoiceRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// 分页查询发票
    pub fn list_invoices(&self, limit: i64, offset: i64) -> ApiResult<InvoicePage> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        if offset < 0 {
            return Err(ApiError::InvalidInput("offset 不能为负".to_string()));
        }

        Ok(InvoicePage {
            invoices: self.invoice_repo.list_invoices(limit, offset)?,
            total: self.invoice_repo.count_invoices()?,
            limit,
            offset,
        })
    }

    pub fn get_invoice_detail(&self, invoice_code: &str) -> ApiResult<InvoiceDetail> {
        Ok(self.invoice_repo.get_invoice_detail(require_code("invoice_code", invoice_code)?)?)
    }

    /// 修改发票抬头（门店、客户、期间）
    pub fn update_invoice(
        &self,
        invoice_code: &str,
        store_code: &str,
        customer_code: &str,
        year: i32,
        month: u32,
    ) -> ApiResult<InvoiceDetail> {
        let invoice = Invoice {
            invoice_code: require_code("invoice_code", invoice_code)?.to_string(),
            store_code: require_code("store_code", store_code)?.to_string(),
            customer_code: require_code("customer_code", customer_code)?.to_string(),
            year,
            month,
        };
        Ok(self.invoice_repo.update_invoice(&invoice)?)
    }

    pub fn update_line_quantity(&self, line_id: i64, quantity: i64) -> ApiResult<InvoiceLine> {
        Ok(self.invoice_repo.update_line_quantity(line_id, quantity)?)
    }

    pub fn delete_line(&self, line_id: i64) -> ApiResult<LineRemoval> {
        Ok(self.invoice_repo.delete_line(line_id)?)
    }

    /// 新建发票（当前年月），为其生成新客户
    pub async fn create_invoice(
        &self,
        store_code: &str,
        group_code: &str,
        lines: Vec<NewInvoiceLine>,
    ) -> ApiResult<InvoiceDetail> {
        let store_code = require_code("store_code", store_code)?;
        let group_code = require_code("group_code", group_code)?;
        if lines.is_empty() {
            return Err(ApiError::InvalidInput("发票至少需要一行明细".to_string()));
        }

        let config = ConfigManager::from_connection(self.conn.clone())?;
        let max_attempts = config.get_codegen_max_attempts().await?;

        let today = Local::now();
        let repo = InvoiceRepository::from_connection(self.conn.clone())
            .with_max_attempts(max_attempts);

        Ok(repo.create_invoice(store_code, group_code, today.year(), today.month(), &lines)?)
    }
}

fn require_code<'a>(field: &str, code: &'a str) -> ApiResult<&'a str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{} 不能为空", field)));
    }
    Ok(trimmed)
}
