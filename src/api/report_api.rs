// ==========================================
// 报表 API
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::report::{CustomerGroupShare, InvoiceExportRow, MonthlyRevenue, ProductSales};
use crate::repository::ReportRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct ReportApi {
    report_repo: ReportRepository,
}

impl ReportApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            report_repo: ReportRepository::from_connection(conn),
        }
    }

    pub fn sales_by_product(&self) -> ApiResult<Vec<ProductSales>> {
        Ok(self.report_repo.sales_by_product()?)
    }

    pub fn customer_group_distribution(&self) -> ApiResult<Vec<CustomerGroupShare>> {
        Ok(self.report_repo.customer_group_distribution()?)
    }

    pub fn monthly_revenue(&self, year: i32) -> ApiResult<Vec<MonthlyRevenue>> {
        Ok(self.report_repo.monthly_revenue(year)?)
    }

    /// 发票导出行（按发票分页）
    pub fn invoice_export_rows(&self, limit: i64, offset: i64) -> ApiResult<Vec<InvoiceExportRow>> {
        if limit <= 0 || offset < 0 {
            return Err(ApiError::InvalidInput(format!(
                "分页参数无效: limit={}, offset={}",
                limit, offset
            )));
        }
        Ok(self.report_repo.invoice_export_rows(limit, offset)?)
    }
}
