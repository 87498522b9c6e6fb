// ==========================================
// 销售数据导入 API
// ==========================================
// 职责: 封装销售数据导入相关功能
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::import::{ImportBatch, ImportReport};
use crate::importer::{SalesImporter, SalesImporterImpl, SalesRowMapper, UniversalFileParser};
use crate::repository::{SalesImportRepository, SalesImportRepositoryImpl};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 批量导入中单个文件的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportItem {
    pub file_path: String,
    pub report: Option<ImportReport>,
    pub error: Option<String>,
}

/// 导入 API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
}

impl ImportApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 导入单个销售文件（.csv / .xlsx / .xls）
    ///
    /// # 返回
    /// - Ok(ImportReport): 落库统计与被隔离的错误行
    /// - Err(ApiError::MalformedRow): ABORT_BATCH 策略下的首个错误行（未落库）
    pub async fn import_file(&self, file_path: &str) -> ApiResult<ImportReport> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        if !Path::new(file_path).exists() {
            return Err(ApiError::InvalidInput(format!("文件不存在: {}", file_path)));
        }

        let importer = self.create_importer()?;
        Ok(importer.import_file(file_path).await?)
    }

    /// 批量导入多个文件（各文件独立成批，互不影响）
    pub async fn batch_import(&self, file_paths: Vec<String>) -> ApiResult<Vec<BatchImportItem>> {
        let importer = self.create_importer()?;
        let results = importer.batch_import(file_paths.clone()).await;

        Ok(file_paths
            .into_iter()
            .zip(results)
            .map(|(file_path, result)| match result {
                Ok(report) => BatchImportItem {
                    file_path,
                    report: Some(report),
                    error: None,
                },
                Err(error) => BatchImportItem {
                    file_path,
                    report: None,
                    error: Some(error),
                },
            })
            .collect())
    }

    /// 最近的导入批次
    pub async fn list_recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        let repo = SalesImportRepositoryImpl::from_connection(self.conn.clone());
        Ok(repo.get_recent_batches(limit).await?)
    }

    fn create_importer(
        &self,
    ) -> ApiResult<SalesImporterImpl<SalesImportRepositoryImpl, ConfigManager>> {
        let import_repo = SalesImportRepositoryImpl::from_connection(self.conn.clone());
        let config = ConfigManager::from_connection(self.conn.clone())?;

        Ok(SalesImporterImpl::new(
            import_repo,
            config,
            Box::new(UniversalFileParser),
            Box::new(SalesRowMapper),
        ))
    }
}
