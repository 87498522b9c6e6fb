// ==========================================
// 销售发票管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接和 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{CatalogApi, ConfigApi, ImportApi, InvoiceApi, ReportApi};
use crate::config::config_manager::ConfigManager;
use crate::db::open_and_init;

/// 默认数据库文件名
const DB_FILE_NAME: &str = "sales_invoicing.db";

/// 应用状态
///
/// 所有 API 共享同一连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 销售导入API
    pub import_api: Arc<ImportApi>,

    /// 发票API
    pub invoice_api: Arc<InvoiceApi>,

    /// 基础资料API
    pub catalog_api: Arc<CatalogApi>,

    /// 报表API
    pub report_api: Arc<ReportApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 打开数据库（必要时建表）并初始化所有 API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_and_init(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let state = Self {
            import_api: Arc::new(ImportApi::new(conn.clone())),
            invoice_api: Arc::new(InvoiceApi::new(conn.clone())),
            catalog_api: Arc::new(CatalogApi::new(conn.clone())),
            report_api: Arc::new(ReportApi::new(conn.clone())),
            config_api: Arc::new(ConfigApi::new(config_manager)),
            conn,
            db_path,
        };

        tracing::info!("AppState初始化完成");
        Ok(state)
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 SALES_INVOICING_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("SALES_INVOICING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(format!("./{}", DB_FILE_NAME));

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("sales-invoicing");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join(DB_FILE_NAME),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "无法创建数据目录，使用当前目录"),
        }
    }

    path.to_string_lossy().to_string()
}
