// ==========================================
// 销售发票管理系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、快照
// 写入前校验取值，未知键拒绝
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager};
use crate::domain::types::{AmountPolicy, FailurePolicy};
use std::sync::Arc;

/// 配置管理API
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 全部 global 配置（JSON 对象）
    pub fn get_config_snapshot(&self) -> ApiResult<serde_json::Value> {
        let snapshot = self.config_manager.get_config_snapshot()?;
        serde_json::from_str(&snapshot).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.config_manager.get_global_config_value(key)?)
    }

    /// 更新配置（值经校验后以规范形式写入）
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        let normalized = normalize_value(key, value)?;
        self.config_manager.set_config_value(key, &normalized)?;
        Ok(())
    }
}

fn normalize_value(key: &str, value: &str) -> ApiResult<String> {
    let invalid = |reason: String| ApiError::InvalidInput(format!("{}: {}", key, reason));

    match key {
        config_keys::IMPORT_FAILURE_POLICY => value
            .parse::<FailurePolicy>()
            .map(|p| p.to_string())
            .map_err(invalid),
        config_keys::IMPORT_AMOUNT_POLICY => value
            .parse::<AmountPolicy>()
            .map(|p| p.to_string())
            .map_err(invalid),
        config_keys::IMPORT_HAS_HEADER => match value.trim() {
            "1" | "true" => Ok("1".to_string()),
            "0" | "false" => Ok("0".to_string()),
            other => Err(invalid(format!("应为 1/0: {}", other))),
        },
        config_keys::CODEGEN_MAX_ATTEMPTS => match value.trim().parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n.to_string()),
            _ => Err(invalid(format!("应为正整数: {}", value))),
        },
        _ => Err(ApiError::InvalidInput(format!("未知配置键: {}", key))),
    }
}
