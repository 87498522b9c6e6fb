// ==========================================
// 销售发票管理系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{AmountPolicy, FailurePolicy};
use async_trait::async_trait;
use std::error::Error;

pub type ConfigError = Box<dyn Error + Send + Sync>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 导入策略 =====

    /// 获取失败策略
    ///
    /// # 默认值
    /// - ABORT_BATCH
    async fn get_failure_policy(&self) -> Result<FailurePolicy, ConfigError>;

    /// 获取金额口径（第 15 列含义）
    ///
    /// # 默认值
    /// - UNIT_PRICE
    async fn get_amount_policy(&self) -> Result<AmountPolicy, ConfigError>;

    /// 源文件首行是否为表头
    ///
    /// # 默认值
    /// - true
    async fn get_has_header(&self) -> Result<bool, ConfigError>;

    // ===== 编码生成 =====

    /// 编码冲突最大尝试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_codegen_max_attempts(&self) -> Result<u32, ConfigError>;
}
