// ==========================================
// 销售发票管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigError, ImportConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::types::{AmountPolicy, FailurePolicy};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ConfigError> {
        Ok(self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?)
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.lock()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global 配置（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;

        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 格式，按键排序）
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取并解析配置；缺失时取默认值，无法解析时告警并取默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };

        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    error = %e,
                    "配置值无法识别，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_failure_policy(&self) -> Result<FailurePolicy, ConfigError> {
        self.get_parsed_or_default(config_keys::IMPORT_FAILURE_POLICY, FailurePolicy::default())
    }

    async fn get_amount_policy(&self) -> Result<AmountPolicy, ConfigError> {
        self.get_parsed_or_default(config_keys::IMPORT_AMOUNT_POLICY, AmountPolicy::default())
    }

    async fn get_has_header(&self) -> Result<bool, ConfigError> {
        let flag: u8 = self.get_parsed_or_default(config_keys::IMPORT_HAS_HEADER, 1)?;
        Ok(flag != 0)
    }

    async fn get_codegen_max_attempts(&self) -> Result<u32, ConfigError> {
        let attempts: u32 = self.get_parsed_or_default(config_keys::CODEGEN_MAX_ATTEMPTS, 3)?;
        if attempts == 0 {
            tracing::warn!(
                config_key = config_keys::CODEGEN_MAX_ATTEMPTS,
                "尝试次数不能为 0，使用默认值"
            );
            return Ok(3);
        }
        Ok(attempts)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const IMPORT_FAILURE_POLICY: &str = "import.failure_policy";
    pub const IMPORT_AMOUNT_POLICY: &str = "import.amount_policy";
    pub const IMPORT_HAS_HEADER: &str = "import.has_header";

    // 编码生成
    pub const CODEGEN_MAX_ATTEMPTS: &str = "codegen.max_attempts";
}
