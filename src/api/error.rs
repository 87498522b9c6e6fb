// ==========================================
// 销售发票管理系统 - API 层错误类型
// ==========================================
// 职责: 将 Repository / 导入层的技术错误转换为面向调用方的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("编码生成冲突: {0}")]
    GenerationRace(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据行格式错误 (行 {row}, 字段 {field}): {message}")]
    MalformedRow {
        row: usize,
        field: String,
        message: String,
    },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::GenerationRace { series, attempts } => ApiError::GenerationRace(
                format!("{} 编码在 {} 次尝试后仍冲突，请重试", series, attempts),
            ),
            RepositoryError::CodeSeries(e) => ApiError::BusinessRuleViolation(e.to_string()),

            // 数据库错误
            RepositoryError::NotFound { entity, code } => {
                ApiError::NotFound(format!("{}(code={})不存在", entity, code))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MalformedRow { row, field, message } => {
                ApiError::MalformedRow { row, field, message }
            }
            ImportError::Persistence(e) => ApiError::from(e),
            ImportError::ConfigReadError { key, message } => {
                ApiError::ConfigError(format!("{}: {}", key, message))
            }
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
