// ==========================================
// PU 切割仓储系统 - API层错误类型
// ==========================================
// 职责: 用例错误,仓储错误在此折叠为调用方可处理的类别
// 红线: 库位耗尽与提交冲突是两类不同结果,调用方据此决定放弃或重新分配
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 库位错误
    // ==========================================
    /// 提交时库位已被并发请求占用,调用方应重新分配
    #[error("库位冲突: {}", slots.join(", "))]
    SlotConflict { slots: Vec<String> },

    /// 无可用库位（仓库已满）
    #[error("无可用库位: {0}")]
    NoSlotAvailable(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的归属转换: from={from} to={to}")]
    InvalidMembershipTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    /// 忙/锁定,可整体重试
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// 是否可通过重新分配库位后重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::SlotConflict { .. } | ApiError::DatabaseTransactionError(_)
        )
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::InvalidMembershipTransition { from, to } => {
                ApiError::InvalidMembershipTransition { from, to }
            }
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// 配置读取错误（ConfigManager 返回 Box<dyn Error>）
pub(crate) fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::ConfigError(err.to_string())
}
