// ==========================================
// PU 切割仓储系统 - 仓储层错误类型
// ==========================================
// SQLite 忙/锁定映射为事务错误,调用方可整体重试
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    /// Mutex 中毒
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    /// SQLITE_BUSY / SQLITE_LOCKED
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    /// 物理件归属只能沿 PENDING/QUEUED → IN_STOCK → EXITED 推进
    #[error("无效的归属转换: from={from} to={to}")]
    InvalidMembershipTransition { from: String, to: String },
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "row".to_string(),
                id: "-".to_string(),
            },
            rusqlite::Error::SqliteFailure(e, msg) => {
                let msg = msg.unwrap_or_else(|| e.to_string());
                match e.code {
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        RepositoryError::DatabaseTransactionError(msg)
                    }
                    ErrorCode::ConstraintViolation if msg.contains("UNIQUE") => {
                        RepositoryError::UniqueConstraintViolation(msg)
                    }
                    ErrorCode::ConstraintViolation if msg.contains("FOREIGN KEY") => {
                        RepositoryError::ForeignKeyViolation(msg)
                    }
                    _ => RepositoryError::DatabaseQueryError(msg),
                }
            }
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
