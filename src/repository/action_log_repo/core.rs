use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{named_params, Connection};
use std::sync::{Arc, Mutex};

/// action_ts 存储格式（本地时间,精确到秒）
pub(super) const ACTION_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 只追加,不更新不删除;与台账共用连接句柄
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条操作日志,返回 action_id
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let payload = log.payload_json.as_ref().map(|v| v.to_string());
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO action_log (action_id, action_type, action_ts, actor, payload_json, detail)
            VALUES (:id, :kind, :ts, :actor, :payload, :detail)
            "#,
            named_params! {
                ":id": log.action_id,
                ":kind": log.action_type,
                ":ts": log.action_ts.format(ACTION_TS_FORMAT).to_string(),
                ":actor": log.actor,
                ":payload": payload,
                ":detail": log.detail,
            },
        )?;
        Ok(log.action_id.clone())
    }
}
