use super::core::{ActionLogRepository, ACTION_TS_FORMAT};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const LOG_COLUMNS: &str = "action_id, action_type, action_ts, actor, payload_json, detail";

/// payload 中的库位字段（人工录入/回库: slot;启停: slot_code;登记: code）
const PAYLOAD_SLOT_SQL: &str = "COALESCE(json_extract(payload_json, '$.slot'), \
     json_extract(payload_json, '$.slot_code'), json_extract(payload_json, '$.code'))";

impl ActionLogRepository {
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let log = conn
            .query_row(
                &format!("SELECT {} FROM action_log WHERE action_id = ?1", LOG_COLUMNS),
                params![action_id],
                map_log_row,
            )
            .optional()?;
        Ok(log)
    }

    /// 指定操作类型,新的在前
    pub fn find_by_action_type(
        &self,
        action_type: ActionType,
        limit: i32,
    ) -> RepositoryResult<Vec<ActionLog>> {
        self.query_logs(Some(("action_type = ?", action_type.as_str().to_string())), limit)
    }

    pub fn find_by_actor(&self, actor: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        self.query_logs(Some(("actor = ?", actor.to_string())), limit)
    }

    /// 涉及某个库位的操作（录入/回库/登记/启停）
    pub fn find_by_slot(&self, slot_code: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let filter = format!("payload_json IS NOT NULL AND {} = ?", PAYLOAD_SLOT_SQL);
        self.query_logs(Some((filter.as_str(), slot_code.trim().to_uppercase())), limit)
    }

    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        self.query_logs(None, limit)
    }

    pub fn count_by_action_type(&self, action_type: ActionType) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE action_type = ?1",
            params![action_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 单条件查询,新的在前
    fn query_logs(&self, filter: Option<(&str, String)>, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let (where_sql, mut values) = match filter {
            Some((sql, value)) => (format!("WHERE {}", sql), vec![Value::Text(value)]),
            None => (String::new(), Vec::new()),
        };
        values.push(Value::Integer(i64::from(limit)));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM action_log {} ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            LOG_COLUMNS, where_sql
        ))?;
        let logs = stmt
            .query_map(params_from_iter(values), map_log_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_log_row(row: &Row) -> rusqlite::Result<ActionLog> {
    let raw_ts: String = row.get(2)?;
    let action_ts = NaiveDateTime::parse_from_str(&raw_ts, ACTION_TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    // payload 损坏时按无 payload 处理,不影响日志读取
    let payload_json = row
        .get::<_, Option<String>>(4)?
        .and_then(|s| serde_json::from_str(&s).ok());

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts,
        actor: row.get(3)?,
        payload_json,
        detail: row.get(5)?,
    })
}
