// ==========================================
// PU 切割仓储系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 红线: 配置缺失或格式错误时回落默认值,不阻断业务
// ==========================================

use crate::config::storage_config_trait::StorageConfigReader;
use crate::domain::lote::DEFAULT_LOTE_PU_PREFIX;
use crate::domain::slot::RackLayout;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

/// 单个台账事务迁移的物理件数上限（默认值）
pub const DEFAULT_COMMIT_CHUNK_SIZE: usize = 50;

/// 必须填写传感器的件类型（默认值）
pub const DEFAULT_SENSOR_REQUIRED_PIECE_TYPES: &str = "PBS";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Box<dyn Error>> {
        Ok(self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?)
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        self.lock()?.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// global 配置快照,写入优化操作日志
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let config_map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// StorageConfigReader Trait 实现
// ==========================================
impl StorageConfigReader for ConfigManager {
    fn get_rack_layout(&self) -> Result<RackLayout, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::RACK_LAYOUT)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(RackLayout::default()),
        };

        // 反序列化时校验区间（RackLayout: TryFrom<Vec<RackRange>>）
        match serde_json::from_str::<RackLayout>(&raw) {
            Ok(layout) => Ok(layout),
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::RACK_LAYOUT,
                    raw_value = %raw,
                    error = %e,
                    "货架配置格式错误,使用默认货架"
                );
                Ok(RackLayout::default())
            }
        }
    }

    fn get_commit_chunk_size(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::COMMIT_CHUNK_SIZE,
            &DEFAULT_COMMIT_CHUNK_SIZE.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_COMMIT_CHUNK_SIZE))
    }

    fn get_lote_pu_prefix(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LOTE_PU_PREFIX, DEFAULT_LOTE_PU_PREFIX)?;
        Ok(value.trim().to_string())
    }

    fn get_sensor_required_piece_types(&self) -> Result<Vec<String>, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::SENSOR_REQUIRED_PIECE_TYPES,
            DEFAULT_SENSOR_REQUIRED_PIECE_TYPES,
        )?;
        Ok(value
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 货架布局 (JSON 数组)
    pub const RACK_LAYOUT: &str = "rack_layout";

    // 台账批量迁移
    pub const COMMIT_CHUNK_SIZE: &str = "commit_chunk_size";

    // lote
    pub const LOTE_PU_PREFIX: &str = "lote_pu_prefix";

    // 人工录入校验
    pub const SENSOR_REQUIRED_PIECE_TYPES: &str = "sensor_required_piece_types";
}
