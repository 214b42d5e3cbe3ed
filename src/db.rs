// ==========================================
// PU 切割仓储系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 建表幂等,库位/台账/计划/配置/日志集中定义
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// piece_unit.membership 单列标识归属集合:
/// PENDING(人工录入) / QUEUED(已优化) / IN_STOCK(在库) / EXITED(已出库)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS slot_catalog (
            slot_code TEXT PRIMARY KEY,
            rack_name TEXT NOT NULL,
            area TEXT NOT NULL DEFAULT 'COLMEIA',
            status TEXT NOT NULL DEFAULT 'ATIVO' CHECK (status IN ('ATIVO', 'INATIVO')),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_slot_catalog_rack ON slot_catalog(rack_name, status);

        CREATE TABLE IF NOT EXISTS layer_spec (
            project TEXT NOT NULL,
            piece_type TEXT NOT NULL,
            l1 TEXT,
            l3 TEXT,
            l3_b TEXT,
            special_pieces TEXT,
            PRIMARY KEY (project, piece_type)
        );

        CREATE TABLE IF NOT EXISTS production_plan (
            plan_row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id_lote TEXT NOT NULL,
            order_id TEXT NOT NULL,
            piece_type TEXT NOT NULL,
            project TEXT NOT NULL DEFAULT '',
            vehicle TEXT,
            sensor TEXT,
            status TEXT,
            etapa_baixa TEXT,
            data_programacao TEXT,
            turno_programacao TEXT,
            pu_cortado TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_production_plan_lote ON production_plan(id_lote);
        CREATE INDEX IF NOT EXISTS idx_production_plan_piece ON production_plan(order_id, piece_type);

        CREATE TABLE IF NOT EXISTS piece_unit (
            unit_id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_order_id TEXT NOT NULL DEFAULT '0',
            order_id TEXT NOT NULL,
            piece_type TEXT NOT NULL,
            part_code TEXT NOT NULL,
            project TEXT NOT NULL DEFAULT '',
            vehicle TEXT NOT NULL DEFAULT '',
            sensor TEXT,
            slot_code TEXT,
            rack_name TEXT,
            layer_tag TEXT,
            layer_variant TEXT,
            lote_vd TEXT,
            lote_pu TEXT,
            membership TEXT NOT NULL
                CHECK (membership IN ('PENDING', 'QUEUED', 'IN_STOCK', 'EXITED')),
            exit_reason TEXT,
            actor TEXT NOT NULL DEFAULT 'system',
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_piece_unit_membership ON piece_unit(membership);
        CREATE INDEX IF NOT EXISTS idx_piece_unit_slot ON piece_unit(slot_code, membership);
        CREATE INDEX IF NOT EXISTS idx_piece_unit_piece ON piece_unit(order_id, piece_type);
        CREATE INDEX IF NOT EXISTS idx_piece_unit_lote_vd ON piece_unit(lote_vd);
        CREATE INDEX IF NOT EXISTS idx_piece_unit_lote_pu ON piece_unit(lote_pu);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保 schema 存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let scopes: i64 = conn
            .query_row("SELECT COUNT(*) FROM config_scope", [], |row| row.get(0))
            .unwrap();
        assert_eq!(scopes, 1);
    }

    #[test]
    fn test_membership_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let res = conn.execute(
            "INSERT INTO piece_unit (order_id, piece_type, part_code, membership) VALUES ('1', 'TSP', 'TSP', 'ESTOQUE')",
            [],
        );
        assert!(res.is_err());
    }
}
