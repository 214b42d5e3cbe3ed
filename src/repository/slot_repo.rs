// ==========================================
// PU 切割仓储系统 - 库位目录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 库位只停用,不删除
// ==========================================

use crate::domain::slot::{RackLayout, Slot, SlotCode};
use crate::engine::fill_order::rack_fill_order;
use crate::engine::providers::SlotCatalogProvider;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 目录状态值
pub const STATUS_ACTIVE: &str = "ATIVO";
pub const STATUS_INACTIVE: &str = "INATIVO";

// ==========================================
// SlotRepository - 库位目录仓储
// ==========================================
pub struct SlotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SlotRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增库位（编码重复时返回唯一约束错误）
    pub fn insert(&self, slot: &Slot) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO slot_catalog (slot_code, rack_name, area, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                slot.code.to_string(),
                slot.rack_name,
                slot.area,
                if slot.active { STATUS_ACTIVE } else { STATUS_INACTIVE },
            ],
        )?;
        Ok(())
    }

    /// 按货架配置批量登记库位（已存在的跳过）
    ///
    /// # 返回
    /// - 新增的库位数
    pub fn seed_layout(&self, layout: &RackLayout) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for rack in layout.racks() {
            for code in rack_fill_order(rack) {
                inserted += tx.execute(
                    "INSERT OR IGNORE INTO slot_catalog (slot_code, rack_name) VALUES (?1, ?2)",
                    params![code.to_string(), rack.name],
                )?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// 启用/停用库位
    ///
    /// # 返回
    /// - 更新行数（0 表示库位不存在）
    pub fn set_active(&self, code: &SlotCode, active: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE slot_catalog SET status = ?1 WHERE slot_code = ?2",
            params![
                if active { STATUS_ACTIVE } else { STATUS_INACTIVE },
                code.to_string()
            ],
        )?;
        Ok(rows)
    }

    pub fn find(&self, code: &SlotCode) -> RepositoryResult<Option<Slot>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT slot_code, rack_name, area, status FROM slot_catalog WHERE slot_code = ?1",
                params![code.to_string()],
                map_raw_row,
            )
            .optional()?;
        Ok(row.and_then(into_slot))
    }

    /// 全部库位（含停用）,按货架、编码排序
    pub fn list_all(&self) -> RepositoryResult<Vec<Slot>> {
        self.query_slots(
            "SELECT slot_code, rack_name, area, status FROM slot_catalog ORDER BY rack_name, slot_code",
        )
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Slot>> {
        self.query_slots(
            "SELECT slot_code, rack_name, area, status FROM slot_catalog WHERE status = 'ATIVO' ORDER BY rack_name, slot_code",
        )
    }

    pub fn count_active(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM slot_catalog WHERE status = 'ATIVO'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn query_slots(&self, sql: &str) -> RepositoryResult<Vec<Slot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], map_raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().filter_map(into_slot).collect())
    }
}

type RawSlotRow = (String, String, String, String);

fn map_raw_row(row: &Row) -> rusqlite::Result<RawSlotRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// 编码无法解析的目录行被忽略
fn into_slot((code, rack_name, area, status): RawSlotRow) -> Option<Slot> {
    match code.parse::<SlotCode>() {
        Ok(code) => Some(Slot {
            code,
            rack_name,
            area,
            active: status == STATUS_ACTIVE,
        }),
        Err(e) => {
            warn!(slot_code = %code, error = %e, "库位目录中存在无法解析的编码,已忽略");
            None
        }
    }
}

impl SlotCatalogProvider for SlotRepository {
    fn active_slots(&self) -> RepositoryResult<Vec<Slot>> {
        self.list_active()
    }

    fn find_slot(&self, code: &SlotCode) -> RepositoryResult<Option<Slot>> {
        self.find(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::RackRange;

    fn setup_repo() -> SlotRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        SlotRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_insert_find_and_duplicate() {
        let repo = setup_repo();
        let slot = Slot::new(SlotCode::new('E', 1).unwrap(), "RACK1");
        repo.insert(&slot).unwrap();

        let found = repo.find(&slot.code).unwrap().unwrap();
        assert_eq!(found, slot);

        let err = repo.insert(&slot).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_deactivate_hides_from_active_list() {
        let repo = setup_repo();
        let layout = RackLayout::new(vec![RackRange::new("RACK1", 1, 1)]).unwrap();
        assert_eq!(repo.seed_layout(&layout).unwrap(), 13);
        assert_eq!(repo.seed_layout(&layout).unwrap(), 0);

        let e1 = SlotCode::new('E', 1).unwrap();
        assert_eq!(repo.set_active(&e1, false).unwrap(), 1);
        assert_eq!(repo.count_active().unwrap(), 12);
        assert!(!repo.active_slots().unwrap().iter().any(|s| s.code == e1));
        assert_eq!(repo.list_all().unwrap().len(), 13);

        let z = SlotCode::new('A', 99).unwrap();
        assert_eq!(repo.set_active(&z, true).unwrap(), 0);
    }
}
