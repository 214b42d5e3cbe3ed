// ==========================================
// PU 切割仓储系统 - 物理件台账仓储
// ==========================================
// 职责: piece_unit 表（单列 membership 标识归属集合）
// 红线:
// - 提交: 同一 IMMEDIATE 事务内 清理 PENDING → 校验库位 → 写入;任一冲突整批回滚
// - 迁移: 按 id 条件更新 (WHERE membership = from),重复请求不会二次迁移
// - 物理件不会同时属于两个集合
// ==========================================

use crate::domain::lote::LoteLink;
use crate::domain::slot::{SlotCode, SlotOccupant};
use crate::domain::types::{LayerKind, Membership};
use crate::domain::unit::{CommitOutcome, PieceUnit, UnitDraft};
use crate::engine::providers::{OccupancyReader, StockCounter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const UNIT_COLUMNS: &str = "unit_id, parent_order_id, order_id, piece_type, part_code, project, \
     vehicle, sensor, slot_code, rack_name, layer_variant, lote_vd, lote_pu, membership, \
     exit_reason, actor, created_at, updated_at";

/// 占用库位的集合（SQL 片段）
const OCCUPYING_SQL: &str = "membership IN ('PENDING', 'QUEUED', 'IN_STOCK')";

pub struct PieceUnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PieceUnitRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 提交物理件到目标集合
    ///
    /// # 参数
    /// - drafts: 待提交物理件（均已分配库位）
    /// - destination: PENDING / QUEUED / IN_STOCK
    /// - clear_pending: 校验前先清空 PENDING（与提交同事务）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - conflicts 为空: 全部写入
    /// - conflicts 非空: 整批回滚（含 PENDING 清理）,inserted = 0
    pub fn commit_units(
        &self,
        drafts: &[UnitDraft],
        destination: Membership,
        clear_pending: bool,
        actor: &str,
    ) -> RepositoryResult<CommitOutcome> {
        if destination == Membership::Exited {
            return Err(RepositoryError::InvalidMembershipTransition {
                from: "NEW".to_string(),
                to: destination.to_string(),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if clear_pending {
            let removed = tx.execute("DELETE FROM piece_unit WHERE membership = 'PENDING'", [])?;
            debug!(removed, "提交前清理 PENDING");
        }

        // 按库位分组: 库位 → (逻辑件集合, 草稿声明的货架)
        let mut by_slot: BTreeMap<String, (HashSet<(&str, &str)>, HashSet<&str>)> =
            BTreeMap::new();
        for draft in drafts {
            let (pieces, racks) = by_slot.entry(draft.slot.code.to_string()).or_default();
            pieces.insert((draft.request.order_id.as_str(), draft.request.piece_type.as_str()));
            racks.insert(draft.slot.rack_name.as_str());
        }

        let mut conflicts = Vec::new();
        for (slot_code, (pieces, racks)) in &by_slot {
            let catalog: Option<(String, String)> = tx
                .query_row(
                    "SELECT status, rack_name FROM slot_catalog WHERE slot_code = ?1",
                    params![slot_code],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let occupied: i64 = tx.query_row(
                &format!(
                    "SELECT COUNT(*) FROM piece_unit WHERE slot_code = ?1 AND {}",
                    OCCUPYING_SQL
                ),
                params![slot_code],
                |row| row.get(0),
            )?;

            // 库位只属于目录登记的货架
            let (active, rack_matches) = match &catalog {
                Some((status, rack)) => (
                    status == "ATIVO",
                    racks.iter().all(|r| *r == rack.as_str()),
                ),
                None => (false, false),
            };
            if catalog.is_some() && !rack_matches {
                debug!(slot_code = %slot_code, ?racks, "草稿货架与目录不符");
            }
            if !active || !rack_matches || occupied > 0 || pieces.len() > 1 {
                conflicts.push(slot_code.clone());
            }
        }

        if !conflicts.is_empty() {
            tx.rollback()?;
            warn!(?conflicts, destination = %destination, "提交时库位冲突,整批回滚");
            return Ok(CommitOutcome {
                inserted: 0,
                conflicts,
            });
        }

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO piece_unit (
                    parent_order_id, order_id, piece_type, part_code, project, vehicle, sensor,
                    slot_code, rack_name, layer_tag, layer_variant, lote_vd, lote_pu,
                    membership, actor
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )?;
            for draft in drafts {
                let req = &draft.request;
                inserted += stmt.execute(params![
                    req.parent_order_id,
                    req.order_id,
                    req.piece_type,
                    draft.spec.part_code,
                    req.project,
                    req.vehicle,
                    req.sensor,
                    draft.slot.code.to_string(),
                    draft.slot.rack_name,
                    draft.spec.layer_tag(),
                    draft.spec.layer.map(|l| l.variant_str()),
                    draft.lote.lote_vd,
                    draft.lote.lote_pu,
                    destination.to_db_str(),
                    actor,
                ])?;
            }
        }
        tx.commit()?;

        info!(inserted, destination = %destination, "物理件已提交");
        Ok(CommitOutcome {
            inserted,
            conflicts: Vec::new(),
        })
    }

    /// 在集合间迁移物理件
    ///
    /// 每个 id 单独条件更新;不在 `from` 中的 id 被跳过
    ///
    /// # 返回
    /// - 实际迁移的物理件（迁移后状态）
    pub fn move_units(
        &self,
        unit_ids: &[i64],
        from: Membership,
        to: Membership,
        exit_reason: Option<&str>,
    ) -> RepositoryResult<Vec<PieceUnit>> {
        if from == to {
            return Err(RepositoryError::InvalidMembershipTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut moved = Vec::new();
        {
            let mut update = tx.prepare(
                r#"
                UPDATE piece_unit
                SET membership = ?1,
                    exit_reason = COALESCE(?2, exit_reason),
                    updated_at = datetime('now', 'localtime')
                WHERE unit_id = ?3 AND membership = ?4
                "#,
            )?;
            let mut select = tx.prepare(&format!(
                "SELECT {} FROM piece_unit WHERE unit_id = ?1",
                UNIT_COLUMNS
            ))?;

            for id in unit_ids {
                let changed =
                    update.execute(params![to.to_db_str(), exit_reason, id, from.to_db_str()])?;
                if changed == 1 {
                    moved.push(select.query_row(params![id], map_unit_row)?);
                } else {
                    debug!(unit_id = id, from = %from, "物理件不在源集合中,跳过");
                }
            }
        }
        tx.commit()?;

        info!(requested = unit_ids.len(), moved = moved.len(), from = %from, to = %to, "物理件迁移完成");
        Ok(moved)
    }

    /// 删除全部 PENDING 物理件
    pub fn delete_pending(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM piece_unit WHERE membership = 'PENDING'", [])?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 逻辑件在占位集合中的第一条记录（在库 > 已优化 > 人工录入）
    pub fn find_active_by_piece(
        &self,
        order_id: &str,
        piece_type: &str,
    ) -> RepositoryResult<Option<PieceUnit>> {
        let conn = self.get_conn()?;
        let unit = conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM piece_unit
                    WHERE order_id = ?1 AND piece_type = ?2 AND {}
                    ORDER BY CASE membership
                        WHEN 'IN_STOCK' THEN 0 WHEN 'QUEUED' THEN 1 ELSE 2 END,
                        unit_id
                    LIMIT 1
                    "#,
                    UNIT_COLUMNS, OCCUPYING_SQL
                ),
                params![order_id, piece_type],
                map_unit_row,
            )
            .optional()?;
        Ok(unit)
    }

    /// 逻辑件最近一次出库记录
    pub fn latest_exited(
        &self,
        order_id: &str,
        piece_type: &str,
    ) -> RepositoryResult<Option<PieceUnit>> {
        let conn = self.get_conn()?;
        let unit = conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM piece_unit
                    WHERE order_id = ?1 AND piece_type = ?2 AND membership = 'EXITED'
                    ORDER BY updated_at DESC, unit_id DESC
                    LIMIT 1
                    "#,
                    UNIT_COLUMNS
                ),
                params![order_id, piece_type],
                map_unit_row,
            )
            .optional()?;
        Ok(unit)
    }

    /// 占位集合中全部逻辑件标识 (op, peca)
    pub fn active_piece_keys(&self) -> RepositoryResult<HashSet<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT order_id, piece_type FROM piece_unit WHERE {}",
            OCCUPYING_SQL
        ))?;
        let keys = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(keys)
    }

    /// 按集合列出物理件,新的在前
    pub fn list_by_membership(&self, membership: Membership) -> RepositoryResult<Vec<PieceUnit>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM piece_unit WHERE membership = ?1 ORDER BY unit_id DESC",
            UNIT_COLUMNS
        ))?;
        let units = stmt
            .query_map(params![membership.to_db_str()], map_unit_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }

    /// 指定 id 中当前处于 `membership` 的物理件
    pub fn list_by_ids(
        &self,
        unit_ids: &[i64],
        membership: Membership,
    ) -> RepositoryResult<Vec<PieceUnit>> {
        if unit_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; unit_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM piece_unit WHERE membership = ? AND unit_id IN ({}) ORDER BY unit_id",
            UNIT_COLUMNS, placeholders
        );
        let mut values: Vec<Value> = Vec::with_capacity(unit_ids.len() + 1);
        values.push(Value::Text(membership.to_db_str().to_string()));
        values.extend(unit_ids.iter().map(|id| Value::Integer(*id)));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params_from_iter(values), map_unit_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }

    /// 库位中占位的物理件
    pub fn list_by_slot(&self, code: &SlotCode) -> RepositoryResult<Vec<PieceUnit>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM piece_unit WHERE slot_code = ?1 AND {} ORDER BY unit_id",
            UNIT_COLUMNS, OCCUPYING_SQL
        ))?;
        let units = stmt
            .query_map(params![code.to_string()], map_unit_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }

    pub fn count_by_membership(&self, membership: Membership) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM piece_unit WHERE membership = ?1",
            params![membership.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_unit_row(row: &Row) -> rusqlite::Result<PieceUnit> {
    let membership_raw: String = row.get(13)?;
    let membership = membership_raw
        .parse::<Membership>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, e.into()))?;

    Ok(PieceUnit {
        unit_id: row.get(0)?,
        parent_order_id: row.get(1)?,
        order_id: row.get(2)?,
        piece_type: row.get(3)?,
        part_code: row.get(4)?,
        project: row.get(5)?,
        vehicle: row.get(6)?,
        sensor: row.get(7)?,
        slot_code: row.get(8)?,
        rack_name: row.get(9)?,
        layer: row
            .get::<_, Option<String>>(10)?
            .as_deref()
            .and_then(LayerKind::from_db_str),
        lote: LoteLink {
            lote_vd: row.get(11)?,
            lote_pu: row.get(12)?,
        },
        membership,
        exit_reason: row.get(14)?,
        actor: row.get(15)?,
        created_at: parse_ts(16, row.get(16)?)?,
        updated_at: parse_ts(17, row.get(17)?)?,
    })
}

impl OccupancyReader for PieceUnitRepository {
    fn occupants(&self) -> RepositoryResult<Vec<SlotOccupant>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT slot_code, piece_type, COUNT(*)
            FROM piece_unit
            WHERE {} AND slot_code IS NOT NULL AND slot_code != ''
            GROUP BY slot_code, piece_type
            "#,
            OCCUPYING_SQL
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SlotOccupant {
                    slot_code: row.get(0)?,
                    piece_type: row.get(1)?,
                    units: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn is_slot_occupied(&self, code: &SlotCode) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM piece_unit WHERE slot_code = ?1 AND {}",
                OCCUPYING_SQL
            ),
            params![code.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl StockCounter for PieceUnitRepository {
    fn count_in_stock(&self, link: &LoteLink) -> RepositoryResult<i64> {
        let lote_vd = match link.lote_vd.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(0),
        };
        let conn = self.get_conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*) FROM piece_unit
            WHERE membership = 'IN_STOCK' AND (lote_vd = ?1 OR lote_pu = ?2)
            "#,
            params![lote_vd, link.lote_pu.as_deref().unwrap_or(lote_vd)],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
