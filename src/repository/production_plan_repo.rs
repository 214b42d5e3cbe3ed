// ==========================================
// PU 切割仓储系统 - 生产计划仓储
// ==========================================
// 职责: 计划行读取、lote 期望件数、pu_cortado 状态字段写入
// 红线: pu_cortado 只向前推进,写入条件排除已达到或越过目标的行
// ==========================================

use crate::domain::lote::{LoteSummary, PlanRow};
use crate::domain::types::LoteStatus;
use crate::engine::providers::ProductionPlanProvider;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const PLAN_COLUMNS: &str = "plan_row_id, id_lote, order_id, piece_type, project, vehicle, sensor, \
     status, etapa_baixa, data_programacao, turno_programacao, pu_cortado";

/// 可排计划行过滤条件（计划已排产、未切完、工序允许）
const OPEN_ROW_FILTER: &str = "status = 'PROGRAMADO' \
     AND (pu_cortado IS NULL OR pu_cortado = '' OR pu_cortado = 'PROGRAMANDO') \
     AND (etapa_baixa IS NULL OR etapa_baixa = '' OR etapa_baixa IN ('INSPECAO FINAL', 'RT-RP'))";

pub struct ProductionPlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionPlanRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入计划行（计划由外部系统维护,此处用于导入与测试准备）
    pub fn insert(&self, row: &PlanRow) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_plan (
                id_lote, order_id, piece_type, project, vehicle, sensor,
                status, etapa_baixa, data_programacao, turno_programacao, pu_cortado
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                row.id_lote,
                row.order_id,
                row.piece_type,
                row.project,
                row.vehicle,
                row.sensor,
                row.status,
                row.etapa_baixa,
                row.data_programacao.map(|d| d.format("%Y-%m-%d").to_string()),
                row.turno_programacao,
                row.pu_cortado.to_db_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 可排 lote 列表: 日期倒序、班次、id_lote
    pub fn list_open_lotes(&self) -> RepositoryResult<Vec<LoteSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT DISTINCT id_lote, data_programacao, turno_programacao
            FROM production_plan
            WHERE {}
            ORDER BY data_programacao DESC, turno_programacao, id_lote
            "#,
            OPEN_ROW_FILTER
        ))?;

        let lotes = stmt
            .query_map([], |row| {
                Ok(LoteSummary::new(
                    row.get(0)?,
                    parse_date(row.get(1)?),
                    row.get(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lotes)
    }

    /// lote 中可排的计划行,按工单号倒序
    pub fn list_open_rows(&self, id_lote: &str) -> RepositoryResult<Vec<PlanRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM production_plan WHERE id_lote = ?1 AND {} ORDER BY order_id DESC, plan_row_id",
            PLAN_COLUMNS, OPEN_ROW_FILTER
        ))?;
        let rows = stmt
            .query_map(params![id_lote], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// lote 的全部计划行（不过滤）
    pub fn list_rows(&self, id_lote: &str) -> RepositoryResult<Vec<PlanRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM production_plan WHERE id_lote = ?1 ORDER BY plan_row_id",
            PLAN_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![id_lote], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 逻辑件所属 lote（取第一条计划行）
    pub fn find_lote_for_piece(
        &self,
        order_id: &str,
        piece_type: &str,
    ) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let lote = conn
            .query_row(
                r#"
                SELECT id_lote FROM production_plan
                WHERE order_id = ?1 AND piece_type = ?2 AND id_lote IS NOT NULL AND id_lote != ''
                ORDER BY plan_row_id
                LIMIT 1
                "#,
                params![order_id, piece_type],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(lote)
    }

    fn advance_where(
        &self,
        filter_sql: &str,
        filter_params: &[&str],
        to: LoteStatus,
    ) -> RepositoryResult<usize> {
        let target = match to.to_db_str() {
            Some(v) => v,
            None => return Ok(0),
        };
        let guard = to.at_or_beyond();
        let placeholders = vec!["?"; guard.len()].join(", ");
        let sql = format!(
            "UPDATE production_plan SET pu_cortado = ? WHERE {} AND (pu_cortado IS NULL OR pu_cortado NOT IN ({}))",
            filter_sql, placeholders
        );

        let mut values: Vec<&str> = Vec::with_capacity(1 + filter_params.len() + guard.len());
        values.push(target);
        values.extend_from_slice(filter_params);
        values.extend_from_slice(guard);

        let conn = self.get_conn()?;
        let rows = conn.execute(&sql, params_from_iter(values))?;
        Ok(rows)
    }
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn map_row(row: &Row) -> rusqlite::Result<PlanRow> {
    Ok(PlanRow {
        plan_row_id: row.get(0)?,
        id_lote: row.get(1)?,
        order_id: row.get(2)?,
        piece_type: row.get(3)?,
        project: row.get(4)?,
        vehicle: row.get(5)?,
        sensor: row.get(6)?,
        status: row.get(7)?,
        etapa_baixa: row.get(8)?,
        data_programacao: parse_date(row.get(9)?),
        turno_programacao: row.get(10)?,
        pu_cortado: LoteStatus::from_db(row.get::<_, Option<String>>(11)?.as_deref()),
    })
}

impl ProductionPlanProvider for ProductionPlanRepository {
    fn expected_unit_count(&self, id_lote: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM production_plan WHERE id_lote = ?1",
            params![id_lote],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn lote_status(&self, id_lote: &str) -> RepositoryResult<LoteStatus> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT pu_cortado FROM production_plan WHERE id_lote = ?1")?;
        let statuses = stmt
            .query_map(params![id_lote], |row| row.get::<_, Option<String>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(statuses
            .iter()
            .map(|s| LoteStatus::from_db(s.as_deref()))
            .min()
            .unwrap_or(LoteStatus::NotStarted))
    }

    fn advance_lote_status(&self, id_lote: &str, to: LoteStatus) -> RepositoryResult<usize> {
        self.advance_where("id_lote = ?", &[id_lote], to)
    }

    fn advance_piece_status(
        &self,
        order_id: &str,
        piece_type: &str,
        to: LoteStatus,
    ) -> RepositoryResult<usize> {
        self.advance_where("order_id = ? AND piece_type = ?", &[order_id, piece_type], to)
    }

    fn sweepable_lotes(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT id_lote FROM production_plan
            WHERE status = 'PROGRAMADO'
              AND (pu_cortado IS NULL OR pu_cortado != 'CORTADO')
            ORDER BY id_lote
            "#,
        )?;
        let lotes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> ProductionPlanRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ProductionPlanRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_status_only_moves_forward() {
        let repo = setup_repo();
        repo.insert(&PlanRow::new("VD1", "1001", "TSP", "P10")).unwrap();
        repo.insert(&PlanRow::new("VD1", "1002", "PBS", "P10")).unwrap();

        assert_eq!(repo.lote_status("VD1").unwrap(), LoteStatus::NotStarted);
        assert_eq!(repo.advance_lote_status("VD1", LoteStatus::Programando).unwrap(), 2);
        assert_eq!(repo.advance_piece_status("1001", "TSP", LoteStatus::Programado).unwrap(), 1);
        // 最低状态决定 lote 状态
        assert_eq!(repo.lote_status("VD1").unwrap(), LoteStatus::Programando);

        assert_eq!(repo.advance_lote_status("VD1", LoteStatus::Cortado).unwrap(), 2);
        assert_eq!(repo.lote_status("VD1").unwrap(), LoteStatus::Cortado);

        // 不回退
        assert_eq!(repo.advance_lote_status("VD1", LoteStatus::Programando).unwrap(), 0);
        assert_eq!(repo.advance_piece_status("1001", "TSP", LoteStatus::Programado).unwrap(), 0);
        assert_eq!(repo.lote_status("VD1").unwrap(), LoteStatus::Cortado);
        assert!(repo.sweepable_lotes().unwrap().is_empty());
    }

    #[test]
    fn test_open_lotes_filter_and_display() {
        let repo = setup_repo();
        let mut row = PlanRow::new("VD7", "1", "TSP", "P1");
        row.data_programacao = NaiveDate::from_ymd_opt(2026, 1, 2);
        row.turno_programacao = Some("primeiro".to_string());
        repo.insert(&row).unwrap();

        let mut closed = PlanRow::new("VD8", "2", "TSP", "P1");
        closed.etapa_baixa = Some("EXPEDICAO".to_string());
        repo.insert(&closed).unwrap();

        let mut draft = PlanRow::new("VD9", "3", "TSP", "P1");
        draft.status = Some("RASCUNHO".to_string());
        repo.insert(&draft).unwrap();

        let lotes = repo.list_open_lotes().unwrap();
        assert_eq!(lotes.len(), 1);
        assert_eq!(lotes[0].display, "1° - 02/01/2026 - VD7");

        assert_eq!(repo.find_lote_for_piece("2", "TSP").unwrap().as_deref(), Some("VD8"));
        assert_eq!(repo.expected_unit_count("VD8").unwrap(), 1);
        assert_eq!(repo.list_open_rows("VD8").unwrap().len(), 0);
    }
}
