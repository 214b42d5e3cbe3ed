// ==========================================
// PU 切割仓储系统 - 层别规格仓储
// ==========================================
// 红线: 字段保持原始文本,解析在领域/引擎层完成
// ==========================================

use crate::domain::layer::LayerSpec;
use crate::engine::providers::LayerSpecProvider;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct LayerSpecRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LayerSpecRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或覆盖规格
    pub fn upsert(&self, spec: &LayerSpec) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO layer_spec (project, piece_type, l1, l3, l3_b, special_pieces)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(project, piece_type) DO UPDATE SET
                l1 = excluded.l1,
                l3 = excluded.l3,
                l3_b = excluded.l3_b,
                special_pieces = excluded.special_pieces
            "#,
            params![
                spec.project,
                spec.piece_type,
                spec.l1,
                spec.l3,
                spec.l3_b,
                spec.special_pieces
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, project: &str, piece_type: &str) -> RepositoryResult<Option<LayerSpec>> {
        let conn = self.get_conn()?;
        let spec = conn
            .query_row(
                r#"
                SELECT project, piece_type, l1, l3, l3_b, special_pieces
                FROM layer_spec
                WHERE project = ?1 AND piece_type = ?2
                "#,
                params![project, piece_type],
                map_row,
            )
            .optional()?;
        Ok(spec)
    }

    pub fn list_by_project(&self, project: &str) -> RepositoryResult<Vec<LayerSpec>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT project, piece_type, l1, l3, l3_b, special_pieces
            FROM layer_spec
            WHERE project = ?1
            ORDER BY piece_type
            "#,
        )?;
        let specs = stmt
            .query_map(params![project], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(specs)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<LayerSpec> {
    Ok(LayerSpec {
        project: row.get(0)?,
        piece_type: row.get(1)?,
        l1: row.get(2)?,
        l3: row.get(3)?,
        l3_b: row.get(4)?,
        special_pieces: row.get(5)?,
    })
}

impl LayerSpecProvider for LayerSpecRepository {
    fn find_layer_spec(&self, project: &str, piece_type: &str) -> RepositoryResult<Option<LayerSpec>> {
        self.find(project, piece_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = LayerSpecRepository::from_connection(Arc::new(Mutex::new(conn)));

        repo.upsert(&LayerSpec::new("P10", "TSP").with_l1("2")).unwrap();
        repo.upsert(&LayerSpec::new("P10", "TSP").with_l3("X")).unwrap();
        repo.upsert(&LayerSpec::new("P10", "PBS").with_special_pieces("A,B"))
            .unwrap();

        let spec = repo.find("P10", "TSP").unwrap().unwrap();
        assert_eq!(spec.l1, None);
        assert_eq!(spec.l3.as_deref(), Some("X"));
        assert!(repo.find("P99", "TSP").unwrap().is_none());
        assert_eq!(repo.list_by_project("P10").unwrap().len(), 2);
    }
}
