// ==========================================
// PU 切割仓储系统 - 物理件领域模型
// ==========================================
// 职责: 逻辑件请求、待提交物理件、台账中的物理件
// 红线: 物理件始终携带库位、货架、层别与 lote 关联
// ==========================================

use crate::domain::layer::PhysicalUnitSpec;
use crate::domain::lote::LoteLink;
use crate::domain::slot::{Slot, SlotCode};
use crate::domain::types::{LayerKind, Membership};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 无父工单时的占位值
pub const NO_PARENT_ORDER: &str = "0";

// ==========================================
// PieceRequest - 逻辑件请求（尚未分配库位）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceRequest {
    pub parent_order_id: String, // op_pai
    pub order_id: String,        // op
    pub piece_type: String,      // peca
    pub project: String,
    pub vehicle: String,
    pub sensor: Option<String>,
}

impl PieceRequest {
    pub fn new(order_id: &str, piece_type: &str, project: &str, vehicle: &str) -> Self {
        Self {
            parent_order_id: NO_PARENT_ORDER.to_string(),
            order_id: order_id.trim().to_string(),
            piece_type: piece_type.trim().to_string(),
            project: project.trim().to_string(),
            vehicle: vehicle.trim().to_string(),
            sensor: None,
        }
    }

    pub fn with_sensor(mut self, sensor: &str) -> Self {
        let sensor = sensor.trim();
        self.sensor = if sensor.is_empty() {
            None
        } else {
            Some(sensor.to_string())
        };
        self
    }

    /// 逻辑件标识 (op, peca)
    pub fn piece_key(&self) -> (String, String) {
        (self.order_id.clone(), self.piece_type.clone())
    }
}

// ==========================================
// SlotAssignment - 物理件上的库位信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub code: SlotCode,
    pub rack_name: String,
}

impl From<&Slot> for SlotAssignment {
    fn from(slot: &Slot) -> Self {
        Self {
            code: slot.code.clone(),
            rack_name: slot.rack_name.clone(),
        }
    }
}

// ==========================================
// UnitDraft - 待提交到台账的物理件
// ==========================================
// 库位为必填: 无库位的件不可能进入台账
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDraft {
    pub request: PieceRequest,
    pub slot: SlotAssignment,
    pub spec: PhysicalUnitSpec,
    pub lote: LoteLink,
}

impl UnitDraft {
    /// 一个逻辑件展开为多个物理件,共享同一库位
    pub fn expand(
        request: &PieceRequest,
        slot: &SlotAssignment,
        specs: &[PhysicalUnitSpec],
        lote: &LoteLink,
    ) -> Vec<UnitDraft> {
        specs
            .iter()
            .map(|spec| UnitDraft {
                request: request.clone(),
                slot: slot.clone(),
                spec: spec.clone(),
                lote: lote.clone(),
            })
            .collect()
    }
}

// ==========================================
// PieceUnit - 台账中的物理件
// ==========================================
// 对齐: piece_unit 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceUnit {
    pub unit_id: i64,
    pub parent_order_id: String,
    pub order_id: String,
    pub piece_type: String,
    pub part_code: String,
    pub project: String,
    pub vehicle: String,
    pub sensor: Option<String>,
    pub slot_code: Option<String>,
    pub rack_name: Option<String>,
    pub layer: Option<LayerKind>,
    pub lote: LoteLink,
    pub membership: Membership,
    pub exit_reason: Option<String>,
    pub actor: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PieceUnit {
    /// 入库层别（L3_B 归并为 L3）
    pub fn layer_tag(&self) -> Option<&'static str> {
        self.layer.map(|l| l.stored_tag())
    }
}

// ==========================================
// CommitOutcome - 台账提交结果
// ==========================================
// conflicts 非空时整批已回滚,inserted 为 0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub inserted: usize,
    pub conflicts: Vec<String>,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        self.conflicts.is_empty()
    }
}
