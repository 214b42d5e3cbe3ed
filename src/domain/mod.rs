// ==========================================
// PU 切割仓储系统 - 领域模型层
// ==========================================
// 职责: 定义库位、层别、物理件、lote 等实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod layer;
pub mod lote;
pub mod slot;
pub mod types;
pub mod unit;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use layer::{LayerCount, LayerSpec, PhysicalUnitSpec, MAX_LAYER_UNITS};
pub use lote::{LoteLink, LoteProgress, LoteSummary, PlanRow};
pub use slot::{RackLayout, RackRange, Slot, SlotCode, SlotOccupant};
pub use types::{ArtifactSuffix, ExitReason, LayerKind, LoteStatus, Membership};
pub use unit::{CommitOutcome, PieceRequest, PieceUnit, SlotAssignment, UnitDraft};
