// ==========================================
// PU 切割仓储系统 - 引擎层数据提供者接口
// ==========================================
// 职责: 定义引擎读取/写入外部状态所需的最小接口
// 说明: 由 repository 层实现,测试中可替换为内存实现
// 红线: Engine 不拼 SQL,只通过这些接口访问存储
// ==========================================

use crate::domain::layer::LayerSpec;
use crate::domain::lote::LoteLink;
use crate::domain::slot::{Slot, SlotCode, SlotOccupant};
use crate::domain::types::LoteStatus;
use crate::repository::error::RepositoryResult;

/// 库位目录
pub trait SlotCatalogProvider: Send + Sync {
    /// 全部启用库位（含货架归属）
    fn active_slots(&self) -> RepositoryResult<Vec<Slot>>;

    /// 按编码查询库位（含停用）
    fn find_slot(&self, code: &SlotCode) -> RepositoryResult<Option<Slot>>;
}

/// 库位占用读取
///
/// 每次调用必须读取最新已提交状态,不得缓存
pub trait OccupancyReader: Send + Sync {
    /// PENDING / QUEUED / IN_STOCK 物理件按 (库位, 件类型) 聚合
    fn occupants(&self) -> RepositoryResult<Vec<SlotOccupant>>;

    /// 单个库位是否被占用（候选库位返回前的二次确认）
    fn is_slot_occupied(&self, code: &SlotCode) -> RepositoryResult<bool>;
}

/// 层别规格
pub trait LayerSpecProvider: Send + Sync {
    fn find_layer_spec(&self, project: &str, piece_type: &str) -> RepositoryResult<Option<LayerSpec>>;
}

/// 生产计划（期望件数 + lote 状态字段 pu_cortado）
pub trait ProductionPlanProvider: Send + Sync {
    /// lote 期望件数（计划行数）
    fn expected_unit_count(&self, id_lote: &str) -> RepositoryResult<i64>;

    /// lote 当前状态（多行取最低状态）
    fn lote_status(&self, id_lote: &str) -> RepositoryResult<LoteStatus>;

    /// 将 lote 各行推进到 `to`,只推进前序状态的行,返回更新行数
    fn advance_lote_status(&self, id_lote: &str, to: LoteStatus) -> RepositoryResult<usize>;

    /// 将单个 (op, peca) 计划行推进到 `to`
    fn advance_piece_status(
        &self,
        order_id: &str,
        piece_type: &str,
        to: LoteStatus,
    ) -> RepositoryResult<usize>;

    /// 需要复查的 lote: 计划状态 PROGRAMADO 且 pu_cortado 非 CORTADO
    fn sweepable_lotes(&self) -> RepositoryResult<Vec<String>>;
}

/// 在库件计数
pub trait StockCounter: Send + Sync {
    /// IN_STOCK 中 lote_vd 或 lote_pu 匹配的物理件数
    fn count_in_stock(&self, link: &LoteLink) -> RepositoryResult<i64>;
}
