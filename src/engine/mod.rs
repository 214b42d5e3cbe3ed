// ==========================================
// PU 切割仓储系统 - 引擎层
// ==========================================
// 职责: 库位分配、层别展开、lote 状态推进
// 红线: Engine 不拼 SQL,只通过 providers 中的接口访问存储
// ==========================================

pub mod fill_order;
pub mod layer_expander;
pub mod lote_tracker;
pub mod occupancy;
pub mod providers;
pub mod slot_allocator;

// 重导出核心引擎
pub use fill_order::{fill_order, rack_fill_order};
pub use layer_expander::LayerExpander;
pub use lote_tracker::LoteTracker;
pub use occupancy::OccupancyIndex;
pub use providers::{
    LayerSpecProvider, OccupancyReader, ProductionPlanProvider, SlotCatalogProvider, StockCounter,
};
pub use slot_allocator::SlotAllocator;
