// ==========================================
// PU 切割仓储系统 - API 层
// ==========================================
// 职责: 提供仓储用例接口,供外部 Web 层调用
// ==========================================

pub mod error;
pub mod storage_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use storage_api::{
    LotePlan, ManualPieceRequest, MoveReport, OptimizeReport, PieceSource, PlacementReport,
    PlannedPiece, ReturnRequest, SlotAvailability, SlotPieceCount, StorageApi,
};
