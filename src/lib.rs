// ==========================================
// PU 切割仓储系统 - 核心库
// ==========================================
// 职责: 库位分配、层别展开、物理件台账、lote 状态推进
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配与状态规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 用例接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ExitReason, LayerKind, LoteStatus, Membership};

// 领域实体
pub use domain::{
    ActionLog, ActionType, CommitOutcome, LayerSpec, LoteLink, PhysicalUnitSpec, PieceRequest,
    PieceUnit, Slot, SlotCode, UnitDraft,
};

// 引擎
pub use engine::{LayerExpander, LoteTracker, OccupancyIndex, SlotAllocator};

// API
pub use api::{ApiError, ApiResult, StorageApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "PU 切割仓储系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
