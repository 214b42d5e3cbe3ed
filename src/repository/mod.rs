// ==========================================
// PU 切割仓储系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod layer_spec_repo;
pub mod production_plan_repo;
pub mod slot_repo;
pub mod unit_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use layer_spec_repo::LayerSpecRepository;
pub use production_plan_repo::ProductionPlanRepository;
pub use slot_repo::SlotRepository;
pub use unit_repo::PieceUnitRepository;
