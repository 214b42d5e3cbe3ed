// ==========================================
// PU 切割仓储系统 - 应用层
// ==========================================
// 职责: 组装存储句柄、仓储、引擎与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
