// ==========================================
// PU 切割仓储系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 红线: 一个 AppState 持有一个显式连接句柄,不使用进程级单例;
//       多个进程/工作者各自创建 AppState,协调只依赖 SQLite 锁
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::StorageApi;
use crate::config::{ConfigManager, StorageConfigReader};
use crate::db::open_and_init;
use crate::repository::{
    ActionLogRepository, LayerSpecRepository, PieceUnitRepository, ProductionPlanRepository,
    SlotRepository,
};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 仓储用例API
    pub storage_api: Arc<StorageApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 库位目录仓储（初始化/维护用）
    pub slot_repo: Arc<SlotRepository>,

    /// 层别规格仓储（规格维护用）
    pub layer_spec_repo: Arc<LayerSpecRepository>,

    /// 生产计划仓储（计划导入用）
    pub plan_repo: Arc<ProductionPlanRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并建表（幂等）
    /// 2. 库位目录为空时按货架配置登记全部库位
    /// 3. 创建仓储与 API 实例（共享同一连接）
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState,数据库路径: {}", db_path);

        let conn = open_and_init(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let slot_repo = Arc::new(SlotRepository::from_connection(conn.clone()));
        let unit_repo = Arc::new(PieceUnitRepository::from_connection(conn.clone()));
        let layer_spec_repo = Arc::new(LayerSpecRepository::from_connection(conn.clone()));
        let plan_repo = Arc::new(ProductionPlanRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn));

        let catalog_empty = slot_repo
            .list_all()
            .map_err(|e| format!("无法读取库位目录: {}", e))?
            .is_empty();
        if catalog_empty {
            let layout = config_manager
                .get_rack_layout()
                .map_err(|e| format!("无法读取货架配置: {}", e))?;
            let seeded = slot_repo
                .seed_layout(&layout)
                .map_err(|e| format!("无法登记库位: {}", e))?;
            tracing::info!(seeded, "库位目录为空,已按货架配置登记");
        }

        let storage_api = Arc::new(
            StorageApi::new(
                slot_repo.clone(),
                unit_repo,
                layer_spec_repo.clone(),
                plan_repo.clone(),
                action_log_repo.clone(),
                config_manager.clone(),
            )
            .map_err(|e| format!("无法创建StorageApi: {}", e))?,
        );

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            storage_api,
            config_manager,
            slot_repo,
            layer_spec_repo,
            plan_repo,
            action_log_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: PU_STOCK_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PU_STOCK_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./pu_stock.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录,避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("pu-stock-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("pu-stock");

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("pu_stock.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_default_catalog_once() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let db_path = tmp.path().to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        // 3 个货架 × 84 列 × 13 行
        assert_eq!(state.slot_repo.count_active().unwrap(), 84 * 13);

        state
            .storage_api
            .set_slot_active("E1", false, "tester")
            .unwrap();
        drop(state);

        let state = AppState::new(db_path).unwrap();
        assert_eq!(state.slot_repo.count_active().unwrap(), 84 * 13 - 1);
    }
}
