// ==========================================
// PU 切割仓储系统 - 仓储配置读取 Trait
// ==========================================
// 职责: 定义用例层所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::slot::RackLayout;
use std::error::Error;

// ==========================================
// StorageConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait StorageConfigReader: Send + Sync {
    /// 货架布局（声明顺序即填充顺序）
    ///
    /// # 默认值
    /// - RACK1 1-28, RACK2 29-56, RACK3 57-84
    fn get_rack_layout(&self) -> Result<RackLayout, Box<dyn Error>>;

    /// 批量迁移时单个事务处理的物理件数
    ///
    /// # 默认值
    /// - 50
    fn get_commit_chunk_size(&self) -> Result<usize, Box<dyn Error>>;

    /// lote_pu 前缀
    ///
    /// # 默认值
    /// - PU
    fn get_lote_pu_prefix(&self) -> Result<String, Box<dyn Error>>;

    /// 人工录入时必须填写传感器的件类型（大写）
    ///
    /// # 默认值
    /// - [PBS]
    fn get_sensor_required_piece_types(&self) -> Result<Vec<String>, Box<dyn Error>>;
}
