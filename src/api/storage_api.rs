// ==========================================
// PU 切割仓储系统 - 仓储用例 API
// ==========================================
// 职责: 库位分配、层别展开、台账提交、lote 状态刷新,
//       以及排产采集、优化、入库/出库、回库、库位管理等用例
// 红线: 每个用例自行读取最新占用,不跨请求保存分配状态;
//       台账写入后记录操作日志（日志失败不影响主操作）
// ==========================================

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::api::error::{config_error, ApiError, ApiResult};
use crate::config::{ConfigManager, StorageConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::layer::PhysicalUnitSpec;
use crate::domain::lote::{LoteLink, LoteSummary};
use crate::domain::slot::{Slot, SlotCode};
use crate::domain::types::{ExitReason, Membership};
use crate::domain::unit::{CommitOutcome, PieceRequest, PieceUnit, SlotAssignment, UnitDraft};
use crate::engine::{LayerExpander, LoteTracker, SlotAllocator};
use crate::i18n::t_with_args;
use crate::repository::{
    ActionLogRepository, LayerSpecRepository, PieceUnitRepository, ProductionPlanRepository,
    SlotRepository,
};

mod intake;
mod movements;
mod slots;

#[cfg(test)]
mod tests;

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 逻辑件来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceSource {
    Plan,   // 生产计划行
    Manual, // 人工录入 (PENDING)
}

/// 待优化逻辑件（已建议库位）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPiece {
    pub request: PieceRequest,
    pub lote: LoteLink,
    /// None = 无可用库位
    pub slot: Option<SlotAssignment>,
    pub source: PieceSource,
}

impl PlannedPiece {
    /// 库位显示文本,无库位时为本地化的"无可用库位"
    pub fn slot_label(&self) -> String {
        match &self.slot {
            Some(slot) => slot.code.to_string(),
            None => crate::i18n::t("storage.no_slot"),
        }
    }
}

/// lote 采集结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotePlan {
    pub id_lote: String,
    pub pieces: Vec<PlannedPiece>,
    /// 无库位的件数
    pub unassigned: usize,
}

/// 优化提交结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub pieces: usize,
    pub queued_units: usize,
    /// 下游切割文件名（无层别件不生成）
    pub artifacts: Vec<String>,
    pub message: String,
}

/// 批量迁移结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReport {
    pub requested: usize,
    pub moved: usize,
    /// 不在源集合中而被跳过的件数
    pub skipped: usize,
    /// 本次判定为 CORTADO 的 lote
    pub completed_lotes: Vec<String>,
    pub message: String,
}

/// 人工录入请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualPieceRequest {
    pub parent_order_id: Option<String>,
    pub order_id: String,
    pub piece_type: String,
    pub project: String,
    pub vehicle: String,
    pub sensor: Option<String>,
}

/// 回库请求（项目/车型缺省时取出库历史）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub order_id: String,
    pub piece_type: String,
    pub project: Option<String>,
    pub vehicle: Option<String>,
}

/// 单件写入台账结果（人工录入 / 回库）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementReport {
    pub order_id: String,
    pub piece_type: String,
    pub slot: SlotAssignment,
    pub units: usize,
    pub lote: LoteLink,
    pub lote_completed: bool,
    pub message: String,
}

/// 库位可用统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub total_active: i64,
    pub occupied: i64,
    pub available: i64,
}

/// 单个库位的占用件数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPieceCount {
    pub slot_code: String,
    pub units: i64,
}

// ==========================================
// StorageApi - 仓储用例 API
// ==========================================
pub struct StorageApi {
    slot_repo: Arc<SlotRepository>,
    unit_repo: Arc<PieceUnitRepository>,
    plan_repo: Arc<ProductionPlanRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    allocator: SlotAllocator<SlotRepository, PieceUnitRepository>,
    expander: LayerExpander<LayerSpecRepository>,
    tracker: LoteTracker<ProductionPlanRepository, PieceUnitRepository>,
}

impl StorageApi {
    /// 创建 StorageApi
    ///
    /// 货架布局与 lote_pu 前缀在创建时读取;批量大小、传感器规则每次调用读取
    pub fn new(
        slot_repo: Arc<SlotRepository>,
        unit_repo: Arc<PieceUnitRepository>,
        layer_spec_repo: Arc<LayerSpecRepository>,
        plan_repo: Arc<ProductionPlanRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> ApiResult<Self> {
        let layout = config_manager.get_rack_layout().map_err(config_error)?;
        let prefix = config_manager.get_lote_pu_prefix().map_err(config_error)?;

        Ok(Self {
            allocator: SlotAllocator::new(slot_repo.clone(), unit_repo.clone(), layout),
            expander: LayerExpander::new(layer_spec_repo),
            tracker: LoteTracker::new(plan_repo.clone(), unit_repo.clone(), &prefix),
            slot_repo,
            unit_repo,
            plan_repo,
            action_log_repo,
            config_manager,
        })
    }

    // ==========================================
    // 核心操作
    // ==========================================

    /// 为一个件类型分配库位
    ///
    /// # 返回
    /// - Ok(None): 无可用库位（正常结果,调用方自行标记"无库位"）
    pub fn allocate_slot(
        &self,
        piece_type: &str,
        extra_blocked: &HashSet<SlotCode>,
    ) -> ApiResult<Option<Slot>> {
        let piece_type = piece_type.trim();
        if piece_type.is_empty() {
            return Err(ApiError::InvalidInput("件类型不能为空".to_string()));
        }
        Ok(self.allocator.allocate(piece_type, extra_blocked)?)
    }

    /// 层别展开
    pub fn expand_layers(&self, project: &str, piece_code: &str) -> ApiResult<Vec<PhysicalUnitSpec>> {
        if piece_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("件编码不能为空".to_string()));
        }
        Ok(self.expander.expand(project.trim(), piece_code.trim())?)
    }

    /// 提交物理件到台账
    ///
    /// 冲突以值返回（CommitOutcome::conflicts）,由调用方重新分配
    pub fn commit_units(
        &self,
        drafts: &[UnitDraft],
        destination: Membership,
        clear_pending: bool,
        actor: &str,
    ) -> ApiResult<CommitOutcome> {
        if drafts.is_empty() && !clear_pending {
            return Ok(CommitOutcome::default());
        }
        Ok(self
            .unit_repo
            .commit_units(drafts, destination, clear_pending, actor)?)
    }

    /// 重新判定 lote 是否全部入库
    pub fn refresh_lote_status(&self, id_lote: &str) -> ApiResult<bool> {
        Ok(self.tracker.refresh(id_lote)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 记录操作日志,失败只告警
    fn record_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }

    /// 操作日志 payload 附带配置快照
    fn config_snapshot(&self) -> serde_json::Value {
        self.config_manager
            .get_config_snapshot()
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or(serde_json::Value::Null)
    }

    /// 一组逻辑件展开为物理件草稿
    fn expand_drafts(
        &self,
        request: &PieceRequest,
        slot: &SlotAssignment,
        lote: &LoteLink,
    ) -> ApiResult<Vec<UnitDraft>> {
        let specs = self.expander.expand(&request.project, &request.piece_type)?;
        Ok(UnitDraft::expand(request, slot, &specs, lote))
    }

    /// 提交结果转换: 冲突 → SlotConflict
    fn ensure_committed(outcome: CommitOutcome) -> ApiResult<usize> {
        if outcome.is_committed() {
            Ok(outcome.inserted)
        } else {
            Err(ApiError::SlotConflict {
                slots: outcome.conflicts,
            })
        }
    }

    /// 依次刷新迁移涉及的 lote,返回判定为完成的 id_lote
    fn refresh_touched_lotes(&self, units: &[PieceUnit]) -> ApiResult<Vec<String>> {
        let lotes: BTreeSet<&str> = units
            .iter()
            .filter_map(|u| u.lote.lote_vd.as_deref())
            .filter(|v| !v.is_empty())
            .collect();

        let mut completed = Vec::new();
        for id_lote in lotes {
            if self.tracker.refresh(id_lote)? {
                debug!(id_lote, "lote 已完成");
                completed.push(id_lote.to_string());
            }
        }
        Ok(completed)
    }

    fn message(key: &str, args: &[(&str, &str)]) -> String {
        t_with_args(key, args)
    }
}

/// 去重并保持原顺序
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[instrument(skip_all, fields(count = ids.len()))]
fn validate_ids(ids: &[i64]) -> ApiResult<Vec<i64>> {
    if ids.is_empty() {
        return Err(ApiError::InvalidInput("未选择任何物理件".to_string()));
    }
    let ids = dedup_ids(ids);
    info!(unique = ids.len(), "待迁移物理件");
    Ok(ids)
}

/// 必填文本字段
fn required(field: &str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::InvalidInput(format!("{}不能为空", field)))
    } else {
        Ok(value.to_string())
    }
}

/// 出库原因
fn exit_reason_for(mass: bool) -> ExitReason {
    if mass {
        ExitReason::MassExit
    } else {
        ExitReason::StockExit
    }
}
