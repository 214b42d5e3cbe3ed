// ==========================================
// PU 切割仓储系统 - Lote 生命周期跟踪
// ==========================================
// 状态: 未开始 → PROGRAMANDO → PROGRAMADO → CORTADO（单调）
// 职责: 依据台账在库件数与计划期望件数推进 lote 状态
// 红线: 只读台账计数、只写计划状态字段,从不修改物理件;
//       期望件数为 0 视为"无数据",不可判定为 CORTADO;
//       CORTADO 不回退
// ==========================================

use crate::domain::lote::{LoteLink, LoteProgress};
use crate::domain::types::LoteStatus;
use crate::engine::providers::{ProductionPlanProvider, StockCounter};
use crate::repository::error::RepositoryResult;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct LoteTracker<P, S>
where
    P: ProductionPlanProvider,
    S: StockCounter,
{
    plan: Arc<P>,
    stock: Arc<S>,
    lote_pu_prefix: String,
}

impl<P, S> LoteTracker<P, S>
where
    P: ProductionPlanProvider,
    S: StockCounter,
{
    pub fn new(plan: Arc<P>, stock: Arc<S>, lote_pu_prefix: &str) -> Self {
        Self {
            plan,
            stock,
            lote_pu_prefix: lote_pu_prefix.to_string(),
        }
    }

    /// 由计划 id_lote 派生物理件上的 lote 关联
    pub fn link_for(&self, id_lote: &str) -> LoteLink {
        LoteLink::from_lote_vd(id_lote, &self.lote_pu_prefix)
    }

    /// 完成度快照（只读）
    pub fn progress(&self, id_lote: &str) -> RepositoryResult<LoteProgress> {
        let id_lote = id_lote.trim();
        let link = self.link_for(id_lote);
        Ok(LoteProgress {
            id_lote: id_lote.to_string(),
            expected_units: self.plan.expected_unit_count(id_lote)?,
            in_stock_units: self.stock.count_in_stock(&link)?,
            status: self.plan.lote_status(id_lote)?,
        })
    }

    /// 重新判定 lote 是否全部入库
    ///
    /// # 返回
    /// - true: lote 为 CORTADO（本次推进或此前已是）
    /// - false: 尚未完成,或期望件数为 0
    #[instrument(skip(self))]
    pub fn refresh(&self, id_lote: &str) -> RepositoryResult<bool> {
        let id_lote = id_lote.trim();
        if id_lote.is_empty() {
            return Ok(false);
        }

        if self.plan.lote_status(id_lote)? == LoteStatus::Cortado {
            return Ok(true);
        }

        let expected = self.plan.expected_unit_count(id_lote)?;
        if expected <= 0 {
            debug!(id_lote, "计划中无期望件,不判定完成");
            return Ok(false);
        }

        let in_stock = self.stock.count_in_stock(&self.link_for(id_lote))?;
        if in_stock >= expected {
            let rows = self.plan.advance_lote_status(id_lote, LoteStatus::Cortado)?;
            info!(id_lote, in_stock, expected, rows, "lote 全部入库,标记为 CORTADO");
            Ok(true)
        } else {
            debug!(id_lote, in_stock, expected, "lote 尚未完成");
            Ok(false)
        }
    }

    /// 复查全部未完成 lote,返回本次标记为 CORTADO 的 id_lote
    #[instrument(skip(self))]
    pub fn sweep(&self) -> RepositoryResult<Vec<String>> {
        let candidates = self.plan.sweepable_lotes()?;
        let mut completed = Vec::new();
        for id_lote in &candidates {
            if self.refresh(id_lote)? {
                completed.push(id_lote.clone());
            }
        }
        info!(checked = candidates.len(), completed = completed.len(), "lote 状态复查完成");
        Ok(completed)
    }

    /// lote 进入采集（只推进未开始的行）
    pub fn mark_programando(&self, id_lote: &str) -> RepositoryResult<usize> {
        let rows = self
            .plan
            .advance_lote_status(id_lote.trim(), LoteStatus::Programando)?;
        debug!(id_lote, rows, "lote 标记为 PROGRAMANDO");
        Ok(rows)
    }

    /// 逻辑件已排入切割队列
    pub fn mark_programado(&self, order_id: &str, piece_type: &str) -> RepositoryResult<usize> {
        self.plan
            .advance_piece_status(order_id, piece_type, LoteStatus::Programado)
    }
}
