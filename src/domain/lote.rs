// ==========================================
// PU 切割仓储系统 - Lote（切割批次）领域模型
// ==========================================
// 职责: lote 关联 (lote_vd/lote_pu)、lote 摘要、完成度
// 红线: 期望件数为 0 视为"无数据",不可判定为 CORTADO
// ==========================================

use crate::domain::types::LoteStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// lote_pu 默认前缀
pub const DEFAULT_LOTE_PU_PREFIX: &str = "PU";

// ==========================================
// LoteLink - 物理件上的 lote 关联
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoteLink {
    pub lote_vd: Option<String>,
    pub lote_pu: Option<String>,
}

impl LoteLink {
    pub fn none() -> Self {
        Self::default()
    }

    /// 由生产计划 id_lote 派生: lote_pu = 前缀 + id_lote[2..]
    pub fn from_lote_vd(lote_vd: &str, prefix: &str) -> Self {
        let lote_vd = lote_vd.trim();
        if lote_vd.is_empty() {
            return Self::none();
        }
        Self {
            lote_vd: Some(lote_vd.to_string()),
            lote_pu: Some(derive_lote_pu(lote_vd, prefix)),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.lote_vd.as_deref().map_or(false, |v| !v.is_empty())
    }
}

pub fn derive_lote_pu(lote_vd: &str, prefix: &str) -> String {
    match lote_vd.char_indices().nth(2) {
        Some((idx, _)) => format!("{}{}", prefix, &lote_vd[idx..]),
        None if lote_vd.chars().count() == 2 => prefix.to_string(),
        None => lote_vd.to_string(),
    }
}

// ==========================================
// LoteSummary - 可排 lote 列表项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoteSummary {
    pub id_lote: String,
    pub data_programacao: Option<NaiveDate>,
    pub turno_programacao: Option<String>,
    pub display: String,
}

impl LoteSummary {
    pub fn new(
        id_lote: String,
        data_programacao: Option<NaiveDate>,
        turno_programacao: Option<String>,
    ) -> Self {
        let turno = turno_programacao
            .as_deref()
            .map(format_turno)
            .unwrap_or_default();
        let data = data_programacao
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        let display = format!("{} - {} - {}", turno, data, id_lote);
        Self {
            id_lote,
            data_programacao,
            turno_programacao,
            display,
        }
    }
}

/// 班次显示: primeiro → 1°, segundo → 2°, terceiro → 3°,其余原样
pub fn format_turno(turno: &str) -> String {
    match turno.trim() {
        "primeiro" => "1°".to_string(),
        "segundo" => "2°".to_string(),
        "terceiro" => "3°".to_string(),
        other => other.to_string(),
    }
}

// ==========================================
// PlanRow - 生产计划行（一行 = 一个期望件）
// ==========================================
// 对齐: production_plan 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRow {
    pub plan_row_id: i64,
    pub id_lote: String,
    pub order_id: String,
    pub piece_type: String,
    pub project: String,
    pub vehicle: Option<String>,
    pub sensor: Option<String>,
    pub status: Option<String>,      // 计划状态 (PROGRAMADO 等)
    pub etapa_baixa: Option<String>, // 工序
    pub data_programacao: Option<NaiveDate>,
    pub turno_programacao: Option<String>,
    pub pu_cortado: LoteStatus,
}

impl PlanRow {
    pub fn new(id_lote: &str, order_id: &str, piece_type: &str, project: &str) -> Self {
        Self {
            plan_row_id: 0,
            id_lote: id_lote.to_string(),
            order_id: order_id.to_string(),
            piece_type: piece_type.to_string(),
            project: project.to_string(),
            vehicle: None,
            sensor: None,
            status: Some(PLAN_STATUS_PROGRAMADO.to_string()),
            etapa_baixa: None,
            data_programacao: None,
            turno_programacao: None,
            pu_cortado: LoteStatus::NotStarted,
        }
    }
}

/// 计划侧"已排产"状态值
pub const PLAN_STATUS_PROGRAMADO: &str = "PROGRAMADO";

/// 允许出现在可排 lote 中的工序（另含 NULL/空）
pub const OPEN_ETAPAS: [&str; 2] = ["INSPECAO FINAL", "RT-RP"];

// ==========================================
// LoteProgress - 完成度快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoteProgress {
    pub id_lote: String,
    pub expected_units: i64,
    pub in_stock_units: i64,
    pub status: LoteStatus,
}

impl LoteProgress {
    pub fn is_complete(&self) -> bool {
        self.expected_units > 0 && self.in_stock_units >= self.expected_units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_lote_pu() {
        assert_eq!(derive_lote_pu("VD123", "PU"), "PU123");
        assert_eq!(derive_lote_pu("VD", "PU"), "PU");
        assert_eq!(derive_lote_pu("V", "PU"), "V");
        assert_eq!(derive_lote_pu("VDÇ9", "PU"), "PUÇ9");
    }

    #[test]
    fn test_lote_link() {
        let link = LoteLink::from_lote_vd(" VD123 ", DEFAULT_LOTE_PU_PREFIX);
        assert_eq!(link.lote_vd.as_deref(), Some("VD123"));
        assert_eq!(link.lote_pu.as_deref(), Some("PU123"));
        assert!(link.is_linked());
        assert!(!LoteLink::from_lote_vd("", "PU").is_linked());
    }

    #[test]
    fn test_lote_summary_display() {
        let s = LoteSummary::new(
            "VD55".to_string(),
            NaiveDate::from_ymd_opt(2026, 3, 7),
            Some("segundo".to_string()),
        );
        assert_eq!(s.display, "2° - 07/03/2026 - VD55");
    }

    #[test]
    fn test_progress_zero_expected_is_not_complete() {
        let p = LoteProgress {
            id_lote: "VD1".to_string(),
            expected_units: 0,
            in_stock_units: 0,
            status: LoteStatus::Programado,
        };
        assert!(!p.is_complete());
    }
}
