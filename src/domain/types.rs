// ==========================================
// PU 切割仓储系统 - 领域类型定义
// ==========================================
// 职责: 归属集合、camada 层别、lote 状态、出库原因
// 红线: 一个物理件同一时刻只属于一个集合
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 归属集合 (Membership)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Membership {
    Pending, // 人工录入,尚未排入切割队列
    Queued,  // 已优化,等待切割
    InStock, // 已入库
    Exited,  // 已出库/已剔除
}

impl Membership {
    /// 占用库位的集合（出库件不占位）
    pub const OCCUPYING: [Membership; 3] =
        [Membership::Pending, Membership::Queued, Membership::InStock];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Membership::Pending => "PENDING",
            Membership::Queued => "QUEUED",
            Membership::InStock => "IN_STOCK",
            Membership::Exited => "EXITED",
        }
    }

    pub fn occupies_slot(&self) -> bool {
        !matches!(self, Membership::Exited)
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FromStr for Membership {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PENDING" => Ok(Membership::Pending),
            "QUEUED" => Ok(Membership::Queued),
            "IN_STOCK" => Ok(Membership::InStock),
            "EXITED" => Ok(Membership::Exited),
            other => Err(format!("未知归属集合: {}", other)),
        }
    }
}

// ==========================================
// 层别 (Camada)
// ==========================================
// L3B 入库时归并为 L3,但产物编号保留 -B 后缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    L1,
    L3,
    #[serde(rename = "L3_B")]
    L3B,
}

impl LayerKind {
    /// 原始层别名（保留 L3_B）
    pub fn variant_str(&self) -> &'static str {
        match self {
            LayerKind::L1 => "L1",
            LayerKind::L3 => "L3",
            LayerKind::L3B => "L3_B",
        }
    }

    /// 入库存储用层别（L3_B → L3）
    pub fn stored_tag(&self) -> &'static str {
        match self {
            LayerKind::L1 => "L1",
            LayerKind::L3 | LayerKind::L3B => "L3",
        }
    }

    pub fn artifact_suffix(&self) -> ArtifactSuffix {
        match self {
            LayerKind::L3B => ArtifactSuffix::B,
            _ => ArtifactSuffix::A,
        }
    }

    /// 从 layer_variant / layer_tag 列恢复
    pub fn from_db_str(s: &str) -> Option<LayerKind> {
        match s.trim() {
            "L1" => Some(LayerKind::L1),
            "L3" => Some(LayerKind::L3),
            "L3_B" => Some(LayerKind::L3B),
            _ => None,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant_str())
    }
}

/// 下游切割文件后缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactSuffix {
    #[serde(rename = "-A")]
    A,
    #[serde(rename = "-B")]
    B,
}

impl ArtifactSuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactSuffix::A => "-A",
            ArtifactSuffix::B => "-B",
        }
    }
}

impl fmt::Display for ArtifactSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Lote 切割状态 (pu_cortado)
// ==========================================
// 单调推进: NotStarted → Programando → Programado → Cortado
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoteStatus {
    NotStarted,
    Programando, // 采集中
    Programado,  // 已排队
    Cortado,     // 全部入库
}

impl LoteStatus {
    /// 数据库值；NotStarted 对应 NULL
    pub fn to_db_str(&self) -> Option<&'static str> {
        match self {
            LoteStatus::NotStarted => None,
            LoteStatus::Programando => Some("PROGRAMANDO"),
            LoteStatus::Programado => Some("PROGRAMADO"),
            LoteStatus::Cortado => Some("CORTADO"),
        }
    }

    /// NULL / 空串 / 未知值 均视为未开始
    pub fn from_db(value: Option<&str>) -> LoteStatus {
        match value.map(str::trim) {
            Some("PROGRAMANDO") => LoteStatus::Programando,
            Some("PROGRAMADO") => LoteStatus::Programado,
            Some("CORTADO") => LoteStatus::Cortado,
            _ => LoteStatus::NotStarted,
        }
    }

    /// 已达到或越过 `self` 的数据库值;推进写入只作用于不在此列表中的行
    pub fn at_or_beyond(&self) -> &'static [&'static str] {
        match self {
            LoteStatus::NotStarted => &["PROGRAMANDO", "PROGRAMADO", "CORTADO"],
            LoteStatus::Programando => &["PROGRAMANDO", "PROGRAMADO", "CORTADO"],
            LoteStatus::Programado => &["PROGRAMADO", "CORTADO"],
            LoteStatus::Cortado => &["CORTADO"],
        }
    }
}

impl fmt::Display for LoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str().unwrap_or("NOT_STARTED"))
    }
}

// ==========================================
// 出库原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StockExit,
    MassExit,
    Exclusion(String),
}

impl ExitReason {
    pub fn to_db_string(&self) -> String {
        match self {
            ExitReason::StockExit => "SAÍDA DO ESTOQUE".to_string(),
            ExitReason::MassExit => "SAÍDA MASSIVA".to_string(),
            ExitReason::Exclusion(motivo) => format!("EXCLUSÃO: {}", motivo.trim()),
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
