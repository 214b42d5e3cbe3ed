// ==========================================
// PU 切割仓储系统 - 层别规格领域模型
// ==========================================
// 职责: camada 规格 (L1/L3/L3_B/special_pieces) 与展开后的物理件规格
// 红线: 规格缺失或格式异常时就地兜底,不得丢件
// ==========================================

use crate::domain::types::{ArtifactSuffix, LayerKind};
use serde::{Deserialize, Serialize};

/// "无值" 标记
pub const NO_VALUE_MARKER: &str = "-";

/// 单个层别字段最多展开的件数（切割文件序号为两位）
pub const MAX_LAYER_UNITS: u32 = 99;

// ==========================================
// LayerCount - 单个层别字段的解析结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerCount {
    Absent,        // 缺失 / 空白 / "-"
    Exact(u32),    // 可解析整数（负数按 0 处理）
    Unspecified,   // 有值但不是整数,按 1 件处理
}

impl LayerCount {
    pub fn parse(raw: Option<&str>) -> LayerCount {
        let value = match raw.map(str::trim) {
            None => return LayerCount::Absent,
            Some(v) if v.is_empty() || v == NO_VALUE_MARKER => return LayerCount::Absent,
            Some(v) => v,
        };

        match value.parse::<i64>() {
            Ok(n) if n > 0 => LayerCount::Exact(u32::try_from(n).unwrap_or(u32::MAX)),
            Ok(_) => LayerCount::Exact(0),
            Err(_) => LayerCount::Unspecified,
        }
    }

    /// 展开件数,上限 MAX_LAYER_UNITS
    pub fn units(&self) -> u32 {
        match self {
            LayerCount::Absent => 0,
            LayerCount::Exact(n) => (*n).min(MAX_LAYER_UNITS),
            LayerCount::Unspecified => 1,
        }
    }

    /// 原值超过上限,展开时被截断
    pub fn is_capped(&self) -> bool {
        matches!(self, LayerCount::Exact(n) if *n > MAX_LAYER_UNITS)
    }
}

// ==========================================
// LayerSpec - 层别规格（按 project + piece_type）
// ==========================================
// 对齐: layer_spec 表,字段保持原始文本
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub project: String,
    pub piece_type: String,
    pub l1: Option<String>,
    pub l3: Option<String>,
    pub l3_b: Option<String>,
    pub special_pieces: Option<String>,
}

impl LayerSpec {
    pub fn new(project: &str, piece_type: &str) -> Self {
        Self {
            project: project.to_string(),
            piece_type: piece_type.to_string(),
            ..Default::default()
        }
    }

    pub fn with_l1(mut self, v: &str) -> Self {
        self.l1 = Some(v.to_string());
        self
    }

    pub fn with_l3(mut self, v: &str) -> Self {
        self.l3 = Some(v.to_string());
        self
    }

    pub fn with_l3_b(mut self, v: &str) -> Self {
        self.l3_b = Some(v.to_string());
        self
    }

    pub fn with_special_pieces(mut self, v: &str) -> Self {
        self.special_pieces = Some(v.to_string());
        self
    }

    /// 按 L1, L3, L3_B 顺序返回各层件数
    pub fn layer_counts(&self) -> [(LayerKind, LayerCount); 3] {
        [
            (LayerKind::L1, LayerCount::parse(self.l1.as_deref())),
            (LayerKind::L3, LayerCount::parse(self.l3.as_deref())),
            (LayerKind::L3B, LayerCount::parse(self.l3_b.as_deref())),
        ]
    }

    /// 替代件编码列表（逗号和连字符都作分隔符）
    pub fn special_piece_codes(&self) -> Vec<String> {
        self.special_pieces
            .as_deref()
            .map(split_special_pieces)
            .unwrap_or_default()
    }
}

pub fn split_special_pieces(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '-')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

// ==========================================
// PhysicalUnitSpec - 展开后的单个物理件规格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalUnitSpec {
    /// 产生该件的编码（替代件展开时为替代编码）
    pub part_code: String,
    /// None = 无层别兜底件
    pub layer: Option<LayerKind>,
    /// 同一 (part_code, 存储层别) 内的序号,从 1 开始
    pub artifact_seq: u32,
}

impl PhysicalUnitSpec {
    pub fn untagged(part_code: &str) -> Self {
        Self {
            part_code: part_code.to_string(),
            layer: None,
            artifact_seq: 1,
        }
    }

    /// 入库层别（L3_B 归并为 L3）
    pub fn layer_tag(&self) -> Option<&'static str> {
        self.layer.map(|l| l.stored_tag())
    }

    pub fn artifact_suffix(&self) -> Option<ArtifactSuffix> {
        self.layer.map(|l| l.artifact_suffix())
    }

    /// 下游切割文件名: {op}_{peca}_{projeto}_{camada}{sufixo}_{nn}
    ///
    /// 无层别件不生成切割文件,返回 None
    pub fn artifact_name(&self, order_id: &str, piece_type: &str, project: &str) -> Option<String> {
        let layer = self.layer?;
        Some(format!(
            "{}_{}_{}_{}{}_{:02}",
            order_id,
            piece_type,
            project,
            layer.stored_tag(),
            layer.artifact_suffix(),
            self.artifact_seq
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_count_parse() {
        assert_eq!(LayerCount::parse(None), LayerCount::Absent);
        assert_eq!(LayerCount::parse(Some("")), LayerCount::Absent);
        assert_eq!(LayerCount::parse(Some("  ")), LayerCount::Absent);
        assert_eq!(LayerCount::parse(Some("-")), LayerCount::Absent);
        assert_eq!(LayerCount::parse(Some("3")), LayerCount::Exact(3));
        assert_eq!(LayerCount::parse(Some(" 2 ")), LayerCount::Exact(2));
        assert_eq!(LayerCount::parse(Some("0")), LayerCount::Exact(0));
        assert_eq!(LayerCount::parse(Some("-2")), LayerCount::Exact(0));
        assert_eq!(LayerCount::parse(Some("X")), LayerCount::Unspecified);
        assert_eq!(LayerCount::parse(Some("2.0")), LayerCount::Unspecified);

        assert_eq!(LayerCount::Unspecified.units(), 1);
        assert_eq!(LayerCount::Absent.units(), 0);
    }

    #[test]
    fn test_huge_layer_count_is_capped() {
        let count = LayerCount::parse(Some("999999999"));
        assert_eq!(count, LayerCount::Exact(999_999_999));
        assert!(count.is_capped());
        assert_eq!(count.units(), MAX_LAYER_UNITS);

        let overflow = LayerCount::parse(Some("99999999999999"));
        assert_eq!(overflow.units(), MAX_LAYER_UNITS);

        assert!(!LayerCount::Exact(MAX_LAYER_UNITS).is_capped());
        assert_eq!(LayerCount::Exact(MAX_LAYER_UNITS).units(), MAX_LAYER_UNITS);
    }

    #[test]
    fn test_split_special_pieces() {
        assert_eq!(split_special_pieces("A, B-C"), vec!["A", "B", "C"]);
        assert_eq!(split_special_pieces(" ,- "), Vec::<String>::new());
        assert_eq!(split_special_pieces("TSP"), vec!["TSP"]);
    }

    #[test]
    fn test_artifact_name() {
        let spec = PhysicalUnitSpec {
            part_code: "PBS".to_string(),
            layer: Some(LayerKind::L3B),
            artifact_seq: 3,
        };
        assert_eq!(spec.layer_tag(), Some("L3"));
        assert_eq!(
            spec.artifact_name("1001", "PBS", "P10").as_deref(),
            Some("1001_PBS_P10_L3-B_03")
        );
        assert_eq!(PhysicalUnitSpec::untagged("PBS").artifact_name("1", "PBS", "P"), None);
    }
}
