// ==========================================
// PU 切割仓储系统 - 库位领域模型
// ==========================================
// 职责: 库位编码、库位目录条目、货架列范围
// 红线: 库位编码全局唯一,跨货架不得重复
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// 库位行字母范围（A 最深,M 最靠通道）
pub const FIRST_ROW: char = 'A';
pub const LAST_ROW: char = 'M';

/// 默认库区名称
pub const DEFAULT_AREA: &str = "COLMEIA";

// ==========================================
// SlotCode - 库位编码（行字母 + 列号,如 E1）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotCode {
    row: char,
    column: u32,
}

impl SlotCode {
    pub fn new(row: char, column: u32) -> Result<Self, String> {
        let row = row.to_ascii_uppercase();
        if !(FIRST_ROW..=LAST_ROW).contains(&row) {
            return Err(format!("库位行字母越界: {} (允许 {}-{})", row, FIRST_ROW, LAST_ROW));
        }
        if column == 0 {
            return Err("库位列号必须为正整数".to_string());
        }
        Ok(Self { row, column })
    }

    pub fn row(&self) -> char {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SlotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

impl FromStr for SlotCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let row = chars
            .next()
            .ok_or_else(|| "库位编码不能为空".to_string())?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("库位编码格式错误: {}", s));
        }
        let column: u32 = digits
            .parse()
            .map_err(|_| format!("库位列号无效: {}", s))?;
        SlotCode::new(row, column)
    }
}

impl TryFrom<String> for SlotCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotCode> for String {
    fn from(code: SlotCode) -> Self {
        code.to_string()
    }
}

// ==========================================
// Slot - 库位目录条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub code: SlotCode,
    pub rack_name: String, // 所属货架 (RACK1/RACK2/RACK3)
    pub area: String,      // 库区 (COLMEIA)
    pub active: bool,
}

impl Slot {
    pub fn new(code: SlotCode, rack_name: &str) -> Self {
        Self {
            code,
            rack_name: rack_name.to_string(),
            area: DEFAULT_AREA.to_string(),
            active: true,
        }
    }
}

// ==========================================
// SlotOccupant - 库位占用行（按库位+件类型聚合）
// ==========================================
// 来源: PENDING / QUEUED / IN_STOCK 物理件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOccupant {
    pub slot_code: String,
    pub piece_type: String,
    pub units: i64,
}

// ==========================================
// RackRange / RackLayout - 货架列范围（静态配置）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackRange {
    pub name: String,
    pub first_column: u32,
    pub last_column: u32,
}

impl RackRange {
    pub fn new(name: &str, first_column: u32, last_column: u32) -> Self {
        Self {
            name: name.to_string(),
            first_column,
            last_column,
        }
    }

    pub fn columns(&self) -> std::ops::RangeInclusive<u32> {
        self.first_column..=self.last_column
    }
}

/// 货架按声明顺序排列,填充顺序依此遍历
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RackRange>", into = "Vec<RackRange>")]
pub struct RackLayout {
    racks: Vec<RackRange>,
}

impl RackLayout {
    /// 校验: 名称非空且唯一、列范围有效且互不重叠
    pub fn new(racks: Vec<RackRange>) -> Result<Self, String> {
        if racks.is_empty() {
            return Err("货架配置不能为空".to_string());
        }

        let mut names = HashSet::new();
        for rack in &racks {
            if rack.name.trim().is_empty() {
                return Err("货架名称不能为空".to_string());
            }
            if !names.insert(rack.name.as_str()) {
                return Err(format!("货架名称重复: {}", rack.name));
            }
            if rack.first_column == 0 || rack.first_column > rack.last_column {
                return Err(format!(
                    "货架 {} 列范围无效: {}-{}",
                    rack.name, rack.first_column, rack.last_column
                ));
            }
        }

        for (i, a) in racks.iter().enumerate() {
            for b in racks.iter().skip(i + 1) {
                if a.first_column <= b.last_column && b.first_column <= a.last_column {
                    return Err(format!("货架 {} 与 {} 列范围重叠", a.name, b.name));
                }
            }
        }

        Ok(Self { racks })
    }

    pub fn racks(&self) -> &[RackRange] {
        &self.racks
    }

    /// 按列号查找所属货架
    pub fn rack_for_column(&self, column: u32) -> Option<&RackRange> {
        self.racks.iter().find(|r| r.columns().contains(&column))
    }
}

impl Default for RackLayout {
    /// 三个固定货架: RACK1 1-28, RACK2 29-56, RACK3 57-84
    fn default() -> Self {
        Self {
            racks: vec![
                RackRange::new("RACK1", 1, 28),
                RackRange::new("RACK2", 29, 56),
                RackRange::new("RACK3", 57, 84),
            ],
        }
    }
}

impl TryFrom<Vec<RackRange>> for RackLayout {
    type Error = String;

    fn try_from(racks: Vec<RackRange>) -> Result<Self, Self::Error> {
        RackLayout::new(racks)
    }
}

impl From<RackLayout> for Vec<RackRange> {
    fn from(layout: RackLayout) -> Self {
        layout.racks
    }
}
