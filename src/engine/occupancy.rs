// ==========================================
// PU 切割仓储系统 - 库位占用索引
// ==========================================
// 职责: 由占用行构建只读索引（已占用集合 + 每库位件类型）
// 红线: 索引只在单次分配调用内有效,不跨调用缓存
// ==========================================

use crate::domain::slot::{SlotCode, SlotOccupant};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    types_by_slot: HashMap<SlotCode, BTreeSet<String>>,
    units_by_slot: HashMap<SlotCode, i64>,
}

impl OccupancyIndex {
    pub fn from_occupants<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = SlotOccupant>,
    {
        let mut index = OccupancyIndex::default();
        for row in rows {
            let code = match row.slot_code.parse::<SlotCode>() {
                Ok(code) => code,
                Err(e) => {
                    debug!(slot_code = %row.slot_code, error = %e, "忽略无法解析的占用库位");
                    continue;
                }
            };
            index
                .types_by_slot
                .entry(code.clone())
                .or_default()
                .insert(row.piece_type);
            *index.units_by_slot.entry(code).or_insert(0) += row.units;
        }
        index
    }

    pub fn is_occupied(&self, code: &SlotCode) -> bool {
        self.types_by_slot.contains_key(code)
    }

    pub fn occupied(&self) -> HashSet<SlotCode> {
        self.types_by_slot.keys().cloned().collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.types_by_slot.len()
    }

    /// 存放了其他件类型的库位
    pub fn type_conflicts(&self, piece_type: &str) -> HashSet<SlotCode> {
        self.types_by_slot
            .iter()
            .filter(|(_, types)| types.iter().any(|t| t != piece_type))
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// 阻塞集合 = 已占用 ∪ 类型冲突 ∪ 调用方额外阻塞
    pub fn blocked_for(&self, piece_type: &str, extra_blocked: &HashSet<SlotCode>) -> HashSet<SlotCode> {
        let mut blocked = self.occupied();
        blocked.extend(self.type_conflicts(piece_type));
        blocked.extend(extra_blocked.iter().cloned());
        blocked
    }

    pub fn units_in(&self, code: &SlotCode) -> i64 {
        self.units_by_slot.get(code).copied().unwrap_or(0)
    }

    /// 每个已占用库位的件数,按库位编码排序
    pub fn piece_counts(&self) -> Vec<(SlotCode, i64)> {
        let mut counts: Vec<_> = self
            .units_by_slot
            .iter()
            .map(|(code, units)| (code.clone(), *units))
            .collect();
        counts.sort_by(|a, b| a.0.cmp(&b.0));
        counts
    }
}
