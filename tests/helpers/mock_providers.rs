// ==========================================
// 内存版数据提供者 - 用于引擎测试
// ==========================================
// 职责: 不依赖 SQLite,直接驱动 SlotAllocator / LayerExpander / LoteTracker
// ==========================================

use pu_stock::domain::{LayerSpec, LoteLink, LoteStatus, Slot, SlotCode, SlotOccupant};
use pu_stock::engine::{
    LayerSpecProvider, OccupancyReader, ProductionPlanProvider, SlotCatalogProvider, StockCounter,
};
use pu_stock::repository::RepositoryResult;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

pub fn code(raw: &str) -> SlotCode {
    raw.parse().unwrap()
}

// ==========================================
// 库位目录
// ==========================================
pub struct MockCatalog {
    slots: Mutex<Vec<Slot>>,
}

impl MockCatalog {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// 指定货架下的一组库位（全部启用）
    pub fn with_codes(rack_name: &str, codes: &[&str]) -> Self {
        Self::new(
            codes
                .iter()
                .map(|c| Slot::new(code(c), rack_name))
                .collect(),
        )
    }

    pub fn set_active(&self, raw: &str, active: bool) {
        let mut slots = self.slots.lock().unwrap();
        for slot in slots.iter_mut().filter(|s| s.code == code(raw)) {
            slot.active = active;
        }
    }
}

impl SlotCatalogProvider for MockCatalog {
    fn active_slots(&self) -> RepositoryResult<Vec<Slot>> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    fn find_slot(&self, code: &SlotCode) -> RepositoryResult<Option<Slot>> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.code == code)
            .cloned())
    }
}

// ==========================================
// 库位占用
// ==========================================
// taken_after_index: 聚合读取时看不到、二次确认时才出现的占用,
// 模拟两次读取之间被其他写入者提交
#[derive(Default)]
pub struct MockOccupancy {
    rows: Mutex<Vec<SlotOccupant>>,
    taken_after_index: Mutex<HashSet<SlotCode>>,
}

impl MockOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupy(&self, slot: &str, piece_type: &str, units: i64) {
        self.rows.lock().unwrap().push(SlotOccupant {
            slot_code: slot.to_string(),
            piece_type: piece_type.to_string(),
            units,
        });
    }

    pub fn take_concurrently(&self, slot: &str) {
        self.taken_after_index.lock().unwrap().insert(code(slot));
    }
}

impl OccupancyReader for MockOccupancy {
    fn occupants(&self) -> RepositoryResult<Vec<SlotOccupant>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn is_slot_occupied(&self, code: &SlotCode) -> RepositoryResult<bool> {
        let raw = code.to_string();
        let indexed = self.rows.lock().unwrap().iter().any(|r| r.slot_code == raw);
        Ok(indexed || self.taken_after_index.lock().unwrap().contains(code))
    }
}

// ==========================================
// 层别规格
// ==========================================
#[derive(Default)]
pub struct MockLayerSpecs {
    specs: Mutex<HashMap<(String, String), LayerSpec>>,
}

impl MockLayerSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, spec: LayerSpec) {
        self.specs
            .lock()
            .unwrap()
            .insert((spec.project.clone(), spec.piece_type.clone()), spec);
    }
}

impl LayerSpecProvider for MockLayerSpecs {
    fn find_layer_spec(&self, project: &str, piece_type: &str) -> RepositoryResult<Option<LayerSpec>> {
        Ok(self
            .specs
            .lock()
            .unwrap()
            .get(&(project.to_string(), piece_type.to_string()))
            .cloned())
    }
}

// ==========================================
// 生产计划
// ==========================================
// 每个 lote 只记录期望件数与一个状态;advance_* 只向前推进
#[derive(Default)]
pub struct MockPlan {
    expected: Mutex<HashMap<String, i64>>,
    status: Mutex<BTreeMap<String, LoteStatus>>,
    advance_writes: Mutex<usize>,
}

impl MockPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lote(self, id_lote: &str, expected: i64) -> Self {
        self.expected
            .lock()
            .unwrap()
            .insert(id_lote.to_string(), expected);
        self.status
            .lock()
            .unwrap()
            .insert(id_lote.to_string(), LoteStatus::Programado);
        self
    }

    pub fn status_of(&self, id_lote: &str) -> LoteStatus {
        self.status
            .lock()
            .unwrap()
            .get(id_lote)
            .copied()
            .unwrap_or(LoteStatus::NotStarted)
    }

    /// 实际发生状态变化的写入次数
    pub fn advance_writes(&self) -> usize {
        *self.advance_writes.lock().unwrap()
    }
}

impl ProductionPlanProvider for MockPlan {
    fn expected_unit_count(&self, id_lote: &str) -> RepositoryResult<i64> {
        Ok(self
            .expected
            .lock()
            .unwrap()
            .get(id_lote)
            .copied()
            .unwrap_or(0))
    }

    fn lote_status(&self, id_lote: &str) -> RepositoryResult<LoteStatus> {
        Ok(self.status_of(id_lote))
    }

    fn advance_lote_status(&self, id_lote: &str, to: LoteStatus) -> RepositoryResult<usize> {
        let mut status = self.status.lock().unwrap();
        let current = status
            .entry(id_lote.to_string())
            .or_insert(LoteStatus::NotStarted);
        if *current >= to {
            return Ok(0);
        }
        *current = to;
        *self.advance_writes.lock().unwrap() += 1;
        Ok(1)
    }

    fn advance_piece_status(
        &self,
        _order_id: &str,
        _piece_type: &str,
        _to: LoteStatus,
    ) -> RepositoryResult<usize> {
        Ok(0)
    }

    fn sweepable_lotes(&self) -> RepositoryResult<Vec<String>> {
        Ok(self
            .status
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| **s != LoteStatus::Cortado)
            .map(|(id, _)| id.clone())
            .collect())
    }
}

// ==========================================
// 在库计数
// ==========================================
#[derive(Default)]
pub struct MockStock {
    counts: Mutex<HashMap<String, i64>>,
}

impl MockStock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, lote_vd: &str, units: i64) {
        self.counts
            .lock()
            .unwrap()
            .insert(lote_vd.to_string(), units);
    }
}

impl StockCounter for MockStock {
    fn count_in_stock(&self, link: &LoteLink) -> RepositoryResult<i64> {
        let lote_vd = match link.lote_vd.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(0),
        };
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(lote_vd)
            .copied()
            .unwrap_or(0))
    }
}
