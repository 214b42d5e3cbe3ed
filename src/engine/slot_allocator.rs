// ==========================================
// PU 切割仓储系统 - 库位分配引擎
// ==========================================
// 职责: 按固定填充顺序为物理件挑选下一个空闲库位
// 输入: 件类型 + 调用方额外阻塞集合
// 输出: Some(库位) / None（库位耗尽,属正常结果）
// 红线: 占用状态每次调用重新读取,不缓存;
//       停用库位、已占用库位、存放其他件类型的库位一律不返回
// ==========================================

use crate::domain::slot::{RackLayout, Slot, SlotCode};
use crate::engine::fill_order::fill_order;
use crate::engine::occupancy::OccupancyIndex;
use crate::engine::providers::{OccupancyReader, SlotCatalogProvider};
use crate::repository::error::RepositoryResult;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// SlotAllocator - 库位分配器
// ==========================================
// 无内部可变状态,可在多个请求间共享
pub struct SlotAllocator<C, O>
where
    C: SlotCatalogProvider,
    O: OccupancyReader,
{
    catalog: Arc<C>,
    occupancy: Arc<O>,
    layout: RackLayout,
}

impl<C, O> SlotAllocator<C, O>
where
    C: SlotCatalogProvider,
    O: OccupancyReader,
{
    pub fn new(catalog: Arc<C>, occupancy: Arc<O>, layout: RackLayout) -> Self {
        Self {
            catalog,
            occupancy,
            layout,
        }
    }

    pub fn layout(&self) -> &RackLayout {
        &self.layout
    }

    /// 当前占用索引（最新已提交状态）
    pub fn load_occupancy(&self) -> RepositoryResult<OccupancyIndex> {
        Ok(OccupancyIndex::from_occupants(self.occupancy.occupants()?))
    }

    /// 为一个物理件分配库位
    ///
    /// # 参数
    /// - piece_type: 件类型,决定类型冲突集合
    /// - extra_blocked: 本次请求中已选定但尚未提交的库位
    ///
    /// # 返回
    /// - Ok(Some(slot)): 填充顺序上第一个可用库位
    /// - Ok(None): 无可用库位
    #[instrument(skip(self, extra_blocked), fields(extra_blocked = extra_blocked.len()))]
    pub fn allocate(
        &self,
        piece_type: &str,
        extra_blocked: &HashSet<SlotCode>,
    ) -> RepositoryResult<Option<Slot>> {
        let catalog: HashMap<SlotCode, Slot> = self
            .catalog
            .active_slots()?
            .into_iter()
            .map(|slot| (slot.code.clone(), slot))
            .collect();

        let index = self.load_occupancy()?;
        let blocked = index.blocked_for(piece_type, extra_blocked);

        for (rack_name, code) in fill_order(&self.layout) {
            if blocked.contains(&code) {
                continue;
            }
            // 候选必须在目录中登记于同一货架
            let slot = match catalog.get(&code) {
                Some(slot) if slot.rack_name == rack_name && slot.active => slot,
                _ => continue,
            };
            // 二次确认,缩小与并发写入者之间的窗口
            if self.occupancy.is_slot_occupied(&code)? {
                debug!(slot = %code, "候选库位已被并发占用,跳过");
                continue;
            }

            info!(slot = %code, rack = %rack_name, piece_type, "分配库位");
            return Ok(Some(slot.clone()));
        }

        warn!(
            piece_type,
            active_slots = catalog.len(),
            occupied = index.occupied_count(),
            "无可用库位"
        );
        Ok(None)
    }

    /// 连续为多个件类型分配库位,已选库位累加进阻塞集合
    ///
    /// 返回值与输入一一对应;某件无库位时为 None,不影响后续件
    pub fn allocate_many(
        &self,
        piece_types: &[&str],
        extra_blocked: &HashSet<SlotCode>,
    ) -> RepositoryResult<Vec<Option<Slot>>> {
        let mut blocked = extra_blocked.clone();
        let mut result = Vec::with_capacity(piece_types.len());
        for piece_type in piece_types {
            let slot = self.allocate(piece_type, &blocked)?;
            if let Some(slot) = &slot {
                blocked.insert(slot.code.clone());
            }
            result.push(slot);
        }
        Ok(result)
    }

    /// 指定库位能否存放该件类型: 启用、未占用、无类型冲突
    pub fn check_slot(&self, code: &SlotCode, piece_type: &str) -> RepositoryResult<Option<Slot>> {
        let slot = match self.catalog.find_slot(code)? {
            Some(slot) if slot.active => slot,
            _ => return Ok(None),
        };
        let index = self.load_occupancy()?;
        if index.is_occupied(code) || index.type_conflicts(piece_type).contains(code) {
            return Ok(None);
        }
        Ok(Some(slot))
    }
}
