use super::*;

impl StorageApi {
    // ==========================================
    // 库位管理 / 查询
    // ==========================================

    /// 登记新库位
    ///
    /// # 错误
    /// - InvalidInput: 编码无法解析,或列号不在该货架范围内
    /// - BusinessRuleViolation: 编码已存在
    pub fn add_slot(&self, code: &str, rack_name: &str, actor: &str) -> ApiResult<Slot> {
        let code: SlotCode = code
            .parse()
            .map_err(|e: String| ApiError::InvalidInput(e))?;
        let rack_name = required("货架", rack_name)?;

        match self.allocator.layout().rack_for_column(code.column()) {
            Some(rack) if rack.name == rack_name => {}
            Some(rack) => {
                return Err(ApiError::InvalidInput(format!(
                    "库位 {} 属于货架 {},不是 {}",
                    code, rack.name, rack_name
                )))
            }
            None => {
                return Err(ApiError::InvalidInput(format!(
                    "列 {} 不在任何货架范围内",
                    code.column()
                )))
            }
        }

        let slot = Slot::new(code, &rack_name);
        self.slot_repo.insert(&slot)?;

        self.record_action(
            ActionLog::new(ActionType::SlotRegister, actor)
                .with_payload(&slot)
                .with_detail(Self::message("slot.registered", &[("slot", &slot.code.to_string())])),
        );
        info!(slot = %slot.code, rack = %slot.rack_name, "库位已登记");
        Ok(slot)
    }

    /// 启用/停用库位（停用不影响已存放的件,只是不再分配）
    pub fn set_slot_active(&self, code: &str, active: bool, actor: &str) -> ApiResult<()> {
        let code: SlotCode = code
            .parse()
            .map_err(|e: String| ApiError::InvalidInput(e))?;

        if self.slot_repo.set_active(&code, active)? == 0 {
            return Err(ApiError::NotFound(format!("库位 {} 不存在", code)));
        }

        let key = if active { "slot.activated" } else { "slot.deactivated" };
        self.record_action(
            ActionLog::new(ActionType::SlotStatus, actor)
                .with_payload(&serde_json::json!({ "slot_code": code.to_string(), "active": active }))
                .with_detail(Self::message(key, &[("slot", &code.to_string())])),
        );
        Ok(())
    }

    /// 全部库位（含停用）
    pub fn list_slots(&self) -> ApiResult<Vec<Slot>> {
        Ok(self.slot_repo.list_all()?)
    }

    /// 启用库位总数 / 已占用 / 可用
    pub fn slot_availability(&self) -> ApiResult<SlotAvailability> {
        let total_active = self.slot_repo.count_active()?;
        let occupied = self.occupied_active_count()?;
        Ok(SlotAvailability {
            total_active,
            occupied,
            available: (total_active - occupied).max(0),
        })
    }

    /// 每个已占用库位的件数
    pub fn slot_piece_counts(&self) -> ApiResult<Vec<SlotPieceCount>> {
        let index = self.allocator.load_occupancy()?;
        Ok(index
            .piece_counts()
            .into_iter()
            .map(|(code, units)| SlotPieceCount {
                slot_code: code.to_string(),
                units,
            })
            .collect())
    }

    /// 库位中占位的物理件
    pub fn slot_details(&self, code: &str) -> ApiResult<Vec<PieceUnit>> {
        let code: SlotCode = code
            .parse()
            .map_err(|e: String| ApiError::InvalidInput(e))?;
        Ok(self.unit_repo.list_by_slot(&code)?)
    }
}
