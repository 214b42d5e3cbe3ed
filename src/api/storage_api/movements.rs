use super::*;

impl StorageApi {
    // ==========================================
    // 入库 / 出库 / 剔除 / 回库
    // ==========================================

    /// QUEUED → IN_STOCK,按 commit_chunk_size 分批;每批提交后立即刷新涉及的 lote
    ///
    /// 重复请求中已入库的 id 被跳过,不会重复入库,但其 lote 仍会被复查
    /// （前一次请求可能在后续批次失败前已提交部分批次）
    #[instrument(skip(self, unit_ids), fields(requested = unit_ids.len()))]
    pub fn send_to_stock(&self, unit_ids: &[i64], actor: &str) -> ApiResult<MoveReport> {
        let ids = validate_ids(unit_ids)?;
        let chunk_size = self
            .config_manager
            .get_commit_chunk_size()
            .map_err(config_error)?;

        let mut moved = Vec::new();
        let mut completed = BTreeSet::new();
        for chunk in ids.chunks(chunk_size.max(1)) {
            let units = self
                .unit_repo
                .move_units(chunk, Membership::Queued, Membership::InStock, None)?;
            debug!(chunk = chunk.len(), moved = units.len(), "入库批次完成");
            completed.extend(self.refresh_touched_lotes(&units)?);
            moved.extend(units);
        }

        let moved_ids: HashSet<i64> = moved.iter().map(|u| u.unit_id).collect();
        let skipped: Vec<i64> = ids.iter().copied().filter(|id| !moved_ids.contains(id)).collect();
        let already_in_stock = self.unit_repo.list_by_ids(&skipped, Membership::InStock)?;
        if !already_in_stock.is_empty() {
            debug!(count = already_in_stock.len(), "复查已入库件所属 lote");
            completed.extend(self.refresh_touched_lotes(&already_in_stock)?);
        }
        let completed_lotes: Vec<String> = completed.into_iter().collect();

        self.record_action(
            ActionLog::new(ActionType::SendToStock, actor)
                .with_payload(&serde_json::json!({
                    "unit_ids": ids,
                    "moved": moved.iter().map(|u| u.unit_id).collect::<Vec<_>>(),
                    "completed_lotes": completed_lotes,
                }))
                .with_detail(format!("{}/{} 件入库", moved.len(), ids.len())),
        );

        Ok(self.move_report("storage.sent_to_stock", ids.len(), moved.len(), completed_lotes))
    }

    /// IN_STOCK → EXITED
    ///
    /// # 参数
    /// - mass: 批量出库（原因记为 SAÍDA MASSIVA）
    pub fn remove_from_stock(
        &self,
        unit_ids: &[i64],
        mass: bool,
        actor: &str,
    ) -> ApiResult<MoveReport> {
        let ids = validate_ids(unit_ids)?;
        let reason = exit_reason_for(mass);
        let moved = self.unit_repo.move_units(
            &ids,
            Membership::InStock,
            Membership::Exited,
            Some(&reason.to_db_string()),
        )?;

        let action_type = if mass {
            ActionType::MassExit
        } else {
            ActionType::StockExit
        };
        self.record_action(
            ActionLog::new(action_type, actor)
                .with_payload(&serde_json::json!({
                    "unit_ids": ids,
                    "moved": moved.iter().map(|u| u.unit_id).collect::<Vec<_>>(),
                    "reason": reason.to_db_string(),
                }))
                .with_detail(reason.to_db_string()),
        );

        Ok(self.move_report("storage.removed_from_stock", ids.len(), moved.len(), Vec::new()))
    }

    /// QUEUED → EXITED（剔除已优化件,必须填写原因）
    pub fn discard_queued(&self, unit_ids: &[i64], motivo: &str, actor: &str) -> ApiResult<MoveReport> {
        let motivo = required("剔除原因", motivo)?;
        let ids = validate_ids(unit_ids)?;
        let reason = ExitReason::Exclusion(motivo.clone());
        let moved = self.unit_repo.move_units(
            &ids,
            Membership::Queued,
            Membership::Exited,
            Some(&reason.to_db_string()),
        )?;

        self.record_action(
            ActionLog::new(ActionType::DiscardQueued, actor)
                .with_payload(&serde_json::json!({
                    "unit_ids": ids,
                    "moved": moved.iter().map(|u| u.unit_id).collect::<Vec<_>>(),
                    "motivo": motivo,
                }))
                .with_detail(reason.to_db_string()),
        );

        Ok(self.move_report("storage.discarded", ids.len(), moved.len(), Vec::new()))
    }

    fn move_report(
        &self,
        key: &str,
        requested: usize,
        moved: usize,
        completed_lotes: Vec<String>,
    ) -> MoveReport {
        MoveReport {
            requested,
            moved,
            skipped: requested - moved,
            completed_lotes,
            message: Self::message(key, &[("count", &moved.to_string())]),
        }
    }

    /// 逻辑件当前位置（在库 > 已优化 > 人工录入）
    pub fn find_piece(&self, order_id: &str, piece_type: &str) -> ApiResult<Option<PieceUnit>> {
        let order_id = required("工单号", order_id)?;
        let piece_type = required("件类型", piece_type)?;
        Ok(self.unit_repo.find_active_by_piece(&order_id, &piece_type)?)
    }

    /// 回库库位建议: 上次出库库位可用则沿用,否则重新分配
    pub fn suggest_return_slot(&self, order_id: &str, piece_type: &str) -> ApiResult<Option<Slot>> {
        let order_id = required("工单号", order_id)?;
        let piece_type = required("件类型", piece_type)?;

        if let Some(previous) = self.unit_repo.latest_exited(&order_id, &piece_type)? {
            if let Some(code) = previous
                .slot_code
                .as_deref()
                .and_then(|c| c.parse::<SlotCode>().ok())
            {
                if let Some(slot) = self.allocator.check_slot(&code, &piece_type)? {
                    debug!(slot = %code, "沿用上次出库库位");
                    return Ok(Some(slot));
                }
            }
        }

        Ok(self.allocator.allocate(&piece_type, &HashSet::new())?)
    }

    /// 已出库件回库（展开层别后直接进入 IN_STOCK）
    ///
    /// # 错误
    /// - InvalidInput: 项目/车型缺失且无出库历史可补全
    /// - BusinessRuleViolation: 逻辑件仍在台账占位集合中
    /// - NoSlotAvailable / SlotConflict
    #[instrument(skip(self, request), fields(order_id = %request.order_id, piece_type = %request.piece_type))]
    pub fn return_to_stock(&self, request: &ReturnRequest, actor: &str) -> ApiResult<PlacementReport> {
        let order_id = required("工单号", &request.order_id)?;
        let piece_type = required("件类型", &request.piece_type)?;

        if let Some(existing) = self.unit_repo.find_active_by_piece(&order_id, &piece_type)? {
            return Err(ApiError::BusinessRuleViolation(format!(
                "{}/{} 仍在 {} 中,不能回库",
                order_id, piece_type, existing.membership
            )));
        }

        let history = self.unit_repo.latest_exited(&order_id, &piece_type)?;
        let pick = |given: &Option<String>, from_history: Option<&str>| -> Option<String> {
            given
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .or(from_history)
                .map(str::to_string)
        };
        let project = pick(&request.project, history.as_ref().map(|h| h.project.as_str()))
            .ok_or_else(|| ApiError::InvalidInput("项目不能为空".to_string()))?;
        let vehicle = pick(&request.vehicle, history.as_ref().map(|h| h.vehicle.as_str()))
            .ok_or_else(|| ApiError::InvalidInput("车型不能为空".to_string()))?;

        let slot = self
            .suggest_return_slot(&order_id, &piece_type)?
            .ok_or_else(|| ApiError::NoSlotAvailable(piece_type.clone()))?;
        let slot = SlotAssignment::from(&slot);

        let lote = match history.as_ref().filter(|h| h.lote.is_linked()) {
            Some(h) => h.lote.clone(),
            None => match self.plan_repo.find_lote_for_piece(&order_id, &piece_type)? {
                Some(id_lote) => self.tracker.link_for(&id_lote),
                None => LoteLink::none(),
            },
        };

        let mut piece = PieceRequest::new(&order_id, &piece_type, &project, &vehicle);
        if let Some(h) = &history {
            piece.parent_order_id = h.parent_order_id.clone();
            piece.sensor = h.sensor.clone();
        }

        let drafts = self.expand_drafts(&piece, &slot, &lote)?;
        let outcome = self.commit_units(&drafts, Membership::InStock, false, actor)?;
        let units = Self::ensure_committed(outcome)?;

        let lote_completed = match lote.lote_vd.as_deref() {
            Some(id_lote) => self.tracker.refresh(id_lote)?,
            None => false,
        };

        self.record_action(
            ActionLog::new(ActionType::ReturnToStock, actor)
                .with_payload(&serde_json::json!({
                    "request": piece,
                    "slot": slot.code.to_string(),
                    "units": units,
                    "lote": lote,
                }))
                .with_detail(format!("{}/{} → {}", order_id, piece_type, slot.code)),
        );

        let slot_text = slot.code.to_string();
        info!(slot = %slot_text, units, lote_completed, "回库完成");
        Ok(PlacementReport {
            message: Self::message("storage.returned", &[("piece", &piece_type), ("slot", &slot_text)]),
            order_id,
            piece_type,
            slot,
            units,
            lote,
            lote_completed,
        })
    }

    // ==========================================
    // 查询 / 复查
    // ==========================================

    /// 按集合列出物理件,新的在前
    pub fn list_units(&self, membership: Membership) -> ApiResult<Vec<PieceUnit>> {
        Ok(self.unit_repo.list_by_membership(membership)?)
    }

    /// 复查全部未完成 lote（幂等）
    pub fn sweep_lote_statuses(&self) -> ApiResult<Vec<String>> {
        Ok(self.tracker.sweep()?)
    }
}
