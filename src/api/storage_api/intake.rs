use super::*;

impl StorageApi {
    // ==========================================
    // 排产采集 / 优化 / 人工录入
    // ==========================================

    /// 可排 lote 列表
    pub fn list_open_lotes(&self) -> ApiResult<Vec<LoteSummary>> {
        Ok(self.plan_repo.list_open_lotes()?)
    }

    /// 采集 lote 的待切件并建议库位
    ///
    /// # 说明
    /// - lote 标记为 PROGRAMANDO
    /// - 已在 PENDING/QUEUED/IN_STOCK 中的逻辑件跳过
    /// - 同一次采集内已选库位累加进阻塞集合
    /// - 末尾追加现有人工录入件（沿用其库位）
    ///
    /// # 错误
    /// - NoSlotAvailable: 全部启用库位已被占用
    #[instrument(skip(self))]
    pub fn plan_lote(&self, id_lote: &str) -> ApiResult<LotePlan> {
        let id_lote = required("id_lote", id_lote)?;

        let total_active = self.slot_repo.count_active()?;
        let occupied = self.occupied_active_count()?;
        if occupied >= total_active {
            warn!(total_active, occupied, "全部库位已占用,拒绝采集");
            return Err(ApiError::NoSlotAvailable(format!(
                "启用库位 {} 个,已占用 {} 个",
                total_active, occupied
            )));
        }

        self.tracker.mark_programando(&id_lote)?;

        let existing = self.unit_repo.active_piece_keys()?;
        let lote = self.tracker.link_for(&id_lote);
        let mut requests = Vec::new();
        for row in self.plan_repo.list_open_rows(&id_lote)? {
            let key = (row.order_id.clone(), row.piece_type.clone());
            if existing.contains(&key) {
                debug!(order_id = %row.order_id, piece_type = %row.piece_type, "逻辑件已在台账中,跳过");
                continue;
            }

            let mut request = PieceRequest::new(
                &row.order_id,
                &row.piece_type,
                &row.project,
                row.vehicle.as_deref().unwrap_or_default(),
            );
            if let Some(sensor) = row.sensor.as_deref() {
                request = request.with_sensor(sensor);
            }
            requests.push(request);
        }

        // 同一次采集内已选库位互相阻塞
        let piece_types: Vec<&str> = requests.iter().map(|r| r.piece_type.as_str()).collect();
        let slots = self.allocator.allocate_many(&piece_types, &HashSet::new())?;

        let mut pieces: Vec<PlannedPiece> = requests
            .into_iter()
            .zip(slots)
            .map(|(request, slot)| PlannedPiece {
                request,
                lote: lote.clone(),
                slot: slot.as_ref().map(SlotAssignment::from),
                source: PieceSource::Plan,
            })
            .collect();

        pieces.extend(self.pending_pieces()?);

        let unassigned = pieces.iter().filter(|p| p.slot.is_none()).count();
        info!(id_lote = %id_lote, pieces = pieces.len(), unassigned, "lote 采集完成");
        Ok(LotePlan {
            id_lote,
            pieces,
            unassigned,
        })
    }

    /// 现有人工录入件,每个逻辑件一条
    fn pending_pieces(&self) -> ApiResult<Vec<PlannedPiece>> {
        let mut seen = HashSet::new();
        let mut pieces = Vec::new();
        // 列表新的在前,人工录入按录入顺序追加
        for unit in self
            .unit_repo
            .list_by_membership(Membership::Pending)?
            .into_iter()
            .rev()
        {
            if !seen.insert((unit.order_id.clone(), unit.piece_type.clone())) {
                continue;
            }
            let slot = match (unit.slot_code.as_deref(), unit.rack_name.as_deref()) {
                (Some(code), Some(rack)) => code.parse::<SlotCode>().ok().map(|code| SlotAssignment {
                    code,
                    rack_name: rack.to_string(),
                }),
                _ => None,
            };
            let mut request = PieceRequest::new(
                &unit.order_id,
                &unit.piece_type,
                &unit.project,
                &unit.vehicle,
            );
            request.parent_order_id = unit.parent_order_id.clone();
            request.sensor = unit.sensor.clone();

            pieces.push(PlannedPiece {
                request,
                lote: unit.lote.clone(),
                slot,
                source: PieceSource::Manual,
            });
        }
        Ok(pieces)
    }

    /// 已占用的启用库位数
    pub(super) fn occupied_active_count(&self) -> ApiResult<i64> {
        let index = self.allocator.load_occupancy()?;
        let occupied = self
            .slot_repo
            .list_active()?
            .iter()
            .filter(|slot| index.is_occupied(&slot.code))
            .count();
        Ok(occupied as i64)
    }

    /// 优化: 展开层别并排入切割队列
    ///
    /// # 说明
    /// - 同一事务内清空 PENDING 后提交到 QUEUED
    /// - 成功后对应计划行推进到 PROGRAMADO
    ///
    /// # 错误
    /// - InvalidInput: 有件无库位,或两件选了同一库位
    /// - SlotConflict: 库位已被并发请求占用,需重新采集
    #[instrument(skip(self, pieces), fields(pieces = pieces.len()))]
    pub fn optimize(&self, pieces: &[PlannedPiece], actor: &str) -> ApiResult<OptimizeReport> {
        if pieces.is_empty() {
            return Err(ApiError::InvalidInput("未选择任何件".to_string()));
        }

        let missing: Vec<String> = pieces
            .iter()
            .filter(|p| p.slot.is_none())
            .map(|p| format!("{}/{}", p.request.order_id, p.request.piece_type))
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "以下件没有库位: {}",
                missing.join(", ")
            )));
        }

        let mut seen_slots = HashSet::new();
        let mut drafts = Vec::new();
        let mut artifacts = Vec::new();
        for piece in pieces {
            let slot = match &piece.slot {
                Some(slot) => slot,
                None => continue,
            };
            if !seen_slots.insert(slot.code.clone()) {
                return Err(ApiError::InvalidInput(format!("库位 {} 被重复选择", slot.code)));
            }

            let piece_drafts = self.expand_drafts(&piece.request, slot, &piece.lote)?;
            artifacts.extend(piece_drafts.iter().filter_map(|d| {
                d.spec
                    .artifact_name(&d.request.order_id, &d.request.piece_type, &d.request.project)
            }));
            drafts.extend(piece_drafts);
        }

        let outcome = self.commit_units(&drafts, Membership::Queued, true, actor)?;
        let queued_units = Self::ensure_committed(outcome)?;

        for piece in pieces {
            self.tracker
                .mark_programado(&piece.request.order_id, &piece.request.piece_type)?;
        }

        self.record_action(
            ActionLog::new(ActionType::Optimize, actor)
                .with_payload(&serde_json::json!({
                    "pieces": pieces,
                    "queued_units": queued_units,
                    "config": self.config_snapshot(),
                }))
                .with_detail(format!("{} 件 / {} 物理件", pieces.len(), queued_units)),
        );

        info!(pieces = pieces.len(), queued_units, "优化完成");
        Ok(OptimizeReport {
            pieces: pieces.len(),
            queued_units,
            artifacts,
            message: Self::message("storage.optimized", &[("count", &pieces.len().to_string())]),
        })
    }

    /// 人工录入一个逻辑件（PENDING,一个物理件）
    ///
    /// # 错误
    /// - InvalidInput: 字段缺失,或该件类型要求传感器
    /// - BusinessRuleViolation: 逻辑件已在台账中
    /// - NoSlotAvailable: 无可用库位
    /// - SlotConflict: 分配后库位被并发占用
    #[instrument(skip(self, request), fields(order_id = %request.order_id, piece_type = %request.piece_type))]
    pub fn add_manual_piece(
        &self,
        request: &ManualPieceRequest,
        actor: &str,
    ) -> ApiResult<PlacementReport> {
        let order_id = required("工单号", &request.order_id)?;
        let piece_type = required("件类型", &request.piece_type)?.to_uppercase();
        let project = required("项目", &request.project)?;
        let vehicle = required("车型", &request.vehicle)?;
        let sensor = request
            .sensor
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let sensor_types = self
            .config_manager
            .get_sensor_required_piece_types()
            .map_err(config_error)?;
        if sensor.is_none() && sensor_types.iter().any(|t| *t == piece_type) {
            return Err(ApiError::InvalidInput(format!(
                "件类型 {} 必须填写传感器",
                piece_type
            )));
        }

        if let Some(existing) = self.unit_repo.find_active_by_piece(&order_id, &piece_type)? {
            return Err(ApiError::BusinessRuleViolation(format!(
                "{}/{} 已存在于 {}（库位 {}）",
                order_id,
                piece_type,
                existing.membership,
                existing.slot_code.unwrap_or_default()
            )));
        }

        let mut piece = PieceRequest::new(&order_id, &piece_type, &project, &vehicle);
        if let Some(parent) = request
            .parent_order_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            piece.parent_order_id = parent.to_string();
        }
        if let Some(sensor) = sensor {
            piece = piece.with_sensor(sensor);
        }

        let slot = self
            .allocator
            .allocate(&piece_type, &HashSet::new())?
            .ok_or_else(|| ApiError::NoSlotAvailable(piece_type.clone()))?;
        let slot = SlotAssignment::from(&slot);

        let lote = match self.plan_repo.find_lote_for_piece(&order_id, &piece_type)? {
            Some(id_lote) => self.tracker.link_for(&id_lote),
            None => LoteLink::none(),
        };

        let draft = UnitDraft {
            request: piece.clone(),
            slot: slot.clone(),
            spec: PhysicalUnitSpec::untagged(&piece_type),
            lote: lote.clone(),
        };
        let outcome = self.commit_units(&[draft], Membership::Pending, false, actor)?;
        let units = Self::ensure_committed(outcome)?;

        self.record_action(
            ActionLog::new(ActionType::ManualAdd, actor)
                .with_payload(&serde_json::json!({
                    "request": piece,
                    "slot": slot.code.to_string(),
                    "lote": lote,
                }))
                .with_detail(format!("{}/{} → {}", order_id, piece_type, slot.code)),
        );

        let slot_text = slot.code.to_string();
        Ok(PlacementReport {
            message: Self::message(
                "storage.manual_added",
                &[("piece", &piece_type), ("slot", &slot_text)],
            ),
            order_id,
            piece_type,
            slot,
            units,
            lote,
            lote_completed: false,
        })
    }

    /// 清空全部人工录入
    pub fn clear_pending(&self, actor: &str) -> ApiResult<usize> {
        let removed = self.unit_repo.delete_pending()?;
        self.record_action(
            ActionLog::new(ActionType::ClearPending, actor)
                .with_payload(&serde_json::json!({ "removed": removed }))
                .with_detail(Self::message(
                    "storage.pending_cleared",
                    &[("count", &removed.to_string())],
                )),
        );
        info!(removed, "人工录入已清空");
        Ok(removed)
    }
}
