// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use pu_stock::domain::{
    LayerKind, LoteLink, PhysicalUnitSpec, PieceRequest, SlotAssignment, UnitDraft,
};

// ==========================================
// UnitDraft 构建器
// ==========================================
pub struct DraftBuilder {
    request: PieceRequest,
    slot: String,
    rack_name: String,
    layer: Option<LayerKind>,
    lote: LoteLink,
}

impl DraftBuilder {
    pub fn new(order_id: &str, piece_type: &str) -> Self {
        Self {
            request: PieceRequest::new(order_id, piece_type, "P10", "V1"),
            slot: "E1".to_string(),
            rack_name: "RACK1".to_string(),
            layer: None,
            lote: LoteLink::none(),
        }
    }

    pub fn slot(mut self, slot: &str) -> Self {
        self.slot = slot.to_string();
        self
    }

    pub fn rack(mut self, rack_name: &str) -> Self {
        self.rack_name = rack_name.to_string();
        self
    }

    pub fn layer(mut self, layer: LayerKind) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn lote(mut self, lote_vd: &str) -> Self {
        self.lote = LoteLink::from_lote_vd(lote_vd, "PU");
        self
    }

    pub fn build(self) -> UnitDraft {
        let mut spec = PhysicalUnitSpec::untagged(&self.request.piece_type);
        spec.layer = self.layer;
        UnitDraft {
            slot: SlotAssignment {
                code: self.slot.parse().unwrap(),
                rack_name: self.rack_name,
            },
            spec,
            lote: self.lote,
            request: self.request,
        }
    }
}
