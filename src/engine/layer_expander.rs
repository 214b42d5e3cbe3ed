// ==========================================
// PU 切割仓储系统 - 层别展开引擎
// ==========================================
// 职责: 一个逻辑件 (project, piece_code) → N 个物理件规格
// 规则:
// - special_pieces 非空时,按替代编码逐个展开,忽略原编码层别
// - 否则按 L1, L3, L3_B 顺序展开;格式异常的字段按 1 件
// - 无任何层别时输出 1 个无层别件
// 红线: 不丢件;规格异常就地兜底,不向上抛错
// ==========================================

use crate::domain::layer::{PhysicalUnitSpec, MAX_LAYER_UNITS};
use crate::domain::types::LayerKind;
use crate::engine::providers::LayerSpecProvider;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct LayerExpander<L>
where
    L: LayerSpecProvider,
{
    specs: Arc<L>,
}

impl<L> LayerExpander<L>
where
    L: LayerSpecProvider,
{
    pub fn new(specs: Arc<L>) -> Self {
        Self { specs }
    }

    /// 展开逻辑件
    ///
    /// artifact_seq 在整个展开结果内按 (part_code, 存储层别) 从 1 递增
    #[instrument(skip(self))]
    pub fn expand(&self, project: &str, piece_code: &str) -> RepositoryResult<Vec<PhysicalUnitSpec>> {
        let mut chain = Vec::new();
        let mut raw = Vec::new();
        self.expand_into(project, piece_code.trim(), &mut chain, &mut raw)?;

        let mut counters: HashMap<(String, Option<&'static str>), u32> = HashMap::new();
        let units: Vec<PhysicalUnitSpec> = raw
            .into_iter()
            .map(|(part_code, layer)| {
                let seq = counters
                    .entry((part_code.clone(), layer.map(|l| l.stored_tag())))
                    .or_insert(0);
                *seq += 1;
                PhysicalUnitSpec {
                    part_code,
                    layer,
                    artifact_seq: *seq,
                }
            })
            .collect();

        debug!(units = units.len(), "层别展开完成");
        Ok(units)
    }

    fn expand_into(
        &self,
        project: &str,
        code: &str,
        chain: &mut Vec<String>,
        out: &mut Vec<(String, Option<LayerKind>)>,
    ) -> RepositoryResult<()> {
        let spec = self.specs.find_layer_spec(project, code)?;

        if let Some(spec) = &spec {
            let alternates = spec.special_piece_codes();
            // 已在展开链上的编码不再走替代,防止循环
            if !alternates.is_empty() && !chain.iter().any(|c| c == code) {
                debug!(code, ?alternates, "按替代件展开");
                chain.push(code.to_string());
                for alternate in &alternates {
                    self.expand_into(project, alternate, chain, out)?;
                }
                chain.pop();
                return Ok(());
            }
        }

        let before = out.len();
        if let Some(spec) = &spec {
            for (kind, count) in spec.layer_counts() {
                if count.is_capped() {
                    warn!(
                        code,
                        layer = ?kind,
                        ?count,
                        max = MAX_LAYER_UNITS,
                        "层别数量超出上限,按上限展开"
                    );
                }
                for _ in 0..count.units() {
                    out.push((code.to_string(), Some(kind)));
                }
            }
        }

        if out.len() == before {
            debug!(code, has_spec = spec.is_some(), "无层别,输出单个无层别件");
            out.push((code.to_string(), None));
        }
        Ok(())
    }
}
