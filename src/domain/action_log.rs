// ==========================================
// PU 切割仓储系统 - 操作日志领域模型
// ==========================================
// 红线: 所有台账写入必须记录
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,        // 日志ID (UUID)
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Optimize,        // 优化并排入切割队列
    SendToStock,     // 入库
    StockExit,       // 单件出库
    MassExit,        // 批量出库
    DiscardQueued,   // 剔除已优化件
    ManualAdd,       // 人工录入
    ClearPending,    // 清空人工录入
    ReturnToStock,   // 退回入库
    SlotRegister,    // 新增库位
    SlotStatus,      // 库位启用/停用
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Optimize => "OTIMIZACAO",
            ActionType::SendToStock => "ENVIAR_ESTOQUE",
            ActionType::StockExit => "SAIDA_ESTOQUE",
            ActionType::MassExit => "SAIDA_MASSIVA",
            ActionType::DiscardQueued => "EXCLUSAO_OTIMIZADA",
            ActionType::ManualAdd => "ADICAO_MANUAL",
            ActionType::ClearPending => "TRUNCATE_MANUAIS",
            ActionType::ReturnToStock => "VOLTAR_PECA_ESTOQUE",
            ActionType::SlotRegister => "CADASTRO_LOCAL",
            ActionType::SlotStatus => "STATUS_LOCAL",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OTIMIZACAO" => Some(ActionType::Optimize),
            "ENVIAR_ESTOQUE" => Some(ActionType::SendToStock),
            "SAIDA_ESTOQUE" => Some(ActionType::StockExit),
            "SAIDA_MASSIVA" => Some(ActionType::MassExit),
            "EXCLUSAO_OTIMIZADA" => Some(ActionType::DiscardQueued),
            "ADICAO_MANUAL" => Some(ActionType::ManualAdd),
            "TRUNCATE_MANUAIS" => Some(ActionType::ClearPending),
            "VOLTAR_PECA_ESTOQUE" => Some(ActionType::ReturnToStock),
            "CADASTRO_LOCAL" => Some(ActionType::SlotRegister),
            "STATUS_LOCAL" => Some(ActionType::SlotStatus),
            _ => None,
        }
    }
}

impl ActionLog {
    /// 创建新的操作日志,action_id 自动生成
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> Option<ActionType> {
        ActionType::from_str(&self.action_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        for t in [
            ActionType::Optimize,
            ActionType::SendToStock,
            ActionType::StockExit,
            ActionType::MassExit,
            ActionType::DiscardQueued,
            ActionType::ManualAdd,
            ActionType::ClearPending,
            ActionType::ReturnToStock,
            ActionType::SlotRegister,
            ActionType::SlotStatus,
        ] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(ActionType::from_str("Import"), None);
    }

    #[test]
    fn test_new_log_with_payload() {
        let log = ActionLog::new(ActionType::SendToStock, "operador")
            .with_payload(&serde_json::json!({"ids": [1, 2]}))
            .with_detail("2 peças");
        assert_eq!(log.kind(), Some(ActionType::SendToStock));
        assert_eq!(log.action_id.len(), 36);
        assert_eq!(log.payload_json.unwrap()["ids"][1], 2);
    }
}
