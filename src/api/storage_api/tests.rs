use super::*;
use crate::config::config_keys;
use crate::domain::lote::PlanRow;
use crate::domain::slot::{RackLayout, RackRange};
use rusqlite::Connection;
use std::sync::Mutex;

fn setup(columns: u32) -> (StorageApi, Arc<ProductionPlanRepository>) {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::init_schema(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));

    let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
    let layout = RackLayout::new(vec![RackRange::new("RACK1", 1, columns)]).unwrap();
    config_manager
        .set_global_config_value(
            config_keys::RACK_LAYOUT,
            &serde_json::to_string(&layout).unwrap(),
        )
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::COMMIT_CHUNK_SIZE, "2")
        .unwrap();

    let slot_repo = Arc::new(SlotRepository::from_connection(conn.clone()));
    slot_repo.seed_layout(&layout).unwrap();
    let plan_repo = Arc::new(ProductionPlanRepository::from_connection(conn.clone()));

    let api = StorageApi::new(
        slot_repo,
        Arc::new(PieceUnitRepository::from_connection(conn.clone())),
        Arc::new(LayerSpecRepository::from_connection(conn.clone())),
        plan_repo.clone(),
        Arc::new(ActionLogRepository::new(conn.clone())),
        config_manager,
    )
    .unwrap();
    (api, plan_repo)
}

#[test]
fn test_id_helpers() {
    assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    assert!(matches!(validate_ids(&[]), Err(ApiError::InvalidInput(_))));
    assert_eq!(validate_ids(&[5, 5]).unwrap(), vec![5]);
}

#[test]
fn test_required_trims() {
    assert_eq!(required("工单号", "  1001 ").unwrap(), "1001");
    match required("工单号", "   ") {
        Err(ApiError::InvalidInput(msg)) => assert!(msg.contains("工单号")),
        other => panic!("Expected InvalidInput, got {:?}", other),
    }
}

#[test]
fn test_exit_reason_for_mass_flag() {
    assert_eq!(exit_reason_for(true), ExitReason::MassExit);
    assert_eq!(exit_reason_for(false), ExitReason::StockExit);
}

#[test]
fn test_send_to_stock_in_chunks() {
    let (api, plan_repo) = setup(1);
    for order in ["1", "2", "3", "4", "5"] {
        plan_repo
            .insert(&PlanRow::new("VD42", order, "TSP", "P1"))
            .unwrap();
    }

    let plan = api.plan_lote("VD42").unwrap();
    assert_eq!(plan.pieces.len(), 5);
    api.optimize(&plan.pieces, "t").unwrap();

    let ids: Vec<i64> = api
        .list_units(Membership::Queued)
        .unwrap()
        .iter()
        .map(|u| u.unit_id)
        .collect();
    // 5 个 id 分 3 批提交,结果与一次提交一致
    let report = api.send_to_stock(&ids, "t").unwrap();
    assert_eq!(report.moved, 5);
    assert_eq!(report.completed_lotes, vec!["VD42".to_string()]);
}

#[test]
fn test_plan_unknown_lote_is_empty() {
    let (api, _) = setup(1);
    let plan = api.plan_lote("NOPE").unwrap();
    assert!(plan.pieces.is_empty());
    assert_eq!(plan.unassigned, 0);
    assert!(matches!(api.plan_lote(" "), Err(ApiError::InvalidInput(_))));
    assert!(matches!(api.optimize(&[], "t"), Err(ApiError::InvalidInput(_))));
}

#[test]
fn test_optimize_rejects_duplicate_slot() {
    let (api, plan_repo) = setup(1);
    plan_repo.insert(&PlanRow::new("VD1", "1", "TSP", "P1")).unwrap();
    plan_repo.insert(&PlanRow::new("VD1", "2", "TSP", "P1")).unwrap();

    let mut plan = api.plan_lote("VD1").unwrap();
    plan.pieces[1].slot = plan.pieces[0].slot.clone();
    match api.optimize(&plan.pieces, "t") {
        Err(ApiError::InvalidInput(msg)) => assert!(msg.contains("E1")),
        other => panic!("Expected InvalidInput, got {:?}", other.map(|r| r.pieces)),
    }
    assert!(api.list_units(Membership::Queued).unwrap().is_empty());
}

#[test]
fn test_expand_layers_rejects_blank_code() {
    let (api, _) = setup(1);
    assert!(matches!(api.expand_layers("P1", "  "), Err(ApiError::InvalidInput(_))));
    assert_eq!(api.expand_layers("P1", "TSP").unwrap().len(), 1);
}
