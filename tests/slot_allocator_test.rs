// ==========================================
// 库位分配引擎测试
// ==========================================
// 职责: 填充顺序、占用阻塞、停用库位、并发占用二次确认
// ==========================================

mod helpers;

use helpers::mock_providers::{code, MockCatalog, MockOccupancy};
use pu_stock::domain::{RackLayout, RackRange, Slot};
use pu_stock::engine::{rack_fill_order, SlotAllocator};
use std::collections::HashSet;
use std::sync::Arc;

fn allocator(
    catalog: MockCatalog,
    occupancy: MockOccupancy,
    layout: RackLayout,
) -> (
    SlotAllocator<MockCatalog, MockOccupancy>,
    Arc<MockCatalog>,
    Arc<MockOccupancy>,
) {
    let catalog = Arc::new(catalog);
    let occupancy = Arc::new(occupancy);
    (
        SlotAllocator::new(catalog.clone(), occupancy.clone(), layout),
        catalog,
        occupancy,
    )
}

fn slot_code(slot: Option<Slot>) -> Option<String> {
    slot.map(|s| s.code.to_string())
}

#[test]
fn test_two_slot_catalog_exhausts_to_none() {
    let (alloc, _, _) = allocator(
        MockCatalog::with_codes("RACK1", &["E1", "F1"]),
        MockOccupancy::new(),
        RackLayout::default(),
    );

    let mut blocked = HashSet::new();
    assert_eq!(slot_code(alloc.allocate("TSP", &blocked).unwrap()), Some("E1".to_string()));

    blocked.insert(code("E1"));
    assert_eq!(slot_code(alloc.allocate("TSP", &blocked).unwrap()), Some("F1".to_string()));

    blocked.insert(code("F1"));
    assert_eq!(alloc.allocate("TSP", &blocked).unwrap(), None);
}

#[test]
fn test_front_face_filled_before_back_face() {
    let rack = RackRange::new("RACK1", 1, 2);
    let slots = rack_fill_order(&rack)
        .into_iter()
        .map(|c| Slot::new(c, "RACK1"))
        .collect();
    let layout = RackLayout::new(vec![rack]).unwrap();
    let (alloc, _, _) = allocator(MockCatalog::new(slots), MockOccupancy::new(), layout);

    let types = vec!["TSP"; 26];
    let result: Vec<String> = alloc
        .allocate_many(&types, &HashSet::new())
        .unwrap()
        .into_iter()
        .map(|s| s.unwrap().code.to_string())
        .collect();

    assert_eq!(result[0], "E1");
    assert_eq!(result[8], "M1");
    assert_eq!(result[9], "E2");
    assert_eq!(result[18], "D1");
    assert_eq!(result[25], "A2");
    assert!(result[..18].iter().all(|c| c.as_bytes()[0] >= b'E'));
    assert!(result[18..].iter().all(|c| c.as_bytes()[0] <= b'D'));

    let unique: HashSet<&String> = result.iter().collect();
    assert_eq!(unique.len(), 26);

    // 全部已选后耗尽
    let blocked = result.iter().map(|c| code(c)).collect();
    assert_eq!(alloc.allocate("TSP", &blocked).unwrap(), None);
}

#[test]
fn test_occupied_slot_never_returned_regardless_of_type() {
    let occupancy = MockOccupancy::new();
    occupancy.occupy("E1", "PBS", 1);
    let (alloc, _, _) = allocator(
        MockCatalog::with_codes("RACK1", &["E1", "F1", "G1"]),
        occupancy,
        RackLayout::default(),
    );

    assert_eq!(slot_code(alloc.allocate("TSP", &HashSet::new()).unwrap()), Some("F1".to_string()));
    assert_eq!(slot_code(alloc.allocate("PBS", &HashSet::new()).unwrap()), Some("F1".to_string()));

    // 类型冲突的库位也不能通过指定库位检查
    assert!(alloc.check_slot(&code("E1"), "TSP").unwrap().is_none());
    assert!(alloc.check_slot(&code("F1"), "TSP").unwrap().is_some());
}

#[test]
fn test_inactive_slot_is_skipped() {
    let catalog = MockCatalog::with_codes("RACK1", &["E1", "F1"]);
    catalog.set_active("E1", false);
    let (alloc, catalog, _) = allocator(catalog, MockOccupancy::new(), RackLayout::default());

    assert_eq!(slot_code(alloc.allocate("TSP", &HashSet::new()).unwrap()), Some("F1".to_string()));
    assert!(alloc.check_slot(&code("E1"), "TSP").unwrap().is_none());

    catalog.set_active("E1", true);
    assert_eq!(slot_code(alloc.allocate("TSP", &HashSet::new()).unwrap()), Some("E1".to_string()));
}

#[test]
fn test_slot_registered_under_other_rack_is_skipped() {
    // E1 在列范围上属于 RACK1,目录登记在 RACK2 时不分配
    let catalog = MockCatalog::new(vec![
        Slot::new(code("E1"), "RACK2"),
        Slot::new(code("F1"), "RACK1"),
    ]);
    let (alloc, _, _) = allocator(catalog, MockOccupancy::new(), RackLayout::default());

    assert_eq!(slot_code(alloc.allocate("TSP", &HashSet::new()).unwrap()), Some("F1".to_string()));
}

#[test]
fn test_concurrently_taken_candidate_is_rechecked() {
    let occupancy = MockOccupancy::new();
    occupancy.take_concurrently("E1");
    let (alloc, _, _) = allocator(
        MockCatalog::with_codes("RACK1", &["E1", "F1"]),
        occupancy,
        RackLayout::default(),
    );

    assert_eq!(slot_code(alloc.allocate("TSP", &HashSet::new()).unwrap()), Some("F1".to_string()));
}

#[test]
fn test_empty_catalog_returns_none() {
    let (alloc, _, _) = allocator(
        MockCatalog::new(Vec::new()),
        MockOccupancy::new(),
        RackLayout::default(),
    );
    assert_eq!(alloc.allocate("TSP", &HashSet::new()).unwrap(), None);
    assert_eq!(alloc.load_occupancy().unwrap().occupied_count(), 0);
}
