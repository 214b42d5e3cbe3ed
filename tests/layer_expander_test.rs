// ==========================================
// 层别展开引擎测试
// ==========================================

mod helpers;

use helpers::mock_providers::MockLayerSpecs;
use pu_stock::domain::{LayerKind, LayerSpec, PhysicalUnitSpec, MAX_LAYER_UNITS};
use pu_stock::engine::LayerExpander;
use std::sync::Arc;

fn expander(specs: MockLayerSpecs) -> LayerExpander<MockLayerSpecs> {
    LayerExpander::new(Arc::new(specs))
}

fn layers(units: &[PhysicalUnitSpec]) -> Vec<(String, Option<LayerKind>, u32)> {
    units
        .iter()
        .map(|u| (u.part_code.clone(), u.layer, u.artifact_seq))
        .collect()
}

#[test]
fn test_counts_expand_in_layer_order() {
    let specs = MockLayerSpecs::new();
    specs.insert(
        LayerSpec::new("P10", "TSP")
            .with_l1("2")
            .with_l3("1")
            .with_l3_b("1"),
    );
    let units = expander(specs).expand("P10", "TSP").unwrap();

    assert_eq!(
        layers(&units),
        vec![
            ("TSP".to_string(), Some(LayerKind::L1), 1),
            ("TSP".to_string(), Some(LayerKind::L1), 2),
            ("TSP".to_string(), Some(LayerKind::L3), 1),
            // L3_B 与 L3 共用存储层别,序号连续
            ("TSP".to_string(), Some(LayerKind::L3B), 2),
        ]
    );
    assert_eq!(units[3].layer_tag(), Some("L3"));
    assert_eq!(
        units[3].artifact_name("1001", "TSP", "P10").as_deref(),
        Some("1001_TSP_P10_L3-B_02")
    );
    assert_eq!(
        units[0].artifact_name("1001", "TSP", "P10").as_deref(),
        Some("1001_TSP_P10_L1-A_01")
    );
}

#[test]
fn test_oversized_count_expands_to_cap() {
    pu_stock::logging::init_test();
    let specs = MockLayerSpecs::new();
    specs.insert(LayerSpec::new("P10", "TSP").with_l1("999999999").with_l3("1"));
    let units = expander(specs).expand("P10", "TSP").unwrap();

    let l1 = units.iter().filter(|u| u.layer == Some(LayerKind::L1)).count();
    assert_eq!(l1, MAX_LAYER_UNITS as usize);
    assert_eq!(units.len(), MAX_LAYER_UNITS as usize + 1);
    assert_eq!(
        units[MAX_LAYER_UNITS as usize - 1]
            .artifact_name("1001", "TSP", "P10")
            .as_deref(),
        Some("1001_TSP_P10_L1-A_99")
    );
}

#[test]
fn test_missing_spec_yields_one_untagged_unit() {
    let units = expander(MockLayerSpecs::new()).expand("P10", "XYZ").unwrap();
    assert_eq!(units, vec![PhysicalUnitSpec::untagged("XYZ")]);
    assert_eq!(units[0].artifact_name("1", "XYZ", "P10"), None);
}

#[test]
fn test_blank_and_marker_fields_yield_untagged_unit() {
    let specs = MockLayerSpecs::new();
    specs.insert(LayerSpec::new("P10", "TSP").with_l1("-").with_l3("  ").with_l3_b("0"));
    let units = expander(specs).expand("P10", "TSP").unwrap();
    assert_eq!(layers(&units), vec![("TSP".to_string(), None, 1)]);
}

#[test]
fn test_non_numeric_count_expands_to_one_unit() {
    let specs = MockLayerSpecs::new();
    specs.insert(LayerSpec::new("P10", "TSP").with_l3("X"));
    let units = expander(specs).expand("P10", "TSP").unwrap();
    assert_eq!(layers(&units), vec![("TSP".to_string(), Some(LayerKind::L3), 1)]);
}

#[test]
fn test_special_pieces_separators_are_equivalent() {
    let build = |special: &str| {
        let specs = MockLayerSpecs::new();
        specs.insert(
            LayerSpec::new("P10", "PBS")
                .with_l1("5")
                .with_special_pieces(special),
        );
        specs.insert(LayerSpec::new("P10", "A").with_l1("2"));
        specs.insert(LayerSpec::new("P10", "B").with_l3("1").with_l3_b("X"));
        expander(specs)
    };

    let mixed = build("A, B-C").expand("P10", "PBS").unwrap();
    let commas = build("A,B,C").expand("P10", "PBS").unwrap();
    let hyphens = build("A-B-C").expand("P10", "PBS").unwrap();
    assert_eq!(mixed, commas);
    assert_eq!(mixed, hyphens);

    // 原编码 L1 被忽略;C 无规格时输出一个无层别件
    let concatenated: Vec<PhysicalUnitSpec> = {
        let e = build("");
        let mut v = e.expand("P10", "A").unwrap();
        v.extend(e.expand("P10", "B").unwrap());
        v.extend(e.expand("P10", "C").unwrap());
        v
    };
    assert_eq!(mixed, concatenated);
    assert_eq!(
        layers(&mixed),
        vec![
            ("A".to_string(), Some(LayerKind::L1), 1),
            ("A".to_string(), Some(LayerKind::L1), 2),
            ("B".to_string(), Some(LayerKind::L3), 1),
            ("B".to_string(), Some(LayerKind::L3B), 2),
            ("C".to_string(), None, 1),
        ]
    );
}

#[test]
fn test_special_piece_cycle_terminates() {
    let specs = MockLayerSpecs::new();
    specs.insert(
        LayerSpec::new("P10", "A")
            .with_l1("1")
            .with_special_pieces("B"),
    );
    specs.insert(
        LayerSpec::new("P10", "B")
            .with_l3("1")
            .with_special_pieces("A"),
    );
    let units = expander(specs).expand("P10", "A").unwrap();

    // A → B → A: 第二次到达 A 时不再走替代,按自身层别展开
    assert_eq!(layers(&units), vec![("A".to_string(), Some(LayerKind::L1), 1)]);
}
