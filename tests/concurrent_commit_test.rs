// ==========================================
// 并发提交测试
// ==========================================
// 职责: 多个连接同时提交同一库位时至多一个成功;
//       冲突方重新分配后最终落在互不相同的库位
// ==========================================

mod helpers;

use helpers::test_data_builder::DraftBuilder;
use pu_stock::api::{ApiError, ManualPieceRequest};
use pu_stock::domain::Membership;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use test_helpers::{create_test_db, seed_layout, small_layout, TestRepos};

const WORKERS: usize = 6;

#[test]
fn test_same_slot_commit_has_single_winner() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_layout(&TestRepos::open(&db_path), &small_layout(1));

    // 先在主线程打开连接,避免并发建表
    let workers: Vec<TestRepos> = (0..WORKERS).map(|_| TestRepos::open(&db_path)).collect();
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = workers
        .into_iter()
        .enumerate()
        .map(|(i, repos)| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let draft = DraftBuilder::new(&format!("10{}", i), "TSP").slot("E1").build();
                barrier.wait();
                repos
                    .unit_repo
                    .commit_units(&[draft], Membership::Queued, false, &format!("worker-{}", i))
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = outcomes.iter().filter(|o| o.is_committed()).count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .filter(|o| !o.is_committed())
        .all(|o| o.inserted == 0 && o.conflicts == vec!["E1".to_string()]));

    let repos = TestRepos::open(&db_path);
    assert_eq!(repos.unit_repo.count_by_membership(Membership::Queued).unwrap(), 1);
}

#[test]
fn test_retry_after_conflict_places_every_piece_once() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_layout(&TestRepos::open(&db_path), &small_layout(1));

    let workers: Vec<TestRepos> = (0..WORKERS).map(|_| TestRepos::open(&db_path)).collect();
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = workers
        .into_iter()
        .enumerate()
        .map(|(i, repos)| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let api = repos.storage_api();
                let request = ManualPieceRequest {
                    order_id: format!("20{}", i),
                    piece_type: "TSP".to_string(),
                    project: "P10".to_string(),
                    vehicle: "V1".to_string(),
                    ..Default::default()
                };
                barrier.wait();

                let mut conflicts = 0;
                loop {
                    match api.add_manual_piece(&request, "worker") {
                        Ok(report) => return (report.slot.code.to_string(), conflicts),
                        Err(e @ ApiError::SlotConflict { .. }) => {
                            assert!(e.is_retryable());
                            conflicts += 1;
                            assert!(conflicts < 50, "重试次数过多");
                        }
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            })
        })
        .collect();

    let placed: Vec<(String, usize)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let slots: HashSet<&String> = placed.iter().map(|(slot, _)| slot).collect();
    assert_eq!(slots.len(), WORKERS);

    let repos = TestRepos::open(&db_path);
    let pending = repos.unit_repo.list_by_membership(Membership::Pending).unwrap();
    assert_eq!(pending.len(), WORKERS);
    let occupied: HashSet<Option<String>> = pending.iter().map(|u| u.slot_code.clone()).collect();
    assert_eq!(occupied.len(), WORKERS);
}
