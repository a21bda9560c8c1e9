// ==========================================
// 快照仓储集成测试
// ==========================================
// 测试目标: 幂等覆盖 / 明细整体替换 / 级联删除 / 空日期拒绝 / 并发落库
// ==========================================


use chrono::NaiveDate;
use futures::future::join_all;
use rusqlite::params;
use warehouse_stocks::db::open_sqlite_connection;
use warehouse_stocks::domain::{CommodityEntry, Facility, InventoryTotals, SyncOutcome};
use warehouse_stocks::logging;
use warehouse_stocks::repository::{SnapshotRepository, SnapshotStore};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

fn entry(commodity: &str, day: u32, facilities: Vec<Facility>) -> CommodityEntry {
    CommodityEntry {
        commodity: commodity.to_string(),
        report_date: Some(date(day)),
        activity_date: Some(date(day - 1)),
        totals: InventoryTotals::from_facilities(&facilities),
        facilities,
    }
}

fn synced_id(outcome: SyncOutcome) -> i64 {
    match outcome {
        SyncOutcome::Synced { snapshot_id, .. } => snapshot_id,
        other => panic!("expected Synced, got {:?}", other),
    }
}

#[test]
fn test_upsert_same_date_twice_is_idempotent() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SnapshotRepository::new(&db_path).unwrap();

    let gold = entry(
        "Gold",
        26,
        vec![
            Facility::new("Brink's Inc", 80.0, 40.0),
            Facility::new("HSBC Bank USA", 10.0, 5.0),
        ],
    );

    let first = synced_id(repo.upsert_entry(&gold).unwrap());
    let second = synced_id(repo.upsert_entry(&gold).unwrap());
    assert_eq!(first, second);

    let counts = repo.count_rows().unwrap();
    assert_eq!(counts.commodity_snapshots, 1);
    assert_eq!(counts.facility_snapshots, 2);

    let rows = repo.find_facilities(first).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Brink's Inc", "HSBC Bank USA"]);
    for row in &rows {
        assert_eq!(row.total, row.registered + row.eligible);
    }
}

#[test]
fn test_resync_replaces_facility_set_and_overwrites_totals() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SnapshotRepository::new(&db_path).unwrap();

    let id = synced_id(
        repo.upsert_entry(&entry(
            "Silver",
            26,
            vec![
                Facility::new("Old Vault", 1.0, 1.0),
                Facility::new("Closed Vault", 2.0, 2.0),
            ],
        ))
        .unwrap(),
    );

    let updated = entry("Silver", 26, vec![Facility::new("New Vault", 7.0, 3.0)]);
    assert_eq!(synced_id(repo.upsert_entry(&updated).unwrap()), id);

    let rows = repo.find_facilities(id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "New Vault");

    let snapshot = repo.find_snapshot("Silver", date(26)).unwrap().unwrap();
    assert_eq!(snapshot.registered, 7.0);
    assert_eq!(snapshot.eligible, 3.0);
    assert_eq!(snapshot.total, 10.0);
}

#[test]
fn test_new_report_date_appends_snapshot() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SnapshotRepository::new(&db_path).unwrap();

    let facilities = vec![Facility::new("Vault", 5.0, 5.0)];
    let a = synced_id(repo.upsert_entry(&entry("Copper", 26, facilities.clone())).unwrap());
    let b = synced_id(repo.upsert_entry(&entry("Copper", 27, facilities)).unwrap());

    assert_ne!(a, b);
    assert_eq!(repo.count_rows().unwrap().commodity_snapshots, 2);
    let latest = repo.find_latest_per_commodity().unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].report_date, date(27));
}

#[test]
fn test_deleting_snapshot_cascades_to_facilities() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SnapshotRepository::new(&db_path).unwrap();

    let id = synced_id(
        repo.upsert_entry(&entry("Zinc", 26, vec![Facility::new("Vault A", 3.0, 0.0)]))
            .unwrap(),
    );
    assert_eq!(repo.count_rows().unwrap().facility_snapshots, 1);

    let conn = open_sqlite_connection(&db_path).unwrap();
    conn.execute("DELETE FROM commodity_snapshots WHERE id = ?1", params![id])
        .unwrap();

    let counts = repo.count_rows().unwrap();
    assert_eq!(counts.commodity_snapshots, 0);
    assert_eq!(counts.facility_snapshots, 0);
}

#[test]
fn test_undated_entry_is_never_written() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SnapshotRepository::new(&db_path).unwrap();

    let mut undated = entry("Lead", 26, vec![Facility::new("Vault", 1.0, 0.0)]);
    undated.report_date = None;

    assert_eq!(repo.upsert_entry(&undated).unwrap(), SyncOutcome::SkippedUndated);
    assert_eq!(repo.count_rows().unwrap().commodity_snapshots, 0);
}

#[tokio::test]
async fn test_concurrent_sync_of_distinct_commodities() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SnapshotRepository::new(&db_path).unwrap();

    let commodities = ["Gold", "Silver", "Copper", "Aluminum", "Zinc", "Lead"];
    let tasks = commodities.iter().map(|c| {
        let facilities = vec![
            Facility::new(format!("{} Vault 1", c), 10.0, 1.0),
            Facility::new(format!("{} Vault 2", c), 20.0, 2.0),
        ];
        repo.sync_entry(entry(c, 26, facilities))
    });

    let results = join_all(tasks).await;
    for result in results {
        assert!(matches!(result, Ok(SyncOutcome::Synced { facility_rows: 2, .. })));
    }

    let counts = repo.count_rows().unwrap();
    assert_eq!(counts.commodity_snapshots, commodities.len() as i64);
    assert_eq!(counts.facility_snapshots, 2 * commodities.len() as i64);
}
