// Small operator utility: print snapshot table counts and the latest snapshot per commodity.
//
// Usage:
//   cargo run --bin view_snapshots -- [db_path]
//
// Read-only; runs the idempotent schema check so an empty database prints zero counts.

use warehouse_stocks::config::get_default_db_path;
use warehouse_stocks::domain::format_report_date;
use warehouse_stocks::SnapshotRepository;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);

    let repo = SnapshotRepository::new(&db_path)?;
    let counts = repo.count_rows()?;

    println!("db={}", db_path);
    println!("commodity_snapshots={}", counts.commodity_snapshots);
    println!("facility_snapshots={}", counts.facility_snapshots);

    for snapshot in repo.find_latest_per_commodity()? {
        println!();
        println!(
            "{} report_date={} activity_date={} registered={:.0} eligible={:.0} total={:.0}",
            snapshot.commodity,
            format_report_date(snapshot.report_date),
            snapshot
                .activity_date
                .map(format_report_date)
                .unwrap_or_else(|| "-".to_string()),
            snapshot.registered,
            snapshot.eligible,
            snapshot.total,
        );

        for facility in repo.find_facilities(snapshot.id)? {
            println!(
                "  {:<40} {:>14.0} {:>14.0} {:>14.0}",
                facility.name, facility.registered, facility.eligible, facility.total
            );
        }
    }

    Ok(())
}
