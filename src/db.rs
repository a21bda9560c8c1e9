// ==========================================
// 仓单库存同步系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键级联删除依赖 foreign_keys）
// - 统一 busy_timeout，品种并发落库时减少偶发 busy 错误
// - 建表幂等（CREATE ... IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS commodity_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    commodity TEXT NOT NULL,
    report_date TEXT NOT NULL,
    activity_date TEXT,
    registered REAL NOT NULL DEFAULT 0,
    eligible REAL NOT NULL DEFAULT 0,
    total REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE(commodity, report_date)
);

CREATE TABLE IF NOT EXISTS facility_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    commodity_snapshot_id INTEGER NOT NULL
        REFERENCES commodity_snapshots(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    registered REAL NOT NULL DEFAULT 0,
    eligible REAL NOT NULL DEFAULT 0,
    total REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_commodity_snapshots_commodity_date
    ON commodity_snapshots(commodity, report_date DESC);

CREATE INDEX IF NOT EXISTS idx_facility_snapshots_parent
    ON facility_snapshots(commodity_snapshot_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
