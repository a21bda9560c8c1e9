// ==========================================
// 仓单库存同步系统 - 快照仓储
// ==========================================
// 职责: commodity_snapshots / facility_snapshots 的写入与查询
// 写入: (commodity, report_date) 幂等覆盖 + 仓库明细整体替换，单事务
// 红线: 永不写入 report_date 为空的快照；Repository 不含业务逻辑
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{
    CommodityEntry, CommoditySnapshot, Facility, FacilitySnapshot, InventoryTotals, SyncOutcome,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::snapshot_store::SnapshotStore;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// 数据库中的日期格式
const DB_DATE_FORMAT: &str = "%Y-%m-%d";

/// 表行数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCounts {
    pub commodity_snapshots: i64,
    pub facility_snapshots: i64,
}

/// 查询原始行（日期尚为文本）
struct RawSnapshotRow {
    id: i64,
    commodity: String,
    report_date: String,
    activity_date: Option<String>,
    registered: f64,
    eligible: f64,
    total: f64,
    created_at: String,
}

impl RawSnapshotRow {
    const COLUMNS: &'static str =
        "id, commodity, report_date, activity_date, registered, eligible, total, created_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            commodity: row.get(1)?,
            report_date: row.get(2)?,
            activity_date: row.get(3)?,
            registered: row.get(4)?,
            eligible: row.get(5)?,
            total: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_snapshot(self) -> RepositoryResult<CommoditySnapshot> {
        let report_date = parse_db_date("report_date", &self.report_date)?;
        let activity_date = match self.activity_date {
            Some(raw) => Some(parse_db_date("activity_date", &raw)?),
            None => None,
        };
        Ok(CommoditySnapshot {
            id: self.id,
            commodity: self.commodity,
            report_date,
            activity_date,
            registered: self.registered,
            eligible: self.eligible,
            total: self.total,
            created_at: self.created_at,
        })
    }
}

fn parse_db_date(field: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DB_DATE_FORMAT).map_err(|_| RepositoryError::InvalidDate {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

// ==========================================
// SnapshotRepository - 快照仓储
// ==========================================
#[derive(Clone)]
pub struct SnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotRepository {
    /// 打开数据库并确保表结构存在
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责 PRAGMA 与建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入/覆盖一个品种的日快照
    ///
    /// # 参数
    /// - commodity: 品种键
    /// - report_date: 报告日期（None → 跳过并告警）
    /// - activity_date: 业务日期
    /// - totals: 品种合计
    /// - facilities: 仓库明细（全零仓库不落库）
    ///
    /// # 返回
    /// - Ok(SyncOutcome): 写入结果
    /// - Err: 数据库错误（事务回滚，旧快照与旧明细保持不变）
    pub fn upsert(
        &self,
        commodity: &str,
        report_date: Option<NaiveDate>,
        activity_date: Option<NaiveDate>,
        totals: &InventoryTotals,
        facilities: &[Facility],
    ) -> RepositoryResult<SyncOutcome> {
        let report_date = match report_date {
            Some(d) => d,
            None => {
                warn!(commodity = %commodity, "report_date 为空，拒绝写入快照");
                return Ok(SyncOutcome::SkippedUndated);
            }
        };

        let rows: Vec<&Facility> = facilities.iter().filter(|f| f.holds_inventory()).collect();

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let snapshot_id: i64 = tx.query_row(
            r#"
            INSERT INTO commodity_snapshots (
                commodity, report_date, activity_date,
                registered, eligible, total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(commodity, report_date) DO UPDATE SET
                activity_date = excluded.activity_date,
                registered = excluded.registered,
                eligible = excluded.eligible,
                total = excluded.total,
                created_at = excluded.created_at
            RETURNING id
            "#,
            params![
                commodity,
                report_date.format(DB_DATE_FORMAT).to_string(),
                activity_date.map(|d| d.format(DB_DATE_FORMAT).to_string()),
                totals.registered,
                totals.eligible,
                totals.total,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;

        // 明细整体替换
        tx.execute(
            "DELETE FROM facility_snapshots WHERE commodity_snapshot_id = ?1",
            params![snapshot_id],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO facility_snapshots (
                    commodity_snapshot_id, name, registered, eligible, total
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for facility in &rows {
                stmt.execute(params![
                    snapshot_id,
                    facility.name,
                    facility.registered,
                    facility.eligible,
                    facility.total(),
                ])?;
            }
        }

        tx.commit()?;

        debug!(
            commodity = %commodity,
            report_date = %report_date,
            snapshot_id,
            facility_rows = rows.len(),
            "快照写入完成"
        );

        Ok(SyncOutcome::Synced {
            snapshot_id,
            facility_rows: rows.len(),
        })
    }

    /// 按品种条目写入
    pub fn upsert_entry(&self, entry: &CommodityEntry) -> RepositoryResult<SyncOutcome> {
        self.upsert(
            &entry.commodity,
            entry.report_date,
            entry.activity_date,
            &entry.totals,
            &entry.facilities,
        )
    }

    /// 按唯一键查询快照
    ///
    /// # 返回
    /// - Ok(Some): 找到
    /// - Ok(None): 未找到
    pub fn find_snapshot(
        &self,
        commodity: &str,
        report_date: NaiveDate,
    ) -> RepositoryResult<Option<CommoditySnapshot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM commodity_snapshots WHERE commodity = ?1 AND report_date = ?2",
            RawSnapshotRow::COLUMNS
        );
        let raw = conn
            .query_row(
                &sql,
                params![commodity, report_date.format(DB_DATE_FORMAT).to_string()],
                RawSnapshotRow::from_row,
            )
            .optional()?;

        raw.map(RawSnapshotRow::into_snapshot).transpose()
    }

    /// 查询快照的仓库明细（按写入顺序）
    pub fn find_facilities(&self, snapshot_id: i64) -> RepositoryResult<Vec<FacilitySnapshot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, commodity_snapshot_id, name, registered, eligible, total
            FROM facility_snapshots
            WHERE commodity_snapshot_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt
            .query_map(params![snapshot_id], |row| {
                Ok(FacilitySnapshot {
                    id: row.get(0)?,
                    commodity_snapshot_id: row.get(1)?,
                    name: row.get(2)?,
                    registered: row.get(3)?,
                    eligible: row.get(4)?,
                    total: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// 每个品种最新报告日的快照（按品种排序）
    pub fn find_latest_per_commodity(&self) -> RepositoryResult<Vec<CommoditySnapshot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {cols}
            FROM commodity_snapshots s
            WHERE s.report_date = (
                SELECT MAX(report_date) FROM commodity_snapshots WHERE commodity = s.commodity
            )
            ORDER BY s.commodity
            "#,
            cols = RawSnapshotRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw_rows = stmt
            .query_map([], RawSnapshotRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows.into_iter().map(RawSnapshotRow::into_snapshot).collect()
    }

    /// 两张表的行数
    pub fn count_rows(&self) -> RepositoryResult<SnapshotCounts> {
        let conn = self.get_conn()?;
        let commodity_snapshots: i64 =
            conn.query_row("SELECT COUNT(*) FROM commodity_snapshots", [], |row| row.get(0))?;
        let facility_snapshots: i64 =
            conn.query_row("SELECT COUNT(*) FROM facility_snapshots", [], |row| row.get(0))?;
        Ok(SnapshotCounts {
            commodity_snapshots,
            facility_snapshots,
        })
    }
}

#[async_trait]
impl SnapshotStore for SnapshotRepository {
    /// 在阻塞线程池中执行同步写入
    async fn sync_entry(&self, entry: CommodityEntry) -> RepositoryResult<SyncOutcome> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.upsert_entry(&entry))
            .await
            .map_err(|e| RepositoryError::InternalError(format!("落库任务异常: {}", e)))?
    }
}
