// ==========================================
// 仓单库存同步系统 - 快照领域模型
// ==========================================
// 职责: commodity_snapshots / facility_snapshots 行模型
// 唯一键: (commodity, report_date)
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// CommoditySnapshot - 品种日快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommoditySnapshot {
    pub id: i64,
    pub commodity: String,
    pub report_date: NaiveDate,
    pub activity_date: Option<NaiveDate>,
    pub registered: f64,
    pub eligible: f64,
    pub total: f64,
    pub created_at: String, // RFC3339
}

// ==========================================
// FacilitySnapshot - 仓库明细快照（随父快照级联删除）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySnapshot {
    pub id: i64,
    pub commodity_snapshot_id: i64,
    pub name: String,
    pub registered: f64,
    pub eligible: f64,
    pub total: f64,
}

// ==========================================
// SyncOutcome - 单品种落库结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// 快照已写入/覆盖，明细已整体替换
    Synced { snapshot_id: i64, facility_rows: usize },
    /// report_date 缺失，拒绝写入
    SkippedUndated,
}
