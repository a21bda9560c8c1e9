// ==========================================
// 仓单库存同步系统 - 领域层
// ==========================================
// 职责: 实体与类型定义（无 I/O）
// ==========================================

pub mod inventory;
pub mod run_report;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use inventory::{
    format_last_updated, format_report_date, parse_report_date, CommodityEntry, DocumentMetadata,
    Facility, InventoryTotals, NormalizedDocument,
};
pub use run_report::{CommodityOutcome, FailureStage, OutcomeTally, RunReport};
pub use snapshot::{CommoditySnapshot, FacilitySnapshot, SyncOutcome};
pub use types::{CategoryKind, CellValue, RowKind};
