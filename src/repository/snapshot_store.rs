// ==========================================
// 仓单库存同步系统 - 快照存储 Trait
// ==========================================
// 职责: 定义单品种快照落库接口（不包含实现）
// 红线: 每次调用只影响一个品种的一个报告日；失败不得波及其他品种
// ==========================================

use crate::domain::{CommodityEntry, SyncOutcome};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// SnapshotStore Trait
// ==========================================
// 用途: 编排器的落库接口
// 实现者: SnapshotRepository（使用 rusqlite）
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 写入/覆盖一个品种的日快照，并整体替换仓库明细
    ///
    /// # 参数
    /// - entry: 品种条目（report_date 为空时拒绝写入）
    ///
    /// # 返回
    /// - Ok(SyncOutcome::Synced): 快照 id + 明细行数
    /// - Ok(SyncOutcome::SkippedUndated): 无报告日期，未写入
    /// - Err: 数据库错误（本品种事务回滚）
    async fn sync_entry(&self, entry: CommodityEntry) -> RepositoryResult<SyncOutcome>;
}
