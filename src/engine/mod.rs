// ==========================================
// 仓单库存同步系统 - 引擎层
// ==========================================
// 职责: 条目构建 / 沿用合并 / 批次编排
// 红线: Engine 不拼 SQL；单品种失败不外溢
// ==========================================

pub mod entry_builder;
pub mod error;
pub mod orchestrator;
pub mod reconciliation;

// 重导出核心引擎
pub use entry_builder::EntryBuilder;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::IngestOrchestrator;
pub use reconciliation::{MergeDecision, MergeOutcome, ReconciliationMerger};
