// ==========================================
// 仓单库存同步系统 - 核心库
// ==========================================
// 职责: 交易所仓单库存日报 → 规范化文档 + 日快照
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 报表读取与解析
pub mod importer;

// 引擎层 - 条目构建 / 合并 / 编排
pub mod engine;

// 数据仓储层 - 快照与文档
pub mod repository;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::IngestConfig;
pub use domain::{
    CellValue, CommodityEntry, CommodityOutcome, Facility, InventoryTotals, NormalizedDocument,
    RowKind, RunReport,
};
pub use engine::{EntryBuilder, IngestOrchestrator, PipelineError, ReconciliationMerger};
pub use importer::{classify, ClassifyContext, ReportParser};
pub use repository::{DocumentRepository, SnapshotRepository, SnapshotStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓单库存同步系统";
