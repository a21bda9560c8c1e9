// ==========================================
// 仓单库存同步系统 - 数据仓储层
// ==========================================
// 职责: 快照表读写（SQLite）/ 规范化文档读写（JSON）
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod document_repo;
pub mod error;
pub mod snapshot_repo;
pub mod snapshot_store;

pub use document_repo::DocumentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use snapshot_repo::{SnapshotCounts, SnapshotRepository};
pub use snapshot_store::SnapshotStore;
