// ==========================================
// 仓单库存同步系统 - 配置层
// ==========================================
// 职责: 同步任务配置（源文件/版式/路径），支持环境变量覆写
// 存储: JSON 文件（可选）
// ==========================================

pub mod error;
pub mod ingest_config;

pub use error::{ConfigError, ConfigResult};
pub use ingest_config::{
    env_keys, get_default_db_path, CompositeSpec, IngestConfig, SectionSpec, SourceLayout,
    SourceSpec,
};
