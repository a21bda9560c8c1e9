// ==========================================
// 仓单库存同步系统 - 流水线错误类型
// ==========================================
// 口径: 品种级失败只进入运行报告，这里只有整批次无法继续的情况
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("所有源文件均不可读 (共 {sources} 个)，本次不写出任何结果")]
    NoInputReadable { sources: usize },

    #[error("文档写出失败: {0}")]
    DocumentWrite(#[source] RepositoryError),
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, PipelineError>;
