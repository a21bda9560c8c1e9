// ==========================================
// 仓单库存同步系统 - 规范化文档仓储
// ==========================================
// 职责: 读取上一次发布的文档（作为沿用基线）/ 写出本次文档
// 红线: 基线文档缺失或损坏不阻断本次运行（视为无基线）
//       单个条目损坏只丢弃该条目，其余品种照常作为基线
// ==========================================

use crate::domain::{CommodityEntry, DocumentMetadata, NormalizedDocument};
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const METADATA_KEY: &str = "_metadata";

pub struct DocumentRepository {
    path: PathBuf,
}

impl DocumentRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取上一次的文档
    ///
    /// # 返回
    /// - 文件不存在 → 空文档
    /// - 无法读取 / JSON 损坏 → 告警 + 空文档
    pub fn load(&self) -> NormalizedDocument {
        if !self.path.exists() {
            info!(path = %self.path.display(), "无历史文档，本次无沿用基线");
            return NormalizedDocument::default();
        }

        match self.try_load() {
            Ok(doc) => {
                info!(path = %self.path.display(), commodities = doc.entries.len(), "历史文档读取完成");
                doc
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "历史文档不可用，本次无沿用基线");
                NormalizedDocument::default()
            }
        }
    }

    /// 读取文档（文件级错误上抛，条目级错误逐条丢弃）
    ///
    /// # 返回
    /// - Err: 文件无法读取 / 非 JSON / 顶层不是对象
    /// - Ok: 所有可解析的条目；无法解析的条目告警后跳过
    pub fn try_load(&self) -> RepositoryResult<NormalizedDocument> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| self.document_error(e))?;
        let mut top: BTreeMap<String, Value> =
            serde_json::from_str(&raw).map_err(|e| self.document_error(e))?;

        let metadata = match top.remove(METADATA_KEY) {
            Some(value) => serde_json::from_value::<DocumentMetadata>(value).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "文档元数据无法解析，已忽略");
                DocumentMetadata::default()
            }),
            None => DocumentMetadata::default(),
        };

        let mut entries = BTreeMap::new();
        for (key, value) in top {
            match serde_json::from_value::<CommodityEntry>(value) {
                Ok(entry) => {
                    entries.insert(key, entry);
                }
                Err(e) => {
                    warn!(path = %self.path.display(), commodity = %key, error = %e, "历史条目无法解析，已丢弃");
                }
            }
        }

        Ok(NormalizedDocument::new(entries, metadata))
    }

    /// 写出文档（pretty JSON，必要时创建父目录）
    pub fn save(&self, doc: &NormalizedDocument) -> RepositoryResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.document_error(e))?;
        }

        let json = serde_json::to_string_pretty(doc).map_err(|e| self.document_error(e))?;
        std::fs::write(&self.path, json).map_err(|e| self.document_error(e))?;

        info!(path = %self.path.display(), commodities = doc.entries.len(), "文档已写出");
        Ok(())
    }

    fn document_error(&self, err: impl std::fmt::Display) -> RepositoryError {
        RepositoryError::DocumentError {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }
}
