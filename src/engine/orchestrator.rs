// ==========================================
// 仓单库存同步系统 - 同步编排器
// ==========================================
// 流程: 读取基线文档 → 逐文件解析 → 构建条目/组合品种 → 沿用合并
//       → 写出文档 → 品种并发落库 → 运行报告
// 红线: 单品种失败只影响该品种；全部源文件不可读时不写出任何结果
// ==========================================

use crate::config::IngestConfig;
use crate::domain::{
    format_last_updated, CommodityEntry, CommodityOutcome, DocumentMetadata, FailureStage,
    NormalizedDocument, RunReport, SyncOutcome,
};
use crate::engine::entry_builder::EntryBuilder;
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::reconciliation::{MergeDecision, ReconciliationMerger};
use crate::importer::ReportParser;
use crate::repository::{DocumentRepository, SnapshotStore};
use chrono::{Local, Utc};
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 解析阶段产物
struct ParseStage {
    fresh: BTreeMap<String, CommodityEntry>,
    /// 本次无可用数据的原因（按品种）
    issues: BTreeMap<String, String>,
    readable_sources: usize,
}

// ==========================================
// IngestOrchestrator - 同步编排器
// ==========================================
pub struct IngestOrchestrator<S>
where
    S: SnapshotStore,
{
    config: IngestConfig,
    parser: ReportParser,
    builder: EntryBuilder,
    merger: ReconciliationMerger,
    documents: DocumentRepository,
    store: S,
}

impl<S> IngestOrchestrator<S>
where
    S: SnapshotStore,
{
    /// 创建编排器
    ///
    /// # 参数
    /// - config: 已校验的同步配置
    /// - store: 快照存储
    pub fn new(config: IngestConfig, store: S) -> Self {
        let parser = ReportParser::with_context(config.classify_context(), config.detect_value_column);
        let documents = DocumentRepository::new(config.document_path.clone());
        Self {
            config,
            parser,
            builder: EntryBuilder::new(),
            merger: ReconciliationMerger::new(),
            documents,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 执行一次完整同步
    ///
    /// # 返回
    /// - Ok(RunReport): 分品种结果（部分失败不报错）
    /// - Err(NoInputReadable): 所有源文件均不可读
    /// - Err(DocumentWrite): 文档写出失败（此时未落库）
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self) -> PipelineResult<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        let started_at = Utc::now();

        info!(sources = self.config.sources.len(), "开始同步");

        // Parsing
        let previous = self.documents.load();
        let mut stage = self.parse_sources();
        if stage.readable_sources == 0 {
            error!(sources = self.config.sources.len(), "所有源文件均不可读");
            return Err(PipelineError::NoInputReadable {
                sources: self.config.sources.len(),
            });
        }
        self.build_composites(&mut stage);

        // Merging
        let merged = self.merger.merge_with_decisions(&stage.fresh, &previous.entries);
        let document = NormalizedDocument::new(
            merged.entries,
            DocumentMetadata {
                last_updated: format_last_updated(Local::now().date_naive()),
                source: self.config.source_name.clone(),
            },
        );
        self.documents
            .save(&document)
            .map_err(PipelineError::DocumentWrite)?;

        // Persisting
        let mut outcomes = self.persist_fresh(&document, &merged.decisions).await;

        for (key, decision) in &merged.decisions {
            match decision {
                MergeDecision::Fresh => {
                    // 不落库的组合品种视为成功
                    outcomes.entry(key.clone()).or_insert(CommodityOutcome::Succeeded);
                }
                MergeDecision::CarriedForward => {
                    if let Some(issue) = stage.issues.get(key) {
                        warn!(commodity = %key, reason = %issue, "本次无可用数据，沿用上次结果");
                    }
                    outcomes.insert(key.clone(), CommodityOutcome::CarriedForward);
                }
                MergeDecision::Omitted => {
                    let reason = stage
                        .issues
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| "无新数据且无历史基线".to_string());
                    outcomes.insert(key.clone(), CommodityOutcome::failed(FailureStage::Parse, reason));
                }
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        report.log_summary();
        Ok(report)
    }

    /// 逐个源文件解析（顺序执行）
    fn parse_sources(&self) -> ParseStage {
        let mut stage = ParseStage {
            fresh: BTreeMap::new(),
            issues: BTreeMap::new(),
            readable_sources: 0,
        };

        for source in &self.config.sources {
            let path = self.config.source_path(source);
            match self.parser.parse_file(&path, &source.layout) {
                Ok(sections) => {
                    stage.readable_sources += 1;
                    for section in &sections {
                        if let Some(issue) = &section.issue {
                            stage.issues.insert(section.commodity.clone(), issue.clone());
                        }
                        let entry = self.builder.from_section(section);
                        debug!(
                            commodity = %entry.commodity,
                            facilities = entry.facility_count(),
                            total = entry.totals.total,
                            "品种解析完成"
                        );
                        stage.fresh.insert(entry.commodity.clone(), entry);
                    }
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "源文件不可读");
                    for commodity in source.layout.commodities() {
                        stage.issues.insert(commodity.to_string(), e.to_string());
                        stage
                            .fresh
                            .insert(commodity.to_string(), self.builder.empty(commodity));
                    }
                }
            }
        }

        stage
    }

    /// 组合品种: 仅当所有成员本次均有明细时生成，否则留空交由沿用规则处理
    fn build_composites(&self, stage: &mut ParseStage) {
        for composite in &self.config.composites {
            let members: Vec<&CommodityEntry> = composite
                .members
                .iter()
                .filter_map(|m| stage.fresh.get(m))
                .filter(|e| e.has_facilities())
                .collect();

            let entry = if members.len() == composite.members.len() {
                self.builder.combine_all(&composite.key, &members)
            } else {
                None
            };

            match entry {
                Some(entry) => {
                    stage.fresh.insert(composite.key.clone(), entry);
                }
                None => {
                    stage
                        .issues
                        .insert(composite.key.clone(), "组合品种成员本次不完整".to_string());
                    stage
                        .fresh
                        .insert(composite.key.clone(), self.builder.empty(&composite.key));
                }
            }
        }
    }

    /// 本次新解析的品种并发落库（沿用品种不重复写入）
    async fn persist_fresh(
        &self,
        document: &NormalizedDocument,
        decisions: &BTreeMap<String, MergeDecision>,
    ) -> BTreeMap<String, CommodityOutcome> {
        let skipped: HashSet<&str> = self
            .config
            .composites
            .iter()
            .filter(|c| !c.persist)
            .map(|c| c.key.as_str())
            .collect();

        let tasks = decisions
            .iter()
            .filter(|(key, decision)| {
                **decision == MergeDecision::Fresh && !skipped.contains(key.as_str())
            })
            .filter_map(|(key, _)| document.get(key).map(|entry| (key.clone(), entry.clone())))
            .map(|(key, entry)| async move {
                let result = self.store.sync_entry(entry).await;
                (key, result)
            });

        let results = join_all(tasks).await;

        let mut outcomes = BTreeMap::new();
        for (key, result) in results {
            let outcome = match result {
                Ok(SyncOutcome::Synced {
                    snapshot_id,
                    facility_rows,
                }) => {
                    debug!(commodity = %key, snapshot_id, facility_rows, "品种落库成功");
                    CommodityOutcome::Succeeded
                }
                Ok(SyncOutcome::SkippedUndated) => {
                    CommodityOutcome::failed(FailureStage::Persist, "report_date 缺失，未写入快照")
                }
                Err(e) => {
                    error!(commodity = %key, error = %e, "品种落库失败");
                    CommodityOutcome::failed(FailureStage::Persist, e.to_string())
                }
            };
            outcomes.insert(key, outcome);
        }

        info!(
            persisted = outcomes.len(),
            failed = outcomes
                .values()
                .filter(|o| matches!(o, CommodityOutcome::Failed { .. }))
                .count(),
            "落库阶段完成"
        );

        outcomes
    }
}
