// ==========================================
// 仓单库存同步系统 - 运行报告
// ==========================================
// 职责: 每次批处理结束时的分品种结果统计
// 口径: succeeded / carried_forward / failed
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 失败阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStage {
    Parse,   // 解析无结果且无历史基线
    Persist, // 快照落库失败
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Parse => write!(f, "PARSE"),
            FailureStage::Persist => write!(f, "PERSIST"),
        }
    }
}

/// 单品种本次运行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommodityOutcome {
    Succeeded,
    CarriedForward,
    Failed { stage: FailureStage, reason: String },
}

impl CommodityOutcome {
    pub fn failed(stage: FailureStage, reason: impl Into<String>) -> Self {
        CommodityOutcome::Failed {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CommodityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommodityOutcome::Succeeded => write!(f, "SUCCEEDED"),
            CommodityOutcome::CarriedForward => write!(f, "CARRIED_FORWARD"),
            CommodityOutcome::Failed { stage, reason } => write!(f, "FAILED[{}]: {}", stage, reason),
        }
    }
}

/// 结果计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub succeeded: usize,
    pub carried_forward: usize,
    pub failed: usize,
}

// ==========================================
// RunReport - 运行报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: BTreeMap<String, CommodityOutcome>,
}

impl RunReport {
    pub fn tally(&self) -> OutcomeTally {
        self.outcomes
            .values()
            .fold(OutcomeTally::default(), |mut acc, outcome| {
                match outcome {
                    CommodityOutcome::Succeeded => acc.succeeded += 1,
                    CommodityOutcome::CarriedForward => acc.carried_forward += 1,
                    CommodityOutcome::Failed { .. } => acc.failed += 1,
                }
                acc
            })
    }

    pub fn outcome(&self, commodity: &str) -> Option<&CommodityOutcome> {
        self.outcomes.get(commodity)
    }

    /// 日志输出: 每个品种一行 + 汇总
    pub fn log_summary(&self) {
        for (commodity, outcome) in &self.outcomes {
            match outcome {
                CommodityOutcome::Failed { .. } => {
                    tracing::warn!(run_id = %self.run_id, commodity = %commodity, outcome = %outcome, "品种同步结果")
                }
                _ => {
                    tracing::info!(run_id = %self.run_id, commodity = %commodity, outcome = %outcome, "品种同步结果")
                }
            }
        }

        let tally = self.tally();
        tracing::info!(
            run_id = %self.run_id,
            succeeded = tally.succeeded,
            carried_forward = tally.carried_forward,
            failed = tally.failed,
            elapsed_ms = (self.finished_at - self.started_at).num_milliseconds(),
            "本次同步完成"
        );
    }
}
