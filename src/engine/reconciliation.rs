// ==========================================
// 仓单库存同步系统 - 沿用合并
// ==========================================
// 职责: 本次解析结果 + 上次文档 → 本次文档
// 规则: 本次有明细 → 用本次；否则原样沿用上次；两者皆无 → 剔除
// 红线: 纯函数，不做任何 I/O；某品种失败只让该品种变旧，不丢数据
// ==========================================

use crate::domain::CommodityEntry;
use std::collections::BTreeMap;

/// 单个品种的合并决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// 采用本次解析
    Fresh,
    /// 沿用上次条目
    CarriedForward,
    /// 无新数据且无基线，剔除
    Omitted,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub entries: BTreeMap<String, CommodityEntry>,
    pub decisions: BTreeMap<String, MergeDecision>,
}

#[derive(Debug, Default)]
pub struct ReconciliationMerger;

impl ReconciliationMerger {
    pub fn new() -> Self {
        Self
    }

    /// 合并（只返回条目）
    pub fn merge(
        &self,
        fresh: &BTreeMap<String, CommodityEntry>,
        previous: &BTreeMap<String, CommodityEntry>,
    ) -> BTreeMap<String, CommodityEntry> {
        self.merge_with_decisions(fresh, previous).entries
    }

    /// 合并并给出每个品种的决策
    ///
    /// # 说明
    /// - 品种集合 = fresh 键 ∪ previous 键
    /// - fresh 中的空条目表示"本次无可用数据"（文件缺失与结构异常同等对待）
    pub fn merge_with_decisions(
        &self,
        fresh: &BTreeMap<String, CommodityEntry>,
        previous: &BTreeMap<String, CommodityEntry>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for key in fresh.keys().chain(previous.keys()) {
            if outcome.decisions.contains_key(key) {
                continue;
            }

            let decision = match (fresh.get(key), previous.get(key)) {
                (Some(entry), _) if entry.has_facilities() => {
                    outcome.entries.insert(key.clone(), entry.clone());
                    MergeDecision::Fresh
                }
                (_, Some(prior)) => {
                    outcome.entries.insert(key.clone(), prior.clone());
                    MergeDecision::CarriedForward
                }
                _ => MergeDecision::Omitted,
            };
            outcome.decisions.insert(key.clone(), decision);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Facility, InventoryTotals};
    use chrono::NaiveDate;

    fn entry(key: &str, facilities: Vec<Facility>, day: u32) -> CommodityEntry {
        CommodityEntry {
            commodity: key.to_string(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, day),
            activity_date: NaiveDate::from_ymd_opt(2026, 1, day - 1),
            totals: InventoryTotals::from_facilities(&facilities),
            facilities,
        }
    }

    fn map(entries: Vec<CommodityEntry>) -> BTreeMap<String, CommodityEntry> {
        entries.into_iter().map(|e| (e.commodity.clone(), e)).collect()
    }

    #[test]
    fn test_empty_fresh_carries_previous_verbatim() {
        let previous = map(vec![entry("Gold", vec![Facility::new("A", 1.0, 2.0)], 25)]);
        let fresh = map(vec![entry("Gold", vec![], 26)]);

        let merged = ReconciliationMerger::new().merge(&fresh, &previous);
        assert_eq!(merged.get("Gold"), previous.get("Gold"));
    }

    #[test]
    fn test_fresh_with_facilities_wins() {
        let previous = map(vec![entry("Gold", vec![Facility::new("A", 1.0, 2.0)], 25)]);
        let fresh = map(vec![entry("Gold", vec![Facility::new("B", 3.0, 0.0)], 26)]);

        let outcome = ReconciliationMerger::new().merge_with_decisions(&fresh, &previous);
        assert_eq!(outcome.entries.get("Gold"), fresh.get("Gold"));
        assert_eq!(outcome.decisions["Gold"], MergeDecision::Fresh);
    }

    #[test]
    fn test_no_baseline_is_omitted() {
        let fresh = map(vec![entry("Zinc", vec![], 26)]);
        let outcome = ReconciliationMerger::new().merge_with_decisions(&fresh, &BTreeMap::new());

        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.decisions["Zinc"], MergeDecision::Omitted);
    }

    #[test]
    fn test_previous_only_keys_are_retained() {
        let previous = map(vec![entry("Lead", vec![Facility::new("L", 1.0, 0.0)], 25)]);
        let fresh = map(vec![entry("Gold", vec![Facility::new("G", 1.0, 0.0)], 26)]);

        let outcome = ReconciliationMerger::new().merge_with_decisions(&fresh, &previous);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.decisions["Lead"], MergeDecision::CarriedForward);
        assert_eq!(outcome.decisions["Gold"], MergeDecision::Fresh);
    }

    #[test]
    fn test_failure_in_one_key_does_not_touch_others() {
        let previous = map(vec![
            entry("Gold", vec![Facility::new("G", 1.0, 0.0)], 25),
            entry("Silver", vec![Facility::new("S", 1.0, 0.0)], 25),
        ]);
        let fresh = map(vec![
            entry("Gold", vec![], 26),
            entry("Silver", vec![Facility::new("S2", 9.0, 0.0)], 26),
        ]);

        let merged = ReconciliationMerger::new().merge(&fresh, &previous);
        assert_eq!(merged.get("Gold"), previous.get("Gold"));
        assert_eq!(merged.get("Silver"), fresh.get("Silver"));
    }
}
