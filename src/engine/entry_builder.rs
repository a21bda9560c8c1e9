// ==========================================
// 仓单库存同步系统 - 品种条目构建
// ==========================================
// 职责: 仓库明细 → 品种条目（合计）；组合品种合并
// 红线: totals 只统计 total > 0 的仓库；不凭空生成数值
// ==========================================

use crate::domain::{CommodityEntry, Facility, InventoryTotals};
use crate::importer::ParsedSection;
use chrono::NaiveDate;
use tracing::warn;

#[derive(Debug, Default)]
pub struct EntryBuilder;

impl EntryBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 构建品种条目
    ///
    /// # 参数
    /// - key: 品种键
    /// - facilities: 仓库明细（源文件顺序）
    /// - report_date / activity_date: 报表日期
    pub fn build(
        &self,
        key: &str,
        facilities: Vec<Facility>,
        report_date: Option<NaiveDate>,
        activity_date: Option<NaiveDate>,
    ) -> CommodityEntry {
        let facilities: Vec<Facility> = facilities
            .into_iter()
            .filter(Facility::holds_inventory)
            .collect();
        let totals = InventoryTotals::from_facilities(&facilities);

        CommodityEntry {
            commodity: key.to_string(),
            report_date,
            activity_date,
            facilities,
            totals,
        }
    }

    /// 由分节解析结果构建（异常分节得到空明细条目）
    pub fn from_section(&self, section: &ParsedSection) -> CommodityEntry {
        self.build(
            &section.commodity,
            section.facilities.clone(),
            section.dates.report_date,
            section.dates.activity_date,
        )
    }

    /// 空条目（源文件不可读时占位，由合并步骤决定沿用或剔除）
    pub fn empty(&self, key: &str) -> CommodityEntry {
        self.build(key, Vec::new(), None, None)
    }

    /// 合并两个品种为一个组合条目
    ///
    /// # 规则
    /// - 明细拼接（a 在前）
    /// - 合计逐项相加
    /// - 日期取 a 的日期；与 b 不一致时告警
    pub fn combine(&self, key: &str, a: &CommodityEntry, b: &CommodityEntry) -> CommodityEntry {
        if a.report_date != b.report_date || a.activity_date != b.activity_date {
            warn!(
                composite = %key,
                first = %a.commodity,
                second = %b.commodity,
                first_report_date = ?a.report_date,
                second_report_date = ?b.report_date,
                "组合品种成员日期不一致，采用首个成员的日期"
            );
        }

        let mut facilities = a.facilities.clone();
        facilities.extend(b.facilities.iter().cloned());

        CommodityEntry {
            commodity: key.to_string(),
            report_date: a.report_date,
            activity_date: a.activity_date,
            facilities,
            totals: a.totals.add(&b.totals),
        }
    }

    /// 多成员组合（按成员顺序两两合并）
    ///
    /// # 返回
    /// - None: 成员为空
    pub fn combine_all(&self, key: &str, members: &[&CommodityEntry]) -> Option<CommodityEntry> {
        let (first, rest) = members.split_first()?;
        let mut combined = (*first).clone();
        combined.commodity = key.to_string();
        for member in rest {
            combined = self.combine(key, &combined, member);
        }
        Some(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 1, d)
    }

    #[test]
    fn test_build_sums_facilities() {
        let builder = EntryBuilder::new();
        let entry = builder.build(
            "Gold",
            vec![
                Facility::new("A", 80.0, 40.0),
                Facility::new("B", 0.0, 10.0),
                Facility::new("Empty", 0.0, 0.0),
            ],
            date(26),
            date(23),
        );

        assert_eq!(entry.commodity, "Gold");
        assert_eq!(entry.facility_count(), 2);
        assert_eq!(entry.totals.registered, 80.0);
        assert_eq!(entry.totals.eligible, 50.0);
        assert_eq!(
            entry.totals.total,
            entry.facilities.iter().map(Facility::total).sum::<f64>()
        );
    }

    #[test]
    fn test_combine_concatenates_and_sums() {
        let builder = EntryBuilder::new();
        let platinum = builder.build("Platinum", vec![Facility::new("P1", 10.0, 2.0)], date(26), date(23));
        let palladium = builder.build("Palladium", vec![Facility::new("D1", 5.0, 1.0)], date(26), date(23));

        let combined = builder.combine("Platinum_Palladium", &platinum, &palladium);

        assert_eq!(combined.commodity, "Platinum_Palladium");
        let names: Vec<&str> = combined.facilities.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["P1", "D1"]);
        assert_eq!(combined.totals.registered, 15.0);
        assert_eq!(combined.totals.eligible, 3.0);
        assert_eq!(combined.totals.total, 18.0);
        assert_eq!(combined.report_date, date(26));
    }

    #[test]
    fn test_combine_date_mismatch_keeps_first() {
        let builder = EntryBuilder::new();
        let a = builder.build("Platinum", vec![Facility::new("P1", 1.0, 0.0)], date(26), date(23));
        let b = builder.build("Palladium", vec![Facility::new("D1", 1.0, 0.0)], date(27), date(24));

        let combined = builder.combine("Platinum_Palladium", &a, &b);
        assert_eq!(combined.report_date, date(26));
        assert_eq!(combined.activity_date, date(23));
    }

    #[test]
    fn test_combine_all_empty_members() {
        let builder = EntryBuilder::new();
        assert!(builder.combine_all("X", &[]).is_none());
    }
}
