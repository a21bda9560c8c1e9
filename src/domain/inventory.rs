// ==========================================
// 仓单库存同步系统 - 库存领域模型
// ==========================================
// 职责: 仓库明细 / 品种条目 / 规范化文档
// 红线: Facility.total 永远由 registered + eligible 现算，不信任外部存储值
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Facility - 仓库/交割库明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FacilityRecord", into = "FacilityRecord")]
pub struct Facility {
    pub name: String,
    pub registered: f64,
    pub eligible: f64,
}

impl Facility {
    pub fn new(name: impl Into<String>, registered: f64, eligible: f64) -> Self {
        Self {
            name: name.into(),
            registered,
            eligible,
        }
    }

    /// 合计 = 注册 + 合格
    pub fn total(&self) -> f64 {
        self.registered + self.eligible
    }

    /// 是否为有效库存（全零的仓库只是"已核准但空仓"，不计入）
    pub fn holds_inventory(&self) -> bool {
        self.total() > 0.0
    }
}

/// 序列化形态: 带 total 字段；反序列化时 total 被忽略
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FacilityRecord {
    name: String,
    #[serde(default)]
    registered: f64,
    #[serde(default)]
    eligible: f64,
    #[serde(default)]
    total: f64,
}

impl From<FacilityRecord> for Facility {
    fn from(record: FacilityRecord) -> Self {
        Facility::new(record.name, record.registered, record.eligible)
    }
}

impl From<Facility> for FacilityRecord {
    fn from(facility: Facility) -> Self {
        let total = facility.total();
        FacilityRecord {
            name: facility.name,
            registered: facility.registered,
            eligible: facility.eligible,
            total,
        }
    }
}

// ==========================================
// InventoryTotals - 品种合计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryTotals {
    #[serde(default)]
    pub registered: f64,
    #[serde(default)]
    pub eligible: f64,
    #[serde(default)]
    pub total: f64,
}

impl InventoryTotals {
    /// 逐项累加（只统计 total > 0 的仓库）
    pub fn from_facilities<'a>(facilities: impl IntoIterator<Item = &'a Facility>) -> Self {
        facilities
            .into_iter()
            .filter(|f| f.holds_inventory())
            .fold(Self::default(), |acc, f| Self {
                registered: acc.registered + f.registered,
                eligible: acc.eligible + f.eligible,
                total: acc.total + f.total(),
            })
    }

    /// 逐项相加
    pub fn add(&self, other: &InventoryTotals) -> Self {
        Self {
            registered: self.registered + other.registered,
            eligible: self.eligible + other.eligible,
            total: self.total + other.total,
        }
    }
}

// ==========================================
// CommodityEntry - 单品种库存条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityEntry {
    #[serde(rename = "metal")]
    pub commodity: String,

    #[serde(default, with = "mdy_date")]
    pub report_date: Option<NaiveDate>,

    #[serde(default, with = "mdy_date")]
    pub activity_date: Option<NaiveDate>,

    #[serde(rename = "depositories", default)]
    pub facilities: Vec<Facility>,

    #[serde(default)]
    pub totals: InventoryTotals,
}

impl CommodityEntry {
    pub fn has_facilities(&self) -> bool {
        !self.facilities.is_empty()
    }

    pub fn facility_count(&self) -> usize {
        self.facilities.len()
    }
}

// ==========================================
// DocumentMetadata / NormalizedDocument
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub source: String,
}

/// 规范化文档: 顶层为 品种键 → 条目，外加 `_metadata`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    #[serde(flatten)]
    pub entries: BTreeMap<String, CommodityEntry>,

    #[serde(rename = "_metadata", default)]
    pub metadata: DocumentMetadata,
}

impl NormalizedDocument {
    pub fn new(entries: BTreeMap<String, CommodityEntry>, metadata: DocumentMetadata) -> Self {
        Self { entries, metadata }
    }

    pub fn get(&self, key: &str) -> Option<&CommodityEntry> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// 日期格式: M/D/YYYY（兼容 YYYY-MM-DD）
// ==========================================

/// 解析报告日期文本
///
/// # 支持格式
/// - M/D/YYYY（交易所原始格式，月日可不补零）
/// - YYYY-MM-DD
///
/// # 返回
/// - None: 无法识别或日期非法
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// 格式化为 M/D/YYYY
pub fn format_report_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// 文档元数据中的更新日期格式（例如 January 26, 2026）
pub fn format_last_updated(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub(crate) mod mdy_date {
    use super::{format_report_date, parse_report_date};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&format_report_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    /// 宽松反序列化: 缺失 / null / 非字符串 / 无法解析 → None
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(parse_report_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_facility_total_is_recomputed_on_load() {
        let facility: Facility = serde_json::from_value(json!({
            "name": "Acme Vault",
            "registered": 80,
            "eligible": 40,
            "total": 999
        }))
        .unwrap();

        assert_eq!(facility.total(), 120.0);
        let out = serde_json::to_value(&facility).unwrap();
        assert_eq!(out["total"], json!(120.0));
    }

    #[test]
    fn test_totals_skip_empty_facilities() {
        let facilities = vec![
            Facility::new("A", 10.0, 5.0),
            Facility::new("Empty", 0.0, 0.0),
            Facility::new("B", 0.0, 7.0),
        ];
        let totals = InventoryTotals::from_facilities(&facilities);
        assert_eq!(totals.registered, 10.0);
        assert_eq!(totals.eligible, 12.0);
        assert_eq!(totals.total, 22.0);
    }

    #[test]
    fn test_parse_report_date_formats() {
        assert_eq!(
            parse_report_date("1/26/2026"),
            NaiveDate::from_ymd_opt(2026, 1, 26)
        );
        assert_eq!(
            parse_report_date("2026-02-12"),
            NaiveDate::from_ymd_opt(2026, 2, 12)
        );
        assert_eq!(
            parse_report_date(" 01/06/2026 "),
            NaiveDate::from_ymd_opt(2026, 1, 6)
        );
        assert_eq!(
            parse_report_date("12/1/2025"),
            NaiveDate::from_ymd_opt(2025, 12, 1)
        );
        assert_eq!(parse_report_date("2/30/2026"), None);
        assert_eq!(parse_report_date("13/40/2026"), None);
        assert_eq!(parse_report_date("yesterday"), None);
    }

    #[test]
    fn test_format_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        assert_eq!(format_report_date(date), "1/6/2026");
        assert_eq!(format_last_updated(date), "January 6, 2026");
    }

    #[test]
    fn test_document_shape() {
        let entry = CommodityEntry {
            commodity: "Gold".to_string(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 26),
            activity_date: NaiveDate::from_ymd_opt(2026, 1, 23),
            facilities: vec![Facility::new("Acme Vault", 80.0, 40.0)],
            totals: InventoryTotals {
                registered: 80.0,
                eligible: 40.0,
                total: 120.0,
            },
        };
        let mut entries = BTreeMap::new();
        entries.insert("Gold".to_string(), entry.clone());
        let doc = NormalizedDocument::new(
            entries,
            DocumentMetadata {
                last_updated: "January 26, 2026".to_string(),
                source: "CME Group".to_string(),
            },
        );

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Gold"]["metal"], json!("Gold"));
        assert_eq!(value["Gold"]["report_date"], json!("1/26/2026"));
        assert_eq!(value["Gold"]["depositories"][0]["total"], json!(120.0));
        assert_eq!(value["_metadata"]["source"], json!("CME Group"));

        let back: NormalizedDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_unparseable_date_loads_as_none() {
        let entry: CommodityEntry = serde_json::from_value(json!({
            "metal": "Zinc",
            "report_date": "not a date",
            "depositories": [],
            "totals": {"registered": 0, "eligible": 0, "total": 0}
        }))
        .unwrap();
        assert_eq!(entry.report_date, None);
        assert_eq!(entry.activity_date, None);
    }
}
