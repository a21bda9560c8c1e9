// ==========================================
// 仓单库存同步系统 - 分节解析器
// ==========================================
// 职责: 消费一个品种分节的行流，输出仓库明细 + 报告日期/业务日期
// 流程: 行分类 → 累加器(仓库名/注册/合格) → 日期扫描 → 分节校验
// 红线: 日期缺失或无任何非零类别数值 → 整节视为异常，返回空明细
// ==========================================

use crate::domain::{parse_report_date, CategoryKind, CellValue, Facility, RowKind};
use crate::importer::error::ImportError;
use crate::importer::row_classifier::{classify, ClassifyContext};
use chrono::NaiveDate;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::{debug, error, warn};

// ==========================================
// ReportDates - 报告日期 / 业务日期
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportDates {
    pub report_date: Option<NaiveDate>,
    pub activity_date: Option<NaiveDate>,
}

impl ReportDates {
    /// 本节未找到的日期由继承值补齐（合并报表的表头日期）
    pub fn or(self, inherited: &ReportDates) -> Self {
        Self {
            report_date: self.report_date.or(inherited.report_date),
            activity_date: self.activity_date.or(inherited.activity_date),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.report_date.is_some() && self.activity_date.is_some()
    }
}

const DATE_PATTERN: &str = r"(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})";

struct DatePatterns {
    report: Regex,
    activity: Regex,
}

/// 日期正则（进程内编译一次；编译失败时返回 None，日期扫描视为无结果）
fn date_patterns() -> Option<&'static DatePatterns> {
    static PATTERNS: OnceLock<Option<DatePatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            let compiled = Regex::new(&format!(r"(?i)report\s+date[:\s]*{}", DATE_PATTERN)).and_then(
                |report| {
                    Regex::new(&format!(r"(?i)activity\s+date[:\s]*{}", DATE_PATTERN))
                        .map(|activity| DatePatterns { report, activity })
                },
            );
            match compiled {
                Ok(patterns) => Some(patterns),
                Err(e) => {
                    error!(error = %e, "日期正则编译失败");
                    None
                }
            }
        })
        .as_ref()
}

/// 行内所有非空单元格拼接为一行文本
fn row_text(row: &[CellValue]) -> String {
    row.iter()
        .filter_map(CellValue::display_text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capture_date(re: &Regex, text: &str) -> Option<NaiveDate> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_report_date(m.as_str()))
}

/// 在行区间内扫描 "Report Date: …" / "Activity Date: …"
///
/// # 说明
/// - 所有列均参与匹配（日期标签不在固定列）
/// - 各自首次出现者生效
pub fn scan_dates(rows: &[Vec<CellValue>], range: Range<usize>) -> ReportDates {
    let mut dates = ReportDates::default();
    let Some(patterns) = date_patterns() else {
        return dates;
    };
    let end = range.end.min(rows.len());
    let start = range.start.min(end);

    for row in &rows[start..end] {
        if dates.is_complete() {
            break;
        }
        let text = row_text(row);
        if text.is_empty() {
            continue;
        }
        if dates.report_date.is_none() {
            dates.report_date = capture_date(&patterns.report, &text);
        }
        if dates.activity_date.is_none() {
            dates.activity_date = capture_date(&patterns.activity, &text);
        }
    }

    dates
}

// ==========================================
// FacilityAccumulator - 仓库累加器
// ==========================================
#[derive(Debug, Default)]
struct FacilityAccumulator {
    name: Option<String>,
    registered: f64,
    eligible: f64,
}

impl FacilityAccumulator {
    /// 输出当前仓库（有名称且注册+合格 > 0 才输出），并清空
    fn flush(&mut self, out: &mut Vec<Facility>) {
        if let Some(name) = self.name.take() {
            let facility = Facility::new(name, self.registered, self.eligible);
            if facility.holds_inventory() {
                out.push(facility);
            }
        }
        self.registered = 0.0;
        self.eligible = 0.0;
    }

    fn start(&mut self, name: String, out: &mut Vec<Facility>) {
        self.flush(out);
        self.name = Some(name);
    }
}

// ==========================================
// ParsedSection - 分节解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSection {
    pub commodity: String,
    pub facilities: Vec<Facility>,
    pub dates: ReportDates,
    /// 源文件行区间
    pub rows: Range<usize>,
    /// 整节被判为异常时的原因
    pub issue: Option<String>,
}

impl ParsedSection {
    /// 空结果（文件缺失 / 分节缺失）
    pub fn empty(commodity: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            commodity: commodity.into(),
            facilities: Vec::new(),
            dates: ReportDates::default(),
            rows: 0..0,
            issue: Some(issue.into()),
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.facilities.is_empty()
    }
}

/// 解析一个分节
///
/// # 参数
/// - commodity: 品种键（用于日志/错误）
/// - rows: 整张表
/// - range: 本节行区间（不含分节行本身）
/// - inherited: 表头区域的日期（单品种报表传默认值）
/// - ctx: 分类上下文
///
/// # 返回
/// - ParsedSection: 异常时 facilities 为空、issue 给出原因
pub fn parse_section(
    commodity: &str,
    rows: &[Vec<CellValue>],
    range: Range<usize>,
    inherited: &ReportDates,
    ctx: &ClassifyContext,
) -> ParsedSection {
    let end = range.end.min(rows.len());
    let start = range.start.min(end);

    let mut facilities = Vec::new();
    let mut acc = FacilityAccumulator::default();
    let mut nonzero_category_rows = 0usize;

    for row in &rows[start..end] {
        match classify(row, ctx) {
            RowKind::FacilityName(name) => acc.start(name, &mut facilities),
            RowKind::SectionBoundary(_) => acc.flush(&mut facilities),
            RowKind::CategoryLabel {
                kind: CategoryKind::Registered,
                value: Some(v),
            } => {
                acc.registered = v;
                if v > 0.0 {
                    nonzero_category_rows += 1;
                }
            }
            RowKind::CategoryLabel {
                kind: CategoryKind::Eligible,
                value: Some(v),
            } => {
                acc.eligible = v;
                if v > 0.0 {
                    nonzero_category_rows += 1;
                }
            }
            RowKind::CategoryLabel { .. } | RowKind::SummaryTotal | RowKind::Noise => {}
        }
    }
    acc.flush(&mut facilities);

    let dates = scan_dates(rows, start..end).or(inherited);

    debug!(
        commodity = %commodity,
        rows = end - start,
        facilities = facilities.len(),
        nonzero_category_rows,
        "分节解析完成"
    );

    match validate_section(commodity, &dates, nonzero_category_rows) {
        Ok(()) => ParsedSection {
            commodity: commodity.to_string(),
            facilities,
            dates,
            rows: start..end,
            issue: None,
        },
        Err(e) => {
            warn!(commodity = %commodity, discarded = facilities.len(), error = %e, "分节异常，丢弃本节结果");
            ParsedSection {
                commodity: commodity.to_string(),
                facilities: Vec::new(),
                dates,
                rows: start..end,
                issue: Some(e.to_string()),
            }
        }
    }
}

fn validate_section(
    commodity: &str,
    dates: &ReportDates,
    nonzero_category_rows: usize,
) -> Result<(), ImportError> {
    let malformed = |reason: &str| ImportError::MalformedSection {
        commodity: commodity.to_string(),
        reason: reason.to_string(),
    };

    if dates.report_date.is_none() {
        return Err(malformed("未找到 Report Date"));
    }
    if dates.activity_date.is_none() {
        return Err(malformed("未找到 Activity Date"));
    }
    if nonzero_category_rows == 0 {
        return Err(malformed("无任何非零 Registered/Eligible 数值（数值列可能已变化）"));
    }
    Ok(())
}
