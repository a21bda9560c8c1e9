// ==========================================
// 仓单库存同步系统 - 行分类器
// ==========================================
// 职责: 将一行原始单元格判定为 Noise / SectionBoundary / CategoryLabel
//       / FacilityName / SummaryTotal 之一
// 规则: 按顺序匹配，首个命中即返回
// 红线: 分类永不报错；歧义行降级为 Noise
// ==========================================

use crate::domain::{CategoryKind, CellValue, RowKind};

/// 类别数值默认所在列（0 起始）
pub const DEFAULT_VALUE_COLUMN: usize = 7;

/// 默认的品种分节名
pub const DEFAULT_SECTION_TOKENS: &[&str] = &[
    "GOLD", "SILVER", "COPPER", "PLATINUM", "PALLADIUM", "ALUMINUM", "ZINC", "LEAD",
];

/// 表头单词（整格完全匹配）
const HEADER_WORDS: &[&str] = &[
    "DEPOSITORY",
    "DEPOSITORIES",
    "DELIVERY POINT",
    "WAREHOUSE",
    "LOCATION",
    "NAN",
];

/// 样板文字（包含即命中）
const BOILERPLATE_PHRASES: &[&str] = &[
    "COMMODITY EXCHANGE",
    "CME GROUP",
    "COMEX",
    "NYMEX",
    "METAL DEPOSITORY",
    "METAL WAREHOUSE",
    "TROY OUNCE",
    "SHORT TON",
    "METRIC TON",
    "POUNDS",
    "REPORT DATE",
    "ACTIVITY DATE",
    "PREV TOTAL",
    "TOTAL TODAY",
    "ENHANCED DELIVERY",
    "THE INFORMATION",
    "FOR QUESTIONS",
    "DISCLAIMER",
];

/// 样板文字（前缀命中）
const BOILERPLATE_PREFIXES: &[&str] = &["NOTE:", "NOTE "];

/// 汇总行（包含即命中）
const SUMMARY_PHRASES: &[&str] = &["GRAND TOTAL", "COMBINED TOTAL"];

/// 汇总行（前缀命中；"TOTAL <品种>" 另行判断）
const SUMMARY_PREFIXES: &[&str] = &["TOTAL REGISTERED", "TOTAL ELIGIBLE", "TOTAL PLEDGED"];

// ==========================================
// ClassifyContext - 分类上下文
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyContext {
    /// 类别行数值所在列
    pub value_column: usize,
    /// 分节名（大写）
    pub section_tokens: Vec<String>,
}

impl Default for ClassifyContext {
    fn default() -> Self {
        Self {
            value_column: DEFAULT_VALUE_COLUMN,
            section_tokens: DEFAULT_SECTION_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl ClassifyContext {
    pub fn new(value_column: usize, section_tokens: Vec<String>) -> Self {
        Self {
            value_column,
            section_tokens: section_tokens
                .into_iter()
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// 替换数值列（表头探测结果）
    pub fn with_value_column(&self, value_column: usize) -> Self {
        Self {
            value_column,
            section_tokens: self.section_tokens.clone(),
        }
    }

    fn section_token(&self, upper: &str) -> Option<&str> {
        self.section_tokens
            .iter()
            .find(|t| t.as_str() == upper)
            .map(|t| t.as_str())
    }

    fn is_commodity_total(&self, upper: &str) -> bool {
        upper
            .strip_prefix("TOTAL ")
            .map(|rest| {
                self.section_tokens
                    .iter()
                    .any(|t| rest.trim_start().starts_with(t.as_str()))
            })
            .unwrap_or(false)
    }
}

// ==========================================
// classify - 行分类
// ==========================================

/// 对一行进行分类
///
/// # 规则（按序，首个命中即返回）
/// 1. 首格为空/空白/数值 → Noise
/// 2. 首格为样板文字（交易所名、表头、单位说明、联系方式/免责声明）→ Noise
/// 3. 首格（忽略大小写）等于品种名 → SectionBoundary
/// 4. 首格为汇总行（Grand Total / Total Registered ... / Total <品种>）→ SummaryTotal
/// 5. 首格以类别关键字开头 → CategoryLabel（仅 Registered/Eligible 读取固定列数值）
/// 6. 其余 → FacilityName
/// 文本是否为数字: 去掉千分位逗号与外层括号后可解析为有限数
fn is_numeric_text(s: &str) -> bool {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    let inner = cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(cleaned)
        .trim();
    inner.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

pub fn classify(row: &[CellValue], ctx: &ClassifyContext) -> RowKind {
    // 规则 1
    let first = match row.first() {
        Some(CellValue::Text(s)) if !s.trim().is_empty() => s.trim(),
        _ => return RowKind::Noise,
    };
    // 数字文本（含负号 / 会计括号）同样视为歧义
    if is_numeric_text(first) {
        return RowKind::Noise;
    }

    let upper = first.to_uppercase();

    // 规则 2
    if is_boilerplate(&upper) {
        return RowKind::Noise;
    }

    // 规则 3
    if let Some(token) = ctx.section_token(&upper) {
        return RowKind::SectionBoundary(token.to_string());
    }

    // 规则 4
    if is_summary_total(&upper, ctx) {
        return RowKind::SummaryTotal;
    }

    // 规则 5
    if let Some(kind) = category_kind(&upper) {
        let value = match kind {
            CategoryKind::Registered | CategoryKind::Eligible => {
                row.get(ctx.value_column).and_then(CellValue::as_quantity)
            }
            CategoryKind::TotalOrPledged => None,
        };
        return RowKind::CategoryLabel { kind, value };
    }

    // 规则 6
    RowKind::FacilityName(first.to_string())
}

fn is_boilerplate(upper: &str) -> bool {
    HEADER_WORDS.contains(&upper)
        || BOILERPLATE_PHRASES.iter().any(|p| upper.contains(p))
        || BOILERPLATE_PREFIXES.iter().any(|p| upper.starts_with(p))
}

fn is_summary_total(upper: &str, ctx: &ClassifyContext) -> bool {
    SUMMARY_PHRASES.iter().any(|p| upper.contains(p))
        || SUMMARY_PREFIXES.iter().any(|p| upper.starts_with(p))
        || ctx.is_commodity_total(upper)
}

fn category_kind(upper: &str) -> Option<CategoryKind> {
    if upper.starts_with("REGISTERED") {
        Some(CategoryKind::Registered)
    } else if upper.starts_with("ELIGIBLE") {
        Some(CategoryKind::Eligible)
    } else if upper.starts_with("TOTAL") || upper.starts_with("PLEDGED") {
        Some(CategoryKind::TotalOrPledged)
    } else {
        None
    }
}

/// 在表头区域探测 "TOTAL TODAY" 所在列
///
/// # 参数
/// - rows: 整张表
/// - scan_rows: 最多扫描的行数
///
/// # 返回
/// - Some(col): 探测到的列号
/// - None: 未找到（调用方使用配置列）
pub fn detect_value_column(rows: &[Vec<CellValue>], scan_rows: usize) -> Option<usize> {
    rows.iter().take(scan_rows).find_map(|row| {
        row.iter().position(|cell| {
            cell.as_text()
                .map(|s| s.to_uppercase().contains("TOTAL TODAY"))
                .unwrap_or(false)
        })
    })
}
