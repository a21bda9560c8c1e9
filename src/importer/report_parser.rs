// ==========================================
// 仓单库存同步系统 - 报表解析器
// ==========================================
// 职责: 读取一份源文件并按版式切分为品种分节
// 流程: 读取行 → 数值列探测 → 切分分节 → 分节解析
// 红线: 合并报表中某个分节缺失只影响该品种，不影响同文件其他品种
// ==========================================

use crate::config::{SectionSpec, SourceLayout};
use crate::domain::{CellValue, RowKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_reader::{SheetReader, UniversalSheetReader};
use crate::importer::row_classifier::{classify, detect_value_column, ClassifyContext};
use crate::importer::section_parser::{parse_section, scan_dates, ParsedSection, ReportDates};
use std::path::Path;
use tracing::{debug, info, warn};

/// 表头探测扫描行数
const HEADER_SCAN_ROWS: usize = 20;

// ==========================================
// ReportParser
// ==========================================
pub struct ReportParser {
    reader: Box<dyn SheetReader>,
    ctx: ClassifyContext,
    detect_value_column: bool,
}

impl ReportParser {
    /// 创建解析器
    ///
    /// # 参数
    /// - reader: 表格读取实现
    /// - ctx: 基础分类上下文（配置的数值列 + 分节名）
    /// - detect_value_column: 是否按 "TOTAL TODAY" 表头覆盖数值列
    pub fn new(reader: Box<dyn SheetReader>, ctx: ClassifyContext, detect_value_column: bool) -> Self {
        Self {
            reader,
            ctx,
            detect_value_column,
        }
    }

    /// 按扩展名自动选择读取器
    pub fn with_context(ctx: ClassifyContext, detect_value_column: bool) -> Self {
        Self::new(Box::new(UniversalSheetReader), ctx, detect_value_column)
    }

    /// 解析一份源文件
    ///
    /// # 返回
    /// - Ok(Vec<ParsedSection>): 每个配置品种一个结果（可能为空明细）
    /// - Err: 文件不可读（调用方按"无新数据"处理）
    pub fn parse_file(&self, path: &Path, layout: &SourceLayout) -> ImportResult<Vec<ParsedSection>> {
        let rows = self.reader.read_rows(path)?;
        info!(file = %path.display(), rows = rows.len(), "源文件读取完成");
        Ok(self.parse_rows(&rows, layout))
    }

    /// 解析已读取的行
    pub fn parse_rows(&self, rows: &[Vec<CellValue>], layout: &SourceLayout) -> Vec<ParsedSection> {
        let ctx = self.effective_context(rows);

        match layout {
            SourceLayout::Single { commodity } => vec![parse_section(
                commodity,
                rows,
                0..rows.len(),
                &ReportDates::default(),
                &ctx,
            )],
            SourceLayout::Combined { sections } => split_combined(rows, sections, &ctx),
        }
    }

    fn effective_context(&self, rows: &[Vec<CellValue>]) -> ClassifyContext {
        if !self.detect_value_column {
            return self.ctx.clone();
        }
        match detect_value_column(rows, HEADER_SCAN_ROWS) {
            Some(col) if col != self.ctx.value_column => {
                debug!(configured = self.ctx.value_column, detected = col, "按表头覆盖数值列");
                self.ctx.with_value_column(col)
            }
            _ => self.ctx.clone(),
        }
    }
}

/// 合并报表切分
///
/// # 规则
/// - 每个分节取其分节行的首次出现
/// - 分节范围: 分节行下一行 → 下一个已定位分节行（或表尾）
/// - 首个分节行之前的区域为表头，其中的日期由各分节继承
fn split_combined(
    rows: &[Vec<CellValue>],
    sections: &[SectionSpec],
    ctx: &ClassifyContext,
) -> Vec<ParsedSection> {
    // (分节下标, 分节行号)
    let mut located: Vec<(usize, usize)> = sections
        .iter()
        .enumerate()
        .filter_map(|(i, section)| find_boundary(rows, &section.token, ctx).map(|row| (i, row)))
        .collect();
    located.sort_by_key(|(_, row)| *row);

    let preamble_end = located.first().map(|(_, row)| *row).unwrap_or(rows.len());
    let inherited = scan_dates(rows, 0..preamble_end);

    let mut results: Vec<Option<ParsedSection>> = vec![None; sections.len()];
    for (pos, (section_idx, boundary_row)) in located.iter().enumerate() {
        let end = located
            .get(pos + 1)
            .map(|(_, row)| *row)
            .unwrap_or(rows.len());
        let section = &sections[*section_idx];
        results[*section_idx] = Some(parse_section(
            &section.commodity,
            rows,
            (boundary_row + 1)..end,
            &inherited,
            ctx,
        ));
    }

    sections
        .iter()
        .zip(results)
        .map(|(section, parsed)| {
            parsed.unwrap_or_else(|| {
                let err = ImportError::SectionBoundaryMissing {
                    commodity: section.commodity.clone(),
                    token: section.token.to_uppercase(),
                };
                warn!(commodity = %section.commodity, error = %err, "合并报表缺少分节");
                ParsedSection::empty(section.commodity.clone(), err.to_string())
            })
        })
        .collect()
}

fn find_boundary(rows: &[Vec<CellValue>], token: &str, ctx: &ClassifyContext) -> Option<usize> {
    let wanted = token.trim().to_uppercase();
    rows.iter().position(|row| match classify(row, ctx) {
        RowKind::SectionBoundary(found) => found == wanted,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Facility;
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn row(first: &str, value: Option<f64>) -> Vec<CellValue> {
        let mut r = vec![text(first)];
        r.extend(std::iter::repeat(CellValue::Empty).take(6));
        r.push(value.map(CellValue::Number).unwrap_or(CellValue::Empty));
        r
    }

    fn preamble() -> Vec<Vec<CellValue>> {
        vec![
            vec![text("COMMODITY EXCHANGE, INC.")],
            vec![text("Report Date: 1/26/2026")],
            vec![text("Activity Date: 1/23/2026")],
        ]
    }

    fn pgm_layout() -> SourceLayout {
        SourceLayout::Combined {
            sections: vec![
                SectionSpec {
                    token: "PLATINUM".to_string(),
                    commodity: "Platinum".to_string(),
                },
                SectionSpec {
                    token: "PALLADIUM".to_string(),
                    commodity: "Palladium".to_string(),
                },
            ],
        }
    }

    fn parser() -> ReportParser {
        ReportParser::with_context(ClassifyContext::default(), true)
    }

    #[test]
    fn test_combined_sheet_splits_sections() {
        let mut rows = preamble();
        rows.push(row("PLATINUM", None));
        rows.push(row("Plat Vault", None));
        rows.push(row("Registered", Some(10.0)));
        rows.push(row("Eligible", Some(2.0)));
        rows.push(row("PALLADIUM", None));
        rows.push(row("Pall Vault", None));
        rows.push(row("Registered", Some(5.0)));

        let parsed = parser().parse_rows(&rows, &pgm_layout());

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].commodity, "Platinum");
        assert_eq!(parsed[0].facilities, vec![Facility::new("Plat Vault", 10.0, 2.0)]);
        assert_eq!(parsed[1].commodity, "Palladium");
        assert_eq!(parsed[1].facilities, vec![Facility::new("Pall Vault", 5.0, 0.0)]);
        // 表头日期由两个分节继承
        for section in &parsed {
            assert_eq!(section.dates.report_date, NaiveDate::from_ymd_opt(2026, 1, 26));
            assert_eq!(section.dates.activity_date, NaiveDate::from_ymd_opt(2026, 1, 23));
        }

        // 行区间互不重叠，且不含分节行本身
        let boundary_rows = [3usize, 7];
        assert_eq!(parsed[0].rows, 4..7);
        assert_eq!(parsed[1].rows, 8..rows.len());
        assert!(parsed[0].rows.end <= parsed[1].rows.start);
        for section in &parsed {
            for boundary in boundary_rows {
                assert!(!section.rows.contains(&boundary));
            }
        }
    }

    #[test]
    fn test_section_order_follows_sheet_not_config() {
        let mut rows = preamble();
        rows.push(row("PALLADIUM", None));
        rows.push(row("Pall Vault", None));
        rows.push(row("Registered", Some(5.0)));
        rows.push(row("PLATINUM", None));
        rows.push(row("Plat Vault", None));
        rows.push(row("Eligible", Some(3.0)));

        let parsed = parser().parse_rows(&rows, &pgm_layout());
        assert_eq!(parsed[0].facilities, vec![Facility::new("Plat Vault", 0.0, 3.0)]);
        assert_eq!(parsed[1].facilities, vec![Facility::new("Pall Vault", 5.0, 0.0)]);
    }

    #[test]
    fn test_missing_boundary_yields_empty_section_only_for_that_commodity() {
        let mut rows = preamble();
        rows.push(row("PLATINUM", None));
        rows.push(row("Plat Vault", None));
        rows.push(row("Registered", Some(10.0)));

        let parsed = parser().parse_rows(&rows, &pgm_layout());
        assert_eq!(parsed[0].facilities.len(), 1);
        assert!(parsed[1].facilities.is_empty());
        assert!(parsed[1].issue.as_deref().unwrap_or("").contains("PALLADIUM"));
    }

    #[test]
    fn test_header_detection_overrides_value_column() {
        let mut rows = preamble();
        rows.push(vec![
            text("DEPOSITORY"),
            text("PREV TOTAL"),
            text("RECEIVED"),
            text("TOTAL TODAY"),
        ]);
        rows.push(vec![text("Acme Vault")]);
        rows.push(vec![text("Registered"), CellValue::Empty, CellValue::Empty, CellValue::Number(80.0)]);

        let layout = SourceLayout::Single {
            commodity: "Gold".to_string(),
        };

        let parsed = parser().parse_rows(&rows, &layout);
        assert_eq!(parsed[0].facilities, vec![Facility::new("Acme Vault", 80.0, 0.0)]);

        // 关闭探测时仍读取第 7 列 → 整节异常
        let fixed = ReportParser::with_context(ClassifyContext::default(), false);
        let parsed = fixed.parse_rows(&rows, &layout);
        assert!(parsed[0].facilities.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let layout = SourceLayout::Single {
            commodity: "Gold".to_string(),
        };
        let result = parser().parse_file(Path::new("no_such_dir/Gold_Stocks.xls"), &layout);
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
