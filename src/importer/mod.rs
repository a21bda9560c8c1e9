// ==========================================
// 仓单库存同步系统 - 导入层
// ==========================================
// 职责: 交易所库存日报 → 品种分节（仓库明细 + 日期）
// 支持: Excel (.xls/.xlsx), CSV
// ==========================================

pub mod error;
pub mod sheet_reader;
pub mod report_parser;
pub mod row_classifier;
pub mod section_parser;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use sheet_reader::{CsvSheetReader, ExcelSheetReader, SheetReader, SheetRows, UniversalSheetReader};
pub use report_parser::ReportParser;
pub use row_classifier::{classify, detect_value_column, ClassifyContext};
pub use section_parser::{parse_section, scan_dates, ParsedSection, ReportDates};
