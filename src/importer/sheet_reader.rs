// ==========================================
// 仓单库存同步系统 - 报表表格读取
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 按行的 CellValue 网格（列号为绝对列号）
// ==========================================

use crate::domain::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 一张表的原始行
pub type SheetRows = Vec<Vec<CellValue>>;

// ==========================================
// SheetReader Trait
// ==========================================
// 用途: 报表读取接口（解析前的唯一 I/O 环节）
// 实现者: ExcelSheetReader, CsvSheetReader, UniversalSheetReader
pub trait SheetReader: Send + Sync {
    /// 读取文件第一张表的全部行
    ///
    /// # 返回
    /// - Ok(SheetRows): 行列表（保留空行，保证行号与源文件一致）
    /// - Err: 文件缺失 / 格式不支持 / 解析失败
    fn read_rows(&self, file_path: &Path) -> ImportResult<SheetRows>;
}

/// 检查文件存在
fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Reader 实现
// ==========================================
pub struct CsvSheetReader;

impl CsvSheetReader {
    /// 文本单元格类型推断: 空白 → Empty, 数值 → Number, 其余 → Text
    fn to_cell(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        let numeric: String = trimmed.chars().filter(|c| *c != ',').collect();
        match numeric.parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            _ => CellValue::Text(raw.to_string()),
        }
    }
}

impl SheetReader for CsvSheetReader {
    fn read_rows(&self, file_path: &Path) -> ImportResult<SheetRows> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 无表头、允许行长度不一致
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(Self::to_cell).collect());
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Reader 实现
// ==========================================
pub struct ExcelSheetReader;

impl ExcelSheetReader {
    fn to_cell(data: &Data) -> CellValue {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::from_raw_text(s),
            other => CellValue::from_raw_text(&other.to_string()),
        }
    }
}

impl SheetReader for ExcelSheetReader {
    fn read_rows(&self, file_path: &Path) -> ImportResult<SheetRows> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // calamine 的 Range 从首个非空单元格开始，这里补回前导空行/空列，
        // 保证固定数值列的列号与源文件一致
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: SheetRows = vec![Vec::new(); row_offset];
        for data_row in range.rows() {
            let mut cells = vec![CellValue::Empty; col_offset];
            cells.extend(data_row.iter().map(Self::to_cell));
            rows.push(cells);
        }

        tracing::debug!(
            sheet = %sheet_name,
            rows = rows.len(),
            row_offset,
            col_offset,
            "Excel 工作表读取完成"
        );

        Ok(rows)
    }
}

// ==========================================
// 通用读取器（根据扩展名自动选择）
// ==========================================
pub struct UniversalSheetReader;

impl SheetReader for UniversalSheetReader {
    fn read_rows(&self, file_path: &Path) -> ImportResult<SheetRows> {
        ensure_exists(file_path)?;

        match extension_of(file_path).as_str() {
            "csv" => CsvSheetReader.read_rows(file_path),
            "xlsx" | "xls" => ExcelSheetReader.read_rows(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_reader_types_cells() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Acme Vault,,,,,,,").unwrap();
        writeln!(temp_file, "Registered,,,,,,,\"1,080\"").unwrap();
        writeln!(temp_file, ",,,,,,,").unwrap();

        let rows = CsvSheetReader.read_rows(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], CellValue::Text("Acme Vault".to_string()));
        assert_eq!(rows[0][1], CellValue::Empty);
        assert_eq!(rows[1][7], CellValue::Number(1080.0));
        assert!(rows[2].iter().all(|c| c.is_blank()));
    }

    #[test]
    fn test_csv_reader_keeps_dates_as_text() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Report Date: 1/26/2026,nan").unwrap();

        let rows = CsvSheetReader.read_rows(temp_file.path()).unwrap();
        assert_eq!(
            rows[0][0],
            CellValue::Text("Report Date: 1/26/2026".to_string())
        );
        assert_eq!(rows[0][1], CellValue::Text("nan".to_string()));
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let result = UniversalSheetReader.read_rows(Path::new("non_existent_stocks.xls"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalSheetReader.read_rows(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
