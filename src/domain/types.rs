// ==========================================
// 仓单库存同步系统 - 领域类型定义
// ==========================================
// 职责: 原始单元格 / 行分类结果的强类型表示
// 红线: 分类结果只描述"这一行是什么"，不携带累加状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 单元格值 (Cell Value)
// ==========================================
// 电子表格单元格只区分三种形态，其余类型在读取时折叠为文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// 从原始字符串构造（空白 → Empty）
    pub fn from_raw_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// 是否为空（Empty 或纯空白文本）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// 文本形态（Number 不视为文本）
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 读取为库存数量
    ///
    /// # 规则
    /// - Number: 直接使用
    /// - Text: 去除千分位逗号后解析
    /// - 负数 / NaN / 无穷 → None（库存数量必须 ≥ 0）
    pub fn as_quantity(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(v) => *v,
            CellValue::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    return None;
                }
                cleaned.parse::<f64>().ok()?
            }
            CellValue::Empty => return None,
        };

        if value.is_finite() && value >= 0.0 {
            Some(value)
        } else {
            None
        }
    }

    /// 行内拼接用的显示文本（Empty → None）
    pub fn display_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            CellValue::Number(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

// ==========================================
// 类别行种类 (Category Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Registered,     // 注册仓单
    Eligible,       // 合格库存
    TotalOrPledged, // 合计/质押（解析但不取值）
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKind::Registered => write!(f, "REGISTERED"),
            CategoryKind::Eligible => write!(f, "ELIGIBLE"),
            CategoryKind::TotalOrPledged => write!(f, "TOTAL_OR_PLEDGED"),
        }
    }
}

// ==========================================
// 行分类结果 (Row Kind)
// ==========================================
// 红线: 歧义行一律降级为 Noise，宁可丢行也不猜测
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    /// 空行 / 表头 / 说明文字
    Noise,
    /// 品种分节行（已规范为大写品种名）
    SectionBoundary(String),
    /// 类别行；仅 Registered/Eligible 带数值，取自固定列
    CategoryLabel {
        kind: CategoryKind,
        value: Option<f64>,
    },
    /// 仓库/交割库名称
    FacilityName(String),
    /// 汇总行（与仓库级合计重复，丢弃）
    SummaryTotal,
}
