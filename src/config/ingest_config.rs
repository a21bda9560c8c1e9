// ==========================================
// 仓单库存同步系统 - 同步配置
// ==========================================
// 职责: 源文件映射 / 报表版式 / 输出路径 / 数值列
// 来源: JSON 配置文件（可选）+ 环境变量覆写，缺省字段取默认值
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::importer::row_classifier::{ClassifyContext, DEFAULT_SECTION_TOKENS, DEFAULT_VALUE_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 环境变量键
pub mod env_keys {
    pub const DB_PATH: &str = "WAREHOUSE_STOCKS_DB_PATH";
    pub const DATA_DIR: &str = "WAREHOUSE_STOCKS_DATA_DIR";
    pub const DOCUMENT_PATH: &str = "WAREHOUSE_STOCKS_DOCUMENT_PATH";
}

// ==========================================
// 报表版式
// ==========================================

/// 合并报表中的一个品种分节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// 分节行文字（忽略大小写完全匹配）
    pub token: String,
    /// 输出品种键
    pub commodity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum SourceLayout {
    /// 单品种报表: 整张表为一个分节
    Single { commodity: String },
    /// 合并报表: 多个品种按分节行切分
    Combined { sections: Vec<SectionSpec> },
}

impl SourceLayout {
    /// 本报表产出的品种键
    pub fn commodities(&self) -> Vec<&str> {
        match self {
            SourceLayout::Single { commodity } => vec![commodity.as_str()],
            SourceLayout::Combined { sections } => {
                sections.iter().map(|s| s.commodity.as_str()).collect()
            }
        }
    }
}

/// 一个源文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// 相对 data_dir 的文件名
    pub file: String,
    #[serde(flatten)]
    pub layout: SourceLayout,
}

/// 组合品种（两个品种视为一个整体）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub key: String,
    pub members: Vec<String>,
    /// 是否写入快照表（默认否: 避免与成员品种重复计数）
    #[serde(default)]
    pub persist: bool,
}

// ==========================================
// IngestConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
    pub document_path: PathBuf,
    pub db_path: String,
    pub source_name: String,
    pub category_value_column: usize,
    pub detect_value_column: bool,
    pub sources: Vec<SourceSpec>,
    pub composites: Vec<CompositeSpec>,
    pub extra_section_tokens: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            document_path: PathBuf::from("./public/data.json"),
            db_path: get_default_db_path(),
            source_name: "CME Group".to_string(),
            category_value_column: DEFAULT_VALUE_COLUMN,
            detect_value_column: true,
            sources: default_sources(),
            composites: vec![CompositeSpec {
                key: "Platinum_Palladium".to_string(),
                members: vec!["Platinum".to_string(), "Palladium".to_string()],
                persist: false,
            }],
            extra_section_tokens: Vec::new(),
        }
    }
}

fn single(file: &str, commodity: &str) -> SourceSpec {
    SourceSpec {
        file: file.to_string(),
        layout: SourceLayout::Single {
            commodity: commodity.to_string(),
        },
    }
}

/// 交易所日报的默认文件映射
fn default_sources() -> Vec<SourceSpec> {
    vec![
        single("Gold_Stocks.xls", "Gold"),
        single("Silver_stocks.xls", "Silver"),
        single("Copper_Stocks.xls", "Copper"),
        SourceSpec {
            file: "PA-PL_Stck_Rprt.xls".to_string(),
            layout: SourceLayout::Combined {
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
            },
        },
        single("Aluminum_Stocks.xls", "Aluminum"),
        single("Zinc_Stocks.xls", "Zinc"),
        single("Lead_Stocks.xls", "Lead"),
    ]
}

impl IngestConfig {
    /// 加载配置
    ///
    /// # 参数
    /// - path: 配置文件路径；None 时使用默认配置
    ///
    /// # 说明
    /// - 读取后依次应用环境变量覆写、校验
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取（缺省字段取默认值）
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 环境变量覆写（空值忽略）
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = non_empty_env(env_keys::DB_PATH) {
            self.db_path = v;
        }
        if let Some(v) = non_empty_env(env_keys::DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty_env(env_keys::DOCUMENT_PATH) {
            self.document_path = PathBuf::from(v);
        }
    }

    /// 配置校验
    ///
    /// # 规则
    /// - 至少一个源文件
    /// - 品种键全局唯一（含组合品种）
    /// - 合并报表至少一个分节，分节文字非空
    /// - 组合品种的成员必须是已配置品种
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sources.is_empty() {
            return Err(invalid("sources", "至少需要配置一个源文件"));
        }
        // .xls 单表最多 256 列
        if self.category_value_column >= 256 {
            return Err(invalid(
                "category_value_column",
                &format!("数值列超出范围: {}", self.category_value_column),
            ));
        }
        if self.db_path.trim().is_empty() {
            return Err(invalid("db_path", "数据库路径为空"));
        }

        let mut keys: HashSet<&str> = HashSet::new();
        for source in &self.sources {
            if let SourceLayout::Combined { sections } = &source.layout {
                if sections.is_empty() {
                    return Err(invalid(
                        "sources",
                        &format!("合并报表 {} 未配置分节", source.file),
                    ));
                }
                if sections.iter().any(|s| s.token.trim().is_empty()) {
                    return Err(invalid(
                        "sources",
                        &format!("合并报表 {} 存在空分节文字", source.file),
                    ));
                }
            }
            for commodity in source.layout.commodities() {
                if !keys.insert(commodity) {
                    return Err(invalid("sources", &format!("品种键重复: {}", commodity)));
                }
            }
        }

        for composite in &self.composites {
            if composite.members.len() < 2 {
                return Err(invalid(
                    "composites",
                    &format!("组合品种 {} 至少需要两个成员", composite.key),
                ));
            }
            if let Some(missing) = composite.members.iter().find(|m| !keys.contains(m.as_str())) {
                return Err(invalid(
                    "composites",
                    &format!("组合品种 {} 的成员 {} 未配置", composite.key, missing),
                ));
            }
            if !keys.insert(composite.key.as_str()) {
                return Err(invalid(
                    "composites",
                    &format!("品种键重复: {}", composite.key),
                ));
            }
        }

        Ok(())
    }

    /// 分类上下文: 默认品种名 + 合并报表分节文字 + 额外配置
    pub fn classify_context(&self) -> ClassifyContext {
        let mut tokens: Vec<String> = DEFAULT_SECTION_TOKENS.iter().map(|t| t.to_string()).collect();
        for source in &self.sources {
            if let SourceLayout::Combined { sections } = &source.layout {
                tokens.extend(sections.iter().map(|s| s.token.clone()));
            }
        }
        tokens.extend(self.extra_section_tokens.iter().cloned());

        let mut ctx = ClassifyContext::new(self.category_value_column, tokens);
        let mut seen = HashSet::new();
        ctx.section_tokens.retain(|t| seen.insert(t.clone()));
        ctx
    }

    /// 源文件绝对路径
    pub fn source_path(&self, source: &SourceSpec) -> PathBuf {
        self.data_dir.join(&source.file)
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 WAREHOUSE_STOCKS_DB_PATH（若设置）
/// - 用户数据目录/warehouse-stocks/warehouse_stocks.db
/// - 回退: ./warehouse_stocks.db
pub fn get_default_db_path() -> String {
    if let Some(path) = non_empty_env(env_keys::DB_PATH) {
        return path;
    }

    let mut path = PathBuf::from("./warehouse_stocks.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("warehouse-stocks");
        // 目录创建失败时保留回退路径
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("warehouse_stocks.db");
        }
    }

    path.to_string_lossy().to_string()
}
