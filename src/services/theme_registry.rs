use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::theme::{ThemeDefinition, ThemeMember, ThemeSummary};

/// 供应链分段：新格式与旧格式（中文键）
const STAGES: [&str; 3] = ["upstream", "midstream", "downstream"];
const LEGACY_STAGES: [&str; 3] = ["上游", "中游", "下游"];
const LEGACY_LIST_KEY: &str = "族群清單";
const LEGACY_COMPANY_KEY: &str = "代表公司";

/// 「南亞 (1303)」这类字串中的股票代码
fn company_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[(（]\s*([0-9]{4,6}[A-Z]?)\s*[)）]").expect("valid regex"))
}

/// 统一股票代码：去空白、去 .TW/.TWO 后缀、不足 4 码的数字补零。
/// 只接受 4~6 码、以数字开头的代码；其余（附注文字、美股等）返回 `None`
pub fn normalize_code(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    let stripped = upper
        .strip_suffix(".TWO")
        .or_else(|| upper.strip_suffix(".TW"))
        .unwrap_or(&upper)
        .trim();

    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    if !stripped.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let code = if stripped.len() < 4 && stripped.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>4}", stripped)
    } else {
        stripped.to_string()
    };

    if (4..=6).contains(&code.len()) {
        Some(code)
    } else {
        None
    }
}

/// 族群成分表：代码 → 所属族群集合。启动时建好后只读
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: Vec<ThemeDefinition>,
    by_code: HashMap<String, BTreeSet<String>>,
}

impl ThemeRegistry {
    /// 由族群定义建立。代码统一格式、同族群内去重；同名族群合并
    pub fn new(definitions: Vec<ThemeDefinition>) -> Self {
        let mut themes: Vec<ThemeDefinition> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut seen: Vec<HashSet<String>> = Vec::new();

        for def in definitions {
            let name = def.name.trim().to_string();
            if name.is_empty() {
                log::warn!("略过未命名的族群（{} 档成分股）", def.members.len());
                continue;
            }

            let slot = *index.entry(name.clone()).or_insert_with(|| {
                themes.push(ThemeDefinition {
                    name: name.clone(),
                    description: def.description.clone(),
                    members: Vec::new(),
                });
                seen.push(HashSet::new());
                themes.len() - 1
            });

            if themes[slot].description.is_empty() {
                themes[slot].description = def.description.clone();
            }

            for member in def.members {
                let Some(code) = normalize_code(&member.code) else {
                    continue;
                };
                if seen[slot].insert(code.clone()) {
                    themes[slot].members.push(ThemeMember { code, ..member });
                }
            }
        }

        let mut by_code: HashMap<String, BTreeSet<String>> = HashMap::new();
        for theme in &themes {
            for member in &theme.members {
                by_code
                    .entry(member.code.clone())
                    .or_default()
                    .insert(theme.name.clone());
            }
        }

        Self { themes, by_code }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::ThemeTable(format!("读取 {} 失败: {}", path.display(), e)))?;
        let registry = Self::from_json_str(&content)?;
        log::info!(
            "族群表载入完成: {} 个族群，{} 档股票（{}）",
            registry.len(),
            registry.by_code.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| AppError::ThemeTable(format!("JSON 解析失败: {}", e)))?;
        Self::from_value(&value)
    }

    /// 支援四种族群表格式：
    /// 1. `{"themes": [{"theme", "description", "stocks": [{"ticker", "name", "intro"}]}]}`
    /// 2. `{"popular_sectors": [{"sector_name", "description", "stocks" | "upstream"/"midstream"/"downstream"}]}`
    /// 3. 直接以阵列列出族群物件
    /// 4. 旧格式 `{"族群清單": [{"族群名稱", "上游": {"代表公司": ["南亞 (1303)"]}}]}`
    pub fn from_value(value: &Value) -> Result<Self> {
        let sectors = match value {
            Value::Array(items) => items,
            Value::Object(obj) => ["themes", "popular_sectors", LEGACY_LIST_KEY]
                .iter()
                .find_map(|key| obj.get(*key).and_then(|v| v.as_array()))
                .ok_or_else(|| {
                    AppError::ThemeTable("找不到 themes / popular_sectors / 族群清單 栏位".to_string())
                })?,
            _ => return Err(AppError::ThemeTable("族群表必须是物件或阵列".to_string())),
        };

        let definitions = sectors.iter().filter_map(parse_sector).collect();
        Ok(Self::new(definitions))
    }

    /// 查询代码所属族群。6 码衍生性商品先以完整代码比对，查无再以前 4 码（标的）比对
    pub fn themes_for(&self, code: &str) -> BTreeSet<String> {
        let Some(code) = normalize_code(code) else {
            return BTreeSet::new();
        };

        if let Some(themes) = self.by_code.get(&code) {
            return themes.clone();
        }
        if code.len() == 6 {
            if let Some(themes) = self.by_code.get(&code[..4]) {
                return themes.clone();
            }
        }
        BTreeSet::new()
    }

    pub fn theme(&self, name: &str) -> Option<&ThemeDefinition> {
        self.themes.iter().find(|t| t.name == name)
    }

    pub fn themes(&self) -> &[ThemeDefinition] {
        &self.themes
    }

    pub fn theme_summaries(&self) -> Vec<ThemeSummary> {
        self.themes
            .iter()
            .map(|t| ThemeSummary {
                theme_name: t.name.clone(),
                description: t.description.clone(),
                stock_count: t.members.len(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

fn str_field<'a>(obj: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
        .unwrap_or("")
}

fn parse_sector(sector: &Value) -> Option<ThemeDefinition> {
    if !sector.is_object() {
        return None;
    }
    let name = str_field(sector, &["sector_name", "theme", "族群名稱", "name"]).to_string();
    let description = str_field(sector, &["description", "intro"]).to_string();

    let mut members = Vec::new();
    if let Some(stocks) = sector.get("stocks").and_then(|v| v.as_array()) {
        members.extend(stocks.iter().filter_map(parse_stock));
    } else {
        for stage in STAGES {
            let categories = sector.get(stage).and_then(|v| v.as_array());
            for category in categories.into_iter().flatten() {
                let stocks = category.get("stocks").and_then(|v| v.as_array());
                members.extend(stocks.into_iter().flatten().filter_map(parse_stock));
            }
        }
        for stage in LEGACY_STAGES {
            let companies = sector
                .get(stage)
                .and_then(|s| s.get(LEGACY_COMPANY_KEY))
                .and_then(|v| v.as_array());
            members.extend(
                companies
                    .into_iter()
                    .flatten()
                    .filter_map(|c| c.as_str())
                    .flat_map(parse_company_text),
            );
        }
    }

    Some(ThemeDefinition {
        name,
        description,
        members,
    })
}

fn parse_stock(stock: &Value) -> Option<ThemeMember> {
    match stock {
        Value::String(text) => {
            if let Some(code) = normalize_code(text) {
                return Some(ThemeMember {
                    code,
                    name: String::new(),
                    description: String::new(),
                });
            }
            parse_company_text(text).into_iter().next()
        }
        Value::Object(_) => {
            let code = match stock.get("ticker").or_else(|| stock.get("code")) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return None,
            };
            Some(ThemeMember {
                code: normalize_code(&code)?,
                name: str_field(stock, &["name"]).to_string(),
                description: str_field(stock, &["description", "intro"]).to_string(),
            })
        }
        _ => None,
    }
}

/// 「台積電 (2330)」→ 成分股；「英偉達 NVIDIA(美股)」没有台股代码，返回空
fn parse_company_text(text: &str) -> Vec<ThemeMember> {
    company_code_re()
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let name = text[..whole.start()].trim().to_string();
            Some(ThemeMember {
                code: normalize_code(cap.get(1)?.as_str())?,
                name,
                description: String::new(),
            })
        })
        .collect()
}

/// 进程共用的族群表。读取端拿到的是完整快照，重新载入时整份替换
#[derive(Debug, Clone)]
pub struct SharedThemeRegistry {
    inner: Arc<RwLock<Arc<ThemeRegistry>>>,
}

impl SharedThemeRegistry {
    pub fn new(registry: ThemeRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    pub fn snapshot(&self) -> Arc<ThemeRegistry> {
        self.inner.read().clone()
    }

    /// 换上新的族群表，返回旧表；已取得旧快照的分析不受影响
    pub fn replace(&self, registry: ThemeRegistry) -> Arc<ThemeRegistry> {
        let next = Arc::new(registry);
        std::mem::replace(&mut *self.inner.write(), next)
    }

    /// 从档案重新载入；失败时保留原表
    pub fn reload_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let registry = ThemeRegistry::from_file(path)?;
        self.replace(registry);
        Ok(())
    }
}
