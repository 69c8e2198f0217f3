use serde::{Deserialize, Serialize};

use super::market::{TurnoverRow, WatchListRow};

/// 族群成分股
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeMember {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 族群定义，启动时载入后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub members: Vec<ThemeMember>,
}

/// 单档股票在一次分析批次中的属性。周转率批次填 `turnover_rate`，注意股批次填 `watch_reason`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAttributeRecord {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnover_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
}

impl From<TurnoverRow> for StockAttributeRecord {
    fn from(row: TurnoverRow) -> Self {
        Self {
            code: row.code,
            name: row.name,
            turnover_rate: Some(row.turnover_rate),
            watch_reason: None,
            change_pct: row.change_pct,
            close: row.close,
        }
    }
}

impl From<WatchListRow> for StockAttributeRecord {
    fn from(row: WatchListRow) -> Self {
        Self {
            code: row.code,
            name: row.name,
            turnover_rate: None,
            watch_reason: Some(row.reason),
            change_pct: None,
            close: None,
        }
    }
}

/// 族群热度排行中的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeHeatEntry {
    pub theme_name: String,
    pub matched_count: usize,
    pub average_turnover: Option<f64>,
    #[serde(default)]
    pub average_change_pct: Option<f64>,
    pub members: Vec<StockAttributeRecord>,
}

/// 一次族群热度分析的结果，建好后不再修改
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ranked_entries: Vec<ThemeHeatEntry>,
    pub unclassified: Vec<StockAttributeRecord>,
}

impl AnalysisReport {
    pub fn entry(&self, theme_name: &str) -> Option<&ThemeHeatEntry> {
        self.ranked_entries.iter().find(|e| e.theme_name == theme_name)
    }
}

/// 族群清单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub theme_name: String,
    pub description: String,
    pub stock_count: usize,
}

/// 族群详情：当日出现的成分股 + 族群表中全部成分股
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDetail {
    pub entry: ThemeHeatEntry,
    pub description: String,
    pub all_members: Vec<ThemeMember>,
}

/// 批次摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_records: usize,
    pub classified_themes: usize,
    pub unclassified_count: usize,
    pub average_turnover: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// 取周转率前 N 名，缺省或 null 表示不截断
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub turnover_report: AnalysisReport,
    pub turnover_summary: BatchSummary,
    pub watch_list_report: AnalysisReport,
    pub watch_list_summary: BatchSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeDetailRequest {
    pub theme_name: String,
    #[serde(default)]
    pub records: Vec<StockAttributeRecord>,
}
