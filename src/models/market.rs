use serde::{Deserialize, Serialize};

/// 周转率排行的一列（来自全市场成交资料或使用者贴上的表格）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverRow {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub turnover_rate: f64,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub change_pct: Option<f64>,
}

/// 注意股公告的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchListRow {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: String,
}
