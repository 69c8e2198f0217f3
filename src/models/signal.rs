use serde::{Deserialize, Serialize};

use super::price::{Exchange, Timeframe};

/// 单一周期的讯号。布尔值为 `None` 代表资料不足、无法判断，与 `false` 不同
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timeframe: Timeframe,
    pub golden_cross: Option<bool>,
    pub above_ma20: Option<bool>,
    pub close: Option<f64>,
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
    pub ma20: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelRank {
    #[serde(rename = "r1")]
    R1,
    #[serde(rename = "r2")]
    R2,
    #[serde(rename = "r3")]
    R3,
    #[serde(rename = "s1")]
    S1,
    #[serde(rename = "s2")]
    S2,
    #[serde(rename = "s3")]
    S3,
}

impl LevelRank {
    pub const RESISTANCES: [LevelRank; 3] = [LevelRank::R1, LevelRank::R2, LevelRank::R3];
    pub const SUPPORTS: [LevelRank; 3] = [LevelRank::S1, LevelRank::S2, LevelRank::S3];
}

/// 压力/支撑位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistanceLevel {
    pub rank: LevelRank,
    pub price: Option<f64>,
}

/// 日线、周线讯号加上六档分形支撑压力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub reference_close: f64,
    pub daily: Signal,
    pub weekly: Signal,
    /// 固定顺序 R1, R2, R3, S1, S2, S3
    pub levels: Vec<SupportResistanceLevel>,
}

impl SignalReport {
    pub fn level(&self, rank: LevelRank) -> Option<f64> {
        self.levels.iter().find(|l| l.rank == rank).and_then(|l| l.price)
    }
}

/// 个股讯号查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSignalReport {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exchange: Exchange,
    pub daily_bars: usize,
    #[serde(flatten)]
    pub report: SignalReport,
}
