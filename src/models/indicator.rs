use serde::{Deserialize, Serialize};

use super::price::{PricePoint, Timeframe};

/// KD 参数，默认 9/3
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_rsv_period")]
    pub rsv_period: usize,
    #[serde(default = "default_d_period")]
    pub d_period: usize,
}

fn default_rsv_period() -> usize { 9 }
fn default_d_period() -> usize { 3 }

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsv_period: default_rsv_period(),
            d_period: default_d_period(),
        }
    }
}

/// 与K线逐根对齐的指标序列，`None` 表示历史长度不足、尚未算出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub timeframe: Timeframe,
    pub points: Vec<PricePoint>,
    pub ma20: Vec<Option<f64>>,
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
    pub j: Vec<Option<f64>>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }
}

/// 日线与由日线重采样出的周线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesIndicators {
    pub daily: IndicatorSet,
    pub weekly: IndicatorSet,
}
