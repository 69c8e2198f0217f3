use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// K线周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
}

/// 挂牌市场：上市（证交所）或上柜（柜买中心）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "listed")]
    Listed,
    #[serde(rename = "otc")]
    Otc,
}

impl Exchange {
    pub fn label(&self) -> &'static str {
        match self {
            Exchange::Listed => "上市",
            Exchange::Otc => "上柜",
        }
    }
}

/// 单根K线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// 单一股票、单一周期的K线序列，日期严格递增
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    code: String,
    timeframe: Timeframe,
    points: Vec<PricePoint>,
}

impl TimeSeries {
    /// 按原样接收，日期乱序或重复时拒绝
    pub fn new(code: impl Into<String>, timeframe: Timeframe, points: Vec<PricePoint>) -> Result<Self> {
        let code = code.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AppError::UnorderedSeries(format!(
                    "{} 在 {} 之后出现 {}",
                    code, pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { code, timeframe, points })
    }

    /// 多段拉取合并后使用：按日期排序，同一天保留最后出现的那根
    pub fn from_unsorted(code: impl Into<String>, timeframe: Timeframe, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut merged: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match merged.last_mut() {
                Some(last) if last.date == p.date => *last = p,
                _ => merged.push(p),
            }
        }
        Self {
            code: code.into(),
            timeframe,
            points: merged,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn into_points(self) -> Vec<PricePoint> {
        self.points
    }
}
