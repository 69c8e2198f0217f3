use crate::error::{AppError, Result};
use crate::models::indicator::{IndicatorSet, SeriesIndicators};
use crate::models::price::PricePoint;
use crate::models::signal::{LevelRank, Signal, SignalReport, SupportResistanceLevel};
use crate::services::tick_size::{normalize, TickDirection};

/// 分形左右各比较几根K棒
pub const DEFAULT_FRACTAL_WINDOW: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct SignalEvaluator {
    fractal_window: usize,
}

impl Default for SignalEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FRACTAL_WINDOW)
    }
}

impl SignalEvaluator {
    pub fn new(fractal_window: usize) -> Self {
        Self {
            fractal_window: fractal_window.max(1),
        }
    }

    /// 以指定参考价计算日/周讯号与分形支撑压力
    pub fn evaluate(&self, daily: &IndicatorSet, weekly: &IndicatorSet, reference_close: f64) -> Result<SignalReport> {
        if !reference_close.is_finite() || reference_close <= 0.0 {
            return Err(AppError::InvalidPrice(reference_close));
        }

        Ok(SignalReport {
            reference_close,
            daily: timeframe_signal(daily),
            weekly: timeframe_signal(weekly),
            levels: support_resistance(&daily.points, self.fractal_window, reference_close),
        })
    }

    /// 以最新日线收盘价为参考价
    pub fn evaluate_latest(&self, indicators: &SeriesIndicators) -> Result<SignalReport> {
        let reference = indicators
            .daily
            .latest_close()
            .ok_or_else(|| AppError::DataUnavailable("没有任何日线资料".to_string()))?;
        self.evaluate(&indicators.daily, &indicators.weekly, reference)
    }
}

/// 最新一根K棒上的讯号
pub fn timeframe_signal(set: &IndicatorSet) -> Signal {
    let n = set.len();
    let last = n.checked_sub(1);
    let at = |series: &[Option<f64>], i: Option<usize>| i.and_then(|i| series.get(i).copied().flatten());

    let (k, d, j, ma20) = (at(&set.k, last), at(&set.d, last), at(&set.j, last), at(&set.ma20, last));
    let prev = n.checked_sub(2);
    let golden_cross = match (at(&set.k, prev), at(&set.d, prev), k, d) {
        (Some(pk), Some(pd), Some(k), Some(d)) => Some(pk <= pd && k > d),
        _ => None,
    };

    let close = set.latest_close();
    let above_ma20 = match (close, ma20) {
        (Some(c), Some(ma)) => Some(c > ma),
        _ => None,
    };

    Signal {
        timeframe: set.timeframe,
        golden_cross,
        above_ma20,
        close,
        k,
        d,
        j,
        ma20,
    }
}

/// 分形高点、低点：(索引, 价格)
pub fn fractal_pivots(points: &[PricePoint], window: usize) -> (Vec<(usize, f64)>, Vec<(usize, f64)>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    if window == 0 || points.len() < 2 * window + 1 {
        return (highs, lows);
    }

    for i in window..points.len() - window {
        let neighbors = (i - window..=i + window).filter(|&j| j != i);
        let current = &points[i];

        if neighbors.clone().all(|j| points[j].high < current.high) {
            highs.push((i, current.high));
        }
        if neighbors.clone().all(|j| points[j].low > current.low) {
            lows.push((i, current.low));
        }
    }
    (highs, lows)
}

/// 参考价同侧最近的分形点，由新到旧取价格不重复的前 `count` 个（价格先做跳动修正）
fn recent_distinct(
    pivots: &[(usize, f64)],
    count: usize,
    keep: impl Fn(f64) -> bool,
    direction: TickDirection,
) -> Vec<f64> {
    let mut prices: Vec<f64> = Vec::with_capacity(count);
    for (_, price) in pivots.iter().rev() {
        if prices.len() == count {
            break;
        }
        if !keep(*price) {
            continue;
        }
        let Ok(level) = normalize(*price, direction) else {
            continue;
        };
        if keep(level) && !prices.contains(&level) {
            prices.push(level);
        }
    }
    prices
}

/// 取参考价上方最近三个分形高点（R1<R2<R3）与下方最近三个分形低点（S1>S2>S3）。
/// 「最近」指日期，选定后再依与参考价的距离排名
pub fn support_resistance(points: &[PricePoint], window: usize, reference_close: f64) -> Vec<SupportResistanceLevel> {
    let (pivot_highs, pivot_lows) = fractal_pivots(points, window);

    let mut resistances = recent_distinct(&pivot_highs, 3, |p| p > reference_close, TickDirection::RoundUp);
    resistances.sort_by(|a, b| a.total_cmp(b));

    let mut supports = recent_distinct(&pivot_lows, 3, |p| p < reference_close, TickDirection::RoundDown);
    supports.sort_by(|a, b| b.total_cmp(a));

    let ranked = |ranks: [LevelRank; 3], prices: &[f64]| {
        ranks
            .into_iter()
            .enumerate()
            .map(|(i, rank)| SupportResistanceLevel {
                rank,
                price: prices.get(i).copied(),
            })
            .collect::<Vec<_>>()
    };

    let mut levels = ranked(LevelRank::RESISTANCES, &resistances);
    levels.extend(ranked(LevelRank::SUPPORTS, &supports));
    levels
}
