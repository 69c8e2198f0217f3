use chrono::Datelike;

use crate::models::indicator::{IndicatorParams, IndicatorSet, SeriesIndicators};
use crate::models::price::{PricePoint, TimeSeries, Timeframe};

pub const MA_PERIOD: usize = 20;

/// 由日线算出日线、周线两组指标（KD 9/3，MA20）
pub fn build(daily: &TimeSeries) -> SeriesIndicators {
    build_with(daily, IndicatorParams::default())
}

pub fn build_with(daily: &TimeSeries, params: IndicatorParams) -> SeriesIndicators {
    let weekly_points = resample_weekly(daily.points());
    log::debug!(
        "{} 日线 {} 根，周线 {} 根",
        daily.code(),
        daily.len(),
        weekly_points.len()
    );

    SeriesIndicators {
        daily: compute_indicators(Timeframe::Daily, daily.points().to_vec(), params),
        weekly: compute_indicators(Timeframe::Weekly, weekly_points, params),
    }
}

/// 日线按 ISO 周合并为周线。本周尚未结束时以目前已有的日线组成（截至当下）
///
/// 周线日期取该周最后一个交易日。
pub fn resample_weekly(daily: &[PricePoint]) -> Vec<PricePoint> {
    let mut weeks: Vec<PricePoint> = Vec::new();
    let mut current_week = None;

    for bar in daily {
        let iso = bar.date.iso_week();
        let key = (iso.year(), iso.week());

        match weeks.last_mut() {
            Some(week) if current_week == Some(key) => {
                week.date = bar.date;
                week.high = week.high.max(bar.high);
                week.low = week.low.min(bar.low);
                week.close = bar.close;
                week.volume += bar.volume;
            }
            _ => {
                weeks.push(bar.clone());
                current_week = Some(key);
            }
        }
    }
    weeks
}

/// 计算单一周期的 MA20 与 KDJ
pub fn compute_indicators(timeframe: Timeframe, points: Vec<PricePoint>, params: IndicatorParams) -> IndicatorSet {
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let highs: Vec<f64> = points.iter().map(|p| p.high).collect();
    let lows: Vec<f64> = points.iter().map(|p| p.low).collect();

    let ma20 = calc_ma(&closes, MA_PERIOD);
    let (k, d, j) = calc_kdj(&highs, &lows, &closes, params.rsv_period, params.d_period);

    IndicatorSet {
        timeframe,
        points,
        ma20,
        k,
        d,
        j,
    }
}

// ====== 指标计算函数 ======

pub fn calc_ma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period { return result; }

    let mut sum: f64 = data[..period].iter().sum();
    result[period - 1] = Some(sum / period as f64);

    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result[i] = Some(sum / period as f64);
    }
    result
}

/// 未成熟随机值 RSV。区间最高等于最低时定义为 50
pub fn calc_rsv(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let len = closes.len();
    let mut rsv = vec![None; len];
    if period == 0 || len < period { return rsv; }

    for i in (period - 1)..len {
        let start = i + 1 - period;
        let highest = highs[start..=i].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lowest = lows[start..=i].iter().cloned().fold(f64::INFINITY, f64::min);

        rsv[i] = Some(if (highest - lowest).abs() < 1e-10 {
            50.0
        } else {
            (closes[i] - lowest) / (highest - lowest) * 100.0
        });
    }
    rsv
}

/// 对可能缺值的序列取简单移动平均，窗口内任一缺值则结果缺值
fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 { return result; }

    for i in (period.saturating_sub(1))..values.len() {
        let window = &values[i + 1 - period..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        result[i] = sum.map(|s| s / period as f64);
    }
    result
}

/// %K = RSV，%D = %K 的简单移动平均，%J = 3K - 2D
pub fn calc_kdj(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    rsv_period: usize,
    d_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let k = calc_rsv(highs, lows, closes, rsv_period);
    let d = rolling_mean(&k, d_period);
    let j = k
        .iter()
        .zip(&d)
        .map(|(k, d)| match (k, d) {
            (Some(k), Some(d)) => Some(3.0 * k - 2.0 * d),
            _ => None,
        })
        .collect();
    (k, d, j)
}
