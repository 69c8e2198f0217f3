use crate::error::{AppError, Result};
use crate::models::fibonacci::{FibRole, FibonacciLevel, FibonacciReport};
use crate::services::tick_size::{normalize, TickDirection};

/// 回撤比例（支撑）
pub const RETRACEMENT_RATIOS: [f64; 4] = [0.236, 0.382, 0.5, 0.618];

/// 扩展比例（压力）
pub const EXTENSION_RATIOS: [f64; 5] = [1.382, 1.5, 1.618, 1.786, 2.0];

fn validate(high: f64, low: f64) -> Result<()> {
    for price in [high, low] {
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::InvalidPrice(price));
        }
    }
    if high <= low {
        return Err(AppError::InvalidRange { high, low });
    }
    Ok(())
}

fn level(ratio: f64, role: FibRole, raw_price: f64) -> Result<FibonacciLevel> {
    let direction = match role {
        FibRole::Retracement => TickDirection::RoundDown,
        FibRole::Extension => TickDirection::RoundUp,
    };
    Ok(FibonacciLevel {
        ratio,
        role,
        raw_price,
        corrected_price: normalize(raw_price, direction)?,
    })
}

/// 由高低点算出全部斐波那契价位：先回撤、后扩展，各自依比例由小到大
pub fn levels(high: f64, low: f64) -> Result<Vec<FibonacciLevel>> {
    validate(high, low)?;
    let range = high - low;

    let retracements = RETRACEMENT_RATIOS
        .iter()
        .map(|&r| level(r, FibRole::Retracement, high - r * range));
    let extensions = EXTENSION_RATIOS
        .iter()
        .map(|&r| level(r, FibRole::Extension, high + (r - 1.0) * range));

    retracements.chain(extensions).collect()
}

/// 计算器页面用的完整结果
pub fn report(high: f64, low: f64) -> Result<FibonacciReport> {
    let (retracements, extensions): (Vec<_>, Vec<_>) = levels(high, low)?
        .into_iter()
        .partition(|l| l.role == FibRole::Retracement);

    Ok(FibonacciReport {
        high,
        low,
        range: high - low,
        retracements,
        extensions,
    })
}
