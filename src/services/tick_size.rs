use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// 价格修正方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickDirection {
    /// 支撑、回撤位：向下取到合法价位
    #[serde(rename = "round_down")]
    RoundDown,
    /// 压力、扩展位：向上取到合法价位
    #[serde(rename = "round_up")]
    RoundUp,
    /// 显示、比较用：取最接近的合法价位
    #[serde(rename = "nearest")]
    Nearest,
}

/// 台股升降单位：(价格上界, 跳动单位)，单位以 0.01 元计
const TICK_TABLE: [(f64, i64); 5] = [
    (10.0, 1),
    (50.0, 5),
    (100.0, 10),
    (500.0, 50),
    (1000.0, 100),
];
const TOP_TICK_CENTS: i64 = 500;

/// 浮点误差容忍度（以跳动单位计），落在格点附近视为已在格点上
const GRID_EPSILON: f64 = 1e-6;

fn tick_cents(price: f64) -> i64 {
    TICK_TABLE
        .iter()
        .find(|(upper, _)| price < *upper)
        .map(|(_, tick)| *tick)
        .unwrap_or(TOP_TICK_CENTS)
}

/// 该价格所在区间的升降单位（元）
pub fn tick_size(price: f64) -> f64 {
    tick_cents(price) as f64 / 100.0
}

/// 把价格修正到交易所允许的价位
///
/// 运算以「跳动单位的倍数」进行，已在格点上的价格原样返回，因此对同一方向重复修正结果不变。
/// 向下修正不会低于一个跳动单位。
pub fn normalize(price: f64, direction: TickDirection) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::InvalidPrice(price));
    }

    let tick = tick_cents(price) as f64;
    let steps = price * 100.0 / tick;
    let snapped = steps.round();

    let units = if (steps - snapped).abs() < GRID_EPSILON {
        snapped
    } else {
        match direction {
            TickDirection::RoundDown => steps.floor(),
            TickDirection::RoundUp => steps.ceil(),
            TickDirection::Nearest => snapped,
        }
    };

    Ok(units.max(1.0) * tick / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TickDirection; 3] = [
        TickDirection::RoundDown,
        TickDirection::RoundUp,
        TickDirection::Nearest,
    ];

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tick_table_bands() {
        assert!(approx(tick_size(9.99), 0.01));
        assert!(approx(tick_size(10.0), 0.05));
        assert!(approx(tick_size(49.95), 0.05));
        assert!(approx(tick_size(50.0), 0.1));
        assert!(approx(tick_size(100.0), 0.5));
        assert!(approx(tick_size(500.0), 1.0));
        assert!(approx(tick_size(999.0), 1.0));
        assert!(approx(tick_size(1000.0), 5.0));
        assert!(approx(tick_size(2500.0), 5.0));
    }

    #[test]
    fn test_rejects_non_positive() {
        for direction in ALL {
            assert_eq!(normalize(0.0, direction), Err(AppError::InvalidPrice(0.0)));
            assert!(normalize(-3.5, direction).is_err());
            assert!(normalize(f64::NAN, direction).is_err());
        }
    }

    #[test]
    fn test_directions() {
        assert!(approx(normalize(69.13, TickDirection::RoundDown).unwrap(), 69.1));
        assert!(approx(normalize(69.13, TickDirection::RoundUp).unwrap(), 69.2));
        assert!(approx(normalize(69.13, TickDirection::Nearest).unwrap(), 69.1));
        assert!(approx(normalize(130.9, TickDirection::RoundUp).unwrap(), 131.0));
        assert!(approx(normalize(130.9, TickDirection::RoundDown).unwrap(), 130.5));
        assert!(approx(normalize(1234.0, TickDirection::RoundUp).unwrap(), 1235.0));
        assert!(approx(normalize(1234.0, TickDirection::Nearest).unwrap(), 1235.0));
        assert!(approx(normalize(12.34, TickDirection::RoundDown).unwrap(), 12.3));
    }

    #[test]
    fn test_on_grid_price_unchanged() {
        for direction in ALL {
            assert!(approx(normalize(69.1, direction).unwrap(), 69.1));
            assert!(approx(normalize(580.0, direction).unwrap(), 580.0));
            assert!(approx(normalize(12.35, direction).unwrap(), 12.35));
        }
    }

    #[test]
    fn test_round_up_across_band_boundary() {
        assert!(approx(normalize(9.995, TickDirection::RoundUp).unwrap(), 10.0));
        assert!(approx(normalize(99.95, TickDirection::RoundUp).unwrap(), 100.0));
        assert!(approx(normalize(999.5, TickDirection::RoundUp).unwrap(), 1000.0));
    }

    #[test]
    fn test_round_down_never_reaches_zero() {
        assert!(approx(normalize(0.004, TickDirection::RoundDown).unwrap(), 0.01));
    }

    #[test]
    fn test_idempotent_over_price_grid() {
        let mut price = 0.013;
        while price < 3000.0 {
            for direction in ALL {
                let once = normalize(price, direction).unwrap();
                let twice = normalize(once, direction).unwrap();
                assert_eq!(once, twice, "price={} direction={:?}", price, direction);
            }
            price = price * 1.0137 + 0.0071;
        }
    }
}
