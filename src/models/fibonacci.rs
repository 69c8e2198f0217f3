use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FibRole {
    /// 回撤，落在高低点之间，视为支撑
    #[serde(rename = "retracement")]
    Retracement,
    /// 扩展，落在高点之上，视为压力
    #[serde(rename = "extension")]
    Extension,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub role: FibRole,
    pub raw_price: f64,
    pub corrected_price: f64,
}

/// 斐波那契计算器输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciReport {
    pub high: f64,
    pub low: f64,
    pub range: f64,
    pub retracements: Vec<FibonacciLevel>,
    pub extensions: Vec<FibonacciLevel>,
}
