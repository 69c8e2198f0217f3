use serde::{Deserialize, Serialize};

use crate::models::fibonacci::FibonacciReport;
use crate::services::fibonacci;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FibonacciRequest {
    pub high: f64,
    pub low: f64,
}

/// 斐波那契计算器
pub fn calculate_fibonacci(request: FibonacciRequest) -> Result<FibonacciReport, String> {
    fibonacci::report(request.high, request.low).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_fibonacci() {
        let report = calculate_fibonacci(FibonacciRequest { high: 100.0, low: 50.0 }).unwrap();
        assert_eq!(report.retracements.len(), 4);

        let err = calculate_fibonacci(FibonacciRequest { high: 50.0, low: 100.0 }).unwrap_err();
        assert!(err.contains("区间无效"));
    }
}
