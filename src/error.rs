use thiserror::Error as ThisError;

/// 引擎内所有可预期的失败都以值的形式返回，不会让进程退出
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("区间无效: 高点 {high} 必须大于低点 {low}")]
    InvalidRange { high: f64, low: f64 },

    #[error("价格无效: {0}（必须大于 0）")]
    InvalidPrice(f64),

    #[error("找不到股票代码 {0}（上市、上柜均无资料）")]
    TickerNotFound(String),

    #[error("无可用资料: {0}")]
    DataUnavailable(String),

    #[error("K线顺序错误: {0}")]
    UnorderedSeries(String),

    #[error("找不到族群: {0}")]
    ThemeNotFound(String),

    #[error("输入无效: {0}")]
    InvalidInput(String),

    #[error("族群表格式错误: {0}")]
    ThemeTable(String),

    #[error("设定错误: {0}")]
    Config(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("解析错误: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
