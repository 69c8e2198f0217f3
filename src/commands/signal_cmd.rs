use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::price::{TimeSeries, Timeframe};
use crate::models::settings::AppSettings;
use crate::models::signal::StockSignalReport;
use crate::services::indicator_series;
use crate::services::providers::{fetch_daily_any, PriceHistoryProvider};
use crate::services::signal_evaluator::SignalEvaluator;
use crate::services::theme_registry::normalize_code;
use crate::services::twse_history::TwseHistoryClient;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRequest {
    pub code: String,
}

/// 个股讯号：日/周 KD 黄金交叉、站上 MA20、分形支撑压力
pub async fn get_stock_signals(state: &AppState, request: SignalRequest) -> std::result::Result<StockSignalReport, String> {
    let client = TwseHistoryClient::new(&state.settings).map_err(|e| e.to_string())?;
    stock_signals(&state.settings, &client, &request.code)
        .await
        .map_err(|e| e.to_string())
}

pub async fn stock_signals<P: PriceHistoryProvider>(
    settings: &AppSettings,
    provider: &P,
    code: &str,
) -> Result<StockSignalReport> {
    let code = normalize_code(code).ok_or_else(|| AppError::InvalidInput(format!("股票代码格式错误: {}", code)))?;
    let history = fetch_daily_any(provider, &code).await?;

    let series = TimeSeries::from_unsorted(code.as_str(), Timeframe::Daily, history.points);
    let indicators = indicator_series::build_with(&series, settings.indicator);
    let report = SignalEvaluator::new(settings.fractal_window).evaluate_latest(&indicators)?;

    Ok(StockSignalReport {
        code,
        name: history.name,
        exchange: history.exchange,
        daily_bars: series.len(),
        report,
    })
}
