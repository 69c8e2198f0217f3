use crate::models::theme::{AnalyzeRequest, AnalyzeResponse, ThemeDetail, ThemeDetailRequest, ThemeSummary};
use crate::services::market_turnover::MarketTurnoverClient;
use crate::services::providers::{TurnoverProvider, WatchListProvider};
use crate::services::{theme_analysis, theme_heat};
use crate::AppState;

/// 族群热度分析：周转率与注意股两个批次
pub async fn analyze_themes<T, W>(
    state: &AppState,
    turnover: &T,
    watch_list: &W,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse, String>
where
    T: TurnoverProvider,
    W: WatchListProvider,
{
    let top_n = request.top_n.or(state.settings.default_top_n);
    if top_n == Some(0) {
        return Err("输入无效: top_n 必须大于 0".to_string());
    }

    let (turnover_rows, watch_rows) = tokio::join!(turnover.fetch_turnover(), watch_list.fetch_watch_list());
    let turnover_rows = turnover_rows.map_err(|e| e.to_string())?;
    let watch_rows = watch_rows.map_err(|e| e.to_string())?;

    // 整次分析使用同一份族群表
    let registry = state.registry.snapshot();
    theme_analysis::analyze(turnover_rows, watch_rows, top_n, &registry).map_err(|e| e.to_string())
}

/// 周转率改用证交所、柜买中心的全市场当日资料
pub async fn analyze_market_themes<W: WatchListProvider>(
    state: &AppState,
    watch_list: &W,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse, String> {
    let market = MarketTurnoverClient::new(&state.settings).map_err(|e| e.to_string())?;
    analyze_themes(state, &market, watch_list, request).await
}

/// 族群详情：本批次出现的成分股与族群表中的全部成分股
pub fn get_theme_detail(state: &AppState, request: ThemeDetailRequest) -> Result<ThemeDetail, String> {
    let registry = state.registry.snapshot();
    theme_heat::theme_detail(&request.theme_name, &request.records, &registry).map_err(|e| e.to_string())
}

pub fn list_themes(state: &AppState) -> Result<Vec<ThemeSummary>, String> {
    Ok(state.registry.snapshot().theme_summaries())
}

/// 重新读取族群表档案，返回族群数
pub fn reload_themes(state: &AppState) -> Result<usize, String> {
    state
        .registry
        .reload_from_file(&state.settings.theme_table_path)
        .map_err(|e| e.to_string())?;
    Ok(state.registry.snapshot().len())
}
