use crate::error::{AppError, Result};
use crate::models::market::{TurnoverRow, WatchListRow};
use crate::models::price::{Exchange, PricePoint};
use crate::services::paste_parser;

/// 单一股票在某个市场的日线资料
#[derive(Debug, Clone, PartialEq)]
pub struct DailyHistory {
    pub code: String,
    pub exchange: Exchange,
    pub name: Option<String>,
    pub points: Vec<PricePoint>,
}

/// 日线历史来源。查无此股票时返回 `TickerNotFound`，来源暂时无法提供时返回 `DataUnavailable`
#[allow(async_fn_in_trait)]
pub trait PriceHistoryProvider {
    async fn fetch_daily(&self, code: &str, exchange: Exchange) -> Result<DailyHistory>;
}

/// 当日周转率排行来源
#[allow(async_fn_in_trait)]
pub trait TurnoverProvider {
    async fn fetch_turnover(&self) -> Result<Vec<TurnoverRow>>;
}

/// 注意股清单来源
#[allow(async_fn_in_trait)]
pub trait WatchListProvider {
    async fn fetch_watch_list(&self) -> Result<Vec<WatchListRow>>;
}

/// 先查上市，查无再查上柜
pub async fn fetch_daily_any<P: PriceHistoryProvider>(provider: &P, code: &str) -> Result<DailyHistory> {
    for exchange in [Exchange::Listed, Exchange::Otc] {
        match provider.fetch_daily(code, exchange).await {
            Ok(history) if !history.points.is_empty() => {
                log::info!("{} 取得{}日线 {} 笔", code, exchange.label(), history.points.len());
                return Ok(history);
            }
            Ok(_) | Err(AppError::TickerNotFound(_)) => {
                log::debug!("{} 在{}查无资料", code, exchange.label());
            }
            Err(e) => return Err(e),
        }
    }
    Err(AppError::TickerNotFound(code.to_string()))
}

/// 使用者贴上的周转率表格
#[derive(Debug, Clone, Default)]
pub struct PastedTurnover {
    pub text: String,
}

impl TurnoverProvider for PastedTurnover {
    async fn fetch_turnover(&self) -> Result<Vec<TurnoverRow>> {
        let rows = paste_parser::parse_turnover_table(&self.text);
        if rows.is_empty() && !self.text.trim().is_empty() {
            return Err(AppError::Parse("贴上的周转率表格中没有可辨识的资料".to_string()));
        }
        Ok(rows)
    }
}

/// 使用者贴上的注意股公告
#[derive(Debug, Clone, Default)]
pub struct PastedWatchList {
    pub text: String,
}

impl WatchListProvider for PastedWatchList {
    async fn fetch_watch_list(&self) -> Result<Vec<WatchListRow>> {
        Ok(paste_parser::parse_watch_list(&self.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct OtcOnly;

    impl PriceHistoryProvider for OtcOnly {
        async fn fetch_daily(&self, code: &str, exchange: Exchange) -> Result<DailyHistory> {
            match exchange {
                Exchange::Listed => Err(AppError::TickerNotFound(code.to_string())),
                Exchange::Otc => Ok(DailyHistory {
                    code: code.to_string(),
                    exchange,
                    name: Some("元太".to_string()),
                    points: vec![PricePoint {
                        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                        open: 1.0,
                        high: 1.0,
                        low: 1.0,
                        close: 1.0,
                        volume: 0.0,
                    }],
                }),
            }
        }
    }

    struct Broken;

    impl PriceHistoryProvider for Broken {
        async fn fetch_daily(&self, _code: &str, _exchange: Exchange) -> Result<DailyHistory> {
            Err(AppError::Network("连线逾时".to_string()))
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_otc() {
        let history = fetch_daily_any(&OtcOnly, "8069").await.unwrap();
        assert_eq!(history.exchange, Exchange::Otc);
        assert_eq!(history.name.as_deref(), Some("元太"));
    }

    #[tokio::test]
    async fn test_network_error_is_not_masked() {
        let err = fetch_daily_any(&Broken, "2330").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }

    #[tokio::test]
    async fn test_pasted_watch_list() {
        let provider = PastedWatchList {
            text: "股票名稱 事項\n2375凱美\n".to_string(),
        };
        let rows = provider.fetch_watch_list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "2375");
    }

    #[tokio::test]
    async fn test_pasted_turnover_garbage_is_error() {
        let provider = PastedTurnover {
            text: "这不是表格".to_string(),
        };
        assert!(provider.fetch_turnover().await.is_err());
        assert!(PastedTurnover::default().fetch_turnover().await.unwrap().is_empty());
    }
}
