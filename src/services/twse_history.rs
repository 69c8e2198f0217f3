use chrono::{Datelike, Duration, Local, NaiveDate};
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::price::{Exchange, PricePoint};
use crate::models::settings::AppSettings;
use crate::services::providers::{DailyHistory, PriceHistoryProvider};
use crate::utils::http::build_stock_client;
use crate::utils::number::value_to_f64;
use crate::utils::retry::retry_with_backoff;

const TWSE_STOCK_DAY_URL: &str = "https://www.twse.com.tw/exchangeReport/STOCK_DAY";
const TPEX_HISTORY_URL: &str = "https://www.tpex.org.tw/web/stock/aftertrading/daily_trading_info/st43_result.php";

/// 民国纪年与西元的差
const ROC_YEAR_OFFSET: i32 = 1911;

/// 单月的日成交资料
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthPage {
    pub name: Option<String>,
    pub points: Vec<PricePoint>,
}

/// 证交所 / 柜买中心个股日成交资讯。两边都只能一次查一个月，长区间要逐月拉
pub struct TwseHistoryClient {
    client: reqwest::Client,
    history_days: i64,
    max_retries: u32,
    concurrency: usize,
}

impl TwseHistoryClient {
    pub fn new(settings: &AppSettings) -> anyhow::Result<Self> {
        let client = build_stock_client(settings.http_timeout_secs)?;
        Ok(Self {
            client,
            history_days: settings.history_days.max(1),
            max_retries: settings.max_retries,
            concurrency: settings.fetch_concurrency.max(1),
        })
    }

    /// 拉取 `start..=end` 的日线。整段都没有资料视为该市场查无此股票
    pub async fn fetch_range(&self, code: &str, exchange: Exchange, start: NaiveDate, end: NaiveDate) -> Result<DailyHistory> {
        let months = month_starts(start, end);
        log::info!(
            "{} 向{}拉取 {} ~ {} 日线，共 {} 个月",
            code,
            exchange.label(),
            start,
            end,
            months.len()
        );

        let pages: Vec<MonthPage> = stream::iter(months)
            .map(|month| self.fetch_month(code, exchange, month))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let name = pages.iter().find_map(|p| p.name.clone());
        let mut points: Vec<PricePoint> = pages
            .into_iter()
            .flat_map(|p| p.points)
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
        if points.is_empty() {
            return Err(AppError::TickerNotFound(code.to_string()));
        }
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);

        Ok(DailyHistory {
            code: code.to_string(),
            exchange,
            name,
            points,
        })
    }

    async fn fetch_month(&self, code: &str, exchange: Exchange, month: NaiveDate) -> Result<MonthPage> {
        let body = retry_with_backoff(self.max_retries, || self.get_json(code, exchange, month))
            .await
            .map_err(|e| AppError::Network(format!("{} {}: {:#}", code, month.format("%Y-%m"), e)))?;

        let page = match exchange {
            Exchange::Listed => parse_twse_month(&body, code)?,
            Exchange::Otc => parse_tpex_month(&body)?,
        };
        log::debug!("{} {} 取得 {} 笔", code, month.format("%Y-%m"), page.points.len());
        Ok(page)
    }

    async fn get_json(&self, code: &str, exchange: Exchange, month: NaiveDate) -> anyhow::Result<Value> {
        let request = match exchange {
            Exchange::Listed => {
                let date = month.format("%Y%m%d").to_string();
                self.client
                    .get(TWSE_STOCK_DAY_URL)
                    .query(&[("response", "json"), ("date", date.as_str()), ("stockNo", code)])
            }
            Exchange::Otc => {
                let roc = roc_month(month);
                self.client
                    .get(TPEX_HISTORY_URL)
                    .query(&[("l", "zh-tw"), ("d", roc.as_str()), ("stkno", code)])
            }
        };

        let resp = request.send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

impl PriceHistoryProvider for TwseHistoryClient {
    async fn fetch_daily(&self, code: &str, exchange: Exchange) -> Result<DailyHistory> {
        let end = Local::now().date_naive();
        let start = end - Duration::days(self.history_days);
        self.fetch_range(code, exchange, start, end).await
    }
}

/// 区间内每个月的第一天
pub fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = start.with_day(1);
    while let Some(month) = current {
        if month > end {
            break;
        }
        months.push(month);
        current = month.checked_add_months(chrono::Months::new(1));
    }
    months
}

/// `113/01/02` → 2024-01-02
pub fn parse_roc_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<u32> = text
        .trim()
        .split('/')
        .map(|p| p.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    match parts.as_slice() {
        [year, month, day] => NaiveDate::from_ymd_opt(*year as i32 + ROC_YEAR_OFFSET, *month, *day),
        _ => None,
    }
}

/// 柜买中心的月份参数：`113/01`
pub fn roc_month(month: NaiveDate) -> String {
    format!("{}/{:02}", month.year() - ROC_YEAR_OFFSET, month.month())
}

/// 日期、成交量、成交金额、开、高、低、收…… 任一价格为 `--`（当日无成交）的列略过
fn parse_daily_row(row: &Value, volume_scale: f64) -> Option<PricePoint> {
    let cells = row.as_array()?;
    if cells.len() < 7 {
        return None;
    }

    Some(PricePoint {
        date: parse_roc_date(cells[0].as_str()?)?,
        volume: value_to_f64(&cells[1]).unwrap_or(0.0) * volume_scale,
        open: value_to_f64(&cells[3])?,
        high: value_to_f64(&cells[4])?,
        low: value_to_f64(&cells[5])?,
        close: value_to_f64(&cells[6])?,
    })
}

/// 证交所 STOCK_DAY：`stat == "OK"` 时 `data` 为当月各日资料，成交量单位为股
pub fn parse_twse_month(body: &Value, code: &str) -> Result<MonthPage> {
    let stat = body.get("stat").and_then(|v| v.as_str()).unwrap_or("");
    if stat != "OK" {
        // 查无资料（代码不存在或该月无交易）
        if stat.contains("很抱歉") || stat.contains("沒有符合條件") {
            return Ok(MonthPage::default());
        }
        return Err(AppError::DataUnavailable(format!("证交所回应: {}", stat)));
    }

    // 标题形如「113年01月 2330 台積電 各日成交資訊」
    let name = body
        .get("title")
        .and_then(|v| v.as_str())
        .and_then(|title| {
            let mut tokens = title.split_whitespace().skip_while(|t| *t != code);
            tokens.next()?;
            tokens.next().map(str::to_string)
        });

    let points = body
        .get("data")
        .and_then(|v| v.as_array())
        .map(|rows| rows.iter().filter_map(|r| parse_daily_row(r, 1.0)).collect())
        .unwrap_or_default();

    Ok(MonthPage { name, points })
}

/// 柜买中心 st43：资料在 `aaData`（新版为 `tables[0].data`），成交量单位为千股
pub fn parse_tpex_month(body: &Value) -> Result<MonthPage> {
    let rows = body
        .get("aaData")
        .or_else(|| body.get("tables").and_then(|t| t.get(0)).and_then(|t| t.get("data")))
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Parse("柜买中心回应缺少 aaData".to_string()))?;

    let name = body
        .get("stkName")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(MonthPage {
        name,
        points: rows.iter().filter_map(|r| parse_daily_row(r, 1000.0)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_roc_date() {
        assert_eq!(parse_roc_date("113/01/02"), Some(day(2024, 1, 2)));
        assert_eq!(parse_roc_date(" 99/12/31 "), Some(day(2010, 12, 31)));
        assert_eq!(parse_roc_date("113/02/30"), None);
        assert_eq!(parse_roc_date("2024-01-02"), None);
    }

    #[test]
    fn test_month_starts_inclusive() {
        let months = month_starts(day(2023, 11, 15), day(2024, 2, 1));
        assert_eq!(months, vec![day(2023, 11, 1), day(2023, 12, 1), day(2024, 1, 1), day(2024, 2, 1)]);
        assert_eq!(roc_month(day(2024, 2, 1)), "113/02");
    }

    #[test]
    fn test_parse_twse_month() {
        let body = json!({
            "stat": "OK",
            "date": "20240101",
            "title": "113年01月 2330 台積電           各日成交資訊",
            "fields": ["日期", "成交股數", "成交金額", "開盤價", "最高價", "最低價", "收盤價", "漲跌價差", "成交筆數"],
            "data": [
                ["113/01/02", "26,059,058", "15,267,604,248", "590.00", "593.00", "589.00", "593.00", "-0.50", "19,554"],
                ["113/01/03", "37,106,763", "21,226,013,404", "584.00", "585.00", "576.00", "578.00", "-15.00", "55,947"],
                ["113/01/04", "0", "0", "--", "--", "--", "--", " 0.00", "0"]
            ]
        });
        let page = parse_twse_month(&body, "2330").unwrap();

        assert_eq!(page.name.as_deref(), Some("台積電"));
        assert_eq!(page.points.len(), 2);
        let first = &page.points[0];
        assert_eq!(first.date, day(2024, 1, 2));
        assert_eq!(first.open, 590.0);
        assert_eq!(first.close, 593.0);
        assert_eq!(first.volume, 26_059_058.0);
    }

    #[test]
    fn test_parse_twse_no_data_and_errors() {
        let empty = parse_twse_month(&json!({"stat": "很抱歉，沒有符合條件的資料!"}), "9999").unwrap();
        assert_eq!(empty, MonthPage::default());

        let err = parse_twse_month(&json!({"stat": "查詢日期大於今日，請重新查詢!"}), "2330").unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn test_parse_tpex_month() {
        let body = json!({
            "stkNo": "6488",
            "stkName": "環球晶",
            "iTotalRecords": 1,
            "aaData": [
                ["113/01/02", "1,234", "650,000", "525.00", "531.00", "520.00", "528.00", "3.00", "1,100"]
            ]
        });
        let page = parse_tpex_month(&body).unwrap();
        assert_eq!(page.name.as_deref(), Some("環球晶"));
        assert_eq!(page.points[0].volume, 1_234_000.0);
        assert_eq!(page.points[0].high, 531.0);

        let tables = json!({"tables": [{"data": []}]});
        assert!(parse_tpex_month(&tables).unwrap().points.is_empty());
        assert!(parse_tpex_month(&json!({})).is_err());
    }
}
