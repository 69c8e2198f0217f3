use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::market::TurnoverRow;
use crate::models::settings::AppSettings;
use crate::services::providers::TurnoverProvider;
use crate::utils::http::build_stock_client;
use crate::utils::number::value_to_f64;
use crate::utils::retry::retry_with_backoff;

const TWSE_DAY_ALL_URL: &str = "https://openapi.twse.com.tw/v1/exchangeReport/STOCK_DAY_ALL";
const TWSE_COMPANY_URL: &str = "https://openapi.twse.com.tw/v1/opendata/t187ap03_L";
const TPEX_QUOTES_URL: &str = "https://www.tpex.org.tw/web/stock/aftertrading/daily_close_quotes/stk_quote_result.php";

const TWSE_ISSUED_SHARES_FIELD: &str = "已發行普通股數或TDR原股發行股數";

/// 成交量低于 500 张的冷门股不列入
pub const MIN_TRADE_VOLUME: f64 = 500_000.0;

/// 柜买收盘行情栏位：0 代号、1 名称、2 收盘、8 成交股数、15 发行股数
const TPEX_MIN_COLUMNS: usize = 16;

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// 全市场当日周转率：证交所 OpenAPI 日成交 + 公司基本资料（发行股数），
/// 柜买中心收盘行情（本身带发行股数）。周转率 = 成交股数 / 发行股数 × 100
pub struct MarketTurnoverClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl MarketTurnoverClient {
    pub fn new(settings: &AppSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_stock_client(settings.http_timeout_secs)?,
            max_retries: settings.max_retries,
        })
    }

    /// 上市个股
    pub async fn fetch_listed(&self) -> Result<Vec<TurnoverRow>> {
        let (prices, companies) = tokio::join!(
            self.fetch_json(TWSE_DAY_ALL_URL, &[]),
            self.fetch_json(TWSE_COMPANY_URL, &[])
        );
        parse_twse_turnover(&prices?, &companies?)
    }

    /// 上柜个股
    pub async fn fetch_otc(&self) -> Result<Vec<TurnoverRow>> {
        let body = self.fetch_json(TPEX_QUOTES_URL, &[("l", "zh-tw"), ("o", "json")]).await?;
        parse_tpex_turnover(&body)
    }

    async fn fetch_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        retry_with_backoff(self.max_retries, || self.get_json(url, query))
            .await
            .map_err(|e| AppError::Network(format!("{}: {:#}", url, e)))
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let resp = self.client.get(url).query(query).send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

impl TurnoverProvider for MarketTurnoverClient {
    async fn fetch_turnover(&self) -> Result<Vec<TurnoverRow>> {
        let (listed, otc) = tokio::join!(self.fetch_listed(), self.fetch_otc());
        merge_markets(listed, otc)
    }
}

/// 合并上市、上柜，依周转率由高到低。一边失败只记警告，两边都失败才算失败
pub fn merge_markets(listed: Result<Vec<TurnoverRow>>, otc: Result<Vec<TurnoverRow>>) -> Result<Vec<TurnoverRow>> {
    let mut rows = Vec::new();
    let mut failures = Vec::new();
    for (label, result) in [("上市", listed), ("上柜", otc)] {
        match result {
            Ok(mut part) => {
                log::info!("{}周转率 {} 笔", label, part.len());
                rows.append(&mut part);
            }
            Err(e) => {
                log::warn!("{}周转率取得失败: {}", label, e);
                failures.push(format!("{}: {}", label, e));
            }
        }
    }

    if failures.len() == 2 {
        return Err(AppError::DataUnavailable(failures.join("; ")));
    }
    rows.sort_by(|a, b| b.turnover_rate.total_cmp(&a.turnover_rate));
    Ok(rows)
}

fn turnover_rate(volume: f64, issued_shares: f64) -> Option<f64> {
    if volume < MIN_TRADE_VOLUME || issued_shares <= 0.0 {
        return None;
    }
    Some(volume / issued_shares * 100.0).filter(|t| t.is_finite() && *t > 0.0)
}

fn pad_code(raw: &str) -> String {
    format!("{:0>4}", raw.trim())
}

/// 证交所：`STOCK_DAY_ALL` 与 `t187ap03_L` 以代号合并。ETF（00 开头）与 TDR（91 开头）略过
pub fn parse_twse_turnover(prices: &Value, companies: &Value) -> Result<Vec<TurnoverRow>> {
    let prices = prices
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| AppError::DataUnavailable("证交所日成交资料为空".to_string()))?;
    let companies = companies
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| AppError::DataUnavailable("证交所公司基本资料为空".to_string()))?;

    let mut issued: HashMap<String, f64> = HashMap::new();
    for company in companies {
        let Some(code) = company.get("公司代號").and_then(|v| v.as_str()) else {
            continue;
        };
        if let Some(shares) = company.get(TWSE_ISSUED_SHARES_FIELD).and_then(value_to_f64) {
            issued.entry(pad_code(code)).or_insert(shares);
        }
    }

    let rows: Vec<TurnoverRow> = prices
        .iter()
        .filter_map(|row| {
            let code = pad_code(row.get("Code")?.as_str()?);
            if code.starts_with("00") || code.starts_with("91") {
                return None;
            }
            let volume = row.get("TradeVolume").and_then(value_to_f64)?;
            let turnover = turnover_rate(volume, *issued.get(&code)?)?;

            let close = row.get("ClosingPrice").and_then(value_to_f64);
            let change = row.get("Change").and_then(value_to_f64);
            let change_pct = match (close, change) {
                (Some(c), Some(ch)) if c - ch > 0.0 => Some(ch / (c - ch) * 100.0),
                _ => None,
            };

            Some(TurnoverRow {
                name: row.get("Name").and_then(|v| v.as_str()).unwrap_or("").trim().to_string(),
                code,
                turnover_rate: turnover,
                close,
                change_pct,
            })
        })
        .collect();

    log::debug!("证交所 {} 档中 {} 档可算周转率", prices.len(), rows.len());
    Ok(rows)
}

/// 柜买中心收盘行情：资料在 `tables[0].data`（旧版为 `aaData`），只取 4 码普通股
pub fn parse_tpex_turnover(body: &Value) -> Result<Vec<TurnoverRow>> {
    let rows = body
        .get("tables")
        .and_then(|t| t.get(0))
        .and_then(|t| t.get("data"))
        .or_else(|| body.get("aaData"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Parse("柜买中心回应缺少行情资料".to_string()))?;
    if rows.is_empty() {
        return Err(AppError::DataUnavailable("柜买中心行情为空".to_string()));
    }

    let parsed: Vec<TurnoverRow> = rows
        .iter()
        .filter_map(|row| {
            let cells = row.as_array().filter(|c| c.len() >= TPEX_MIN_COLUMNS)?;
            let code = cells[0].as_str()?.trim();
            if code.len() != 4 || !code.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let volume = value_to_f64(&cells[8])?;
            let turnover = turnover_rate(volume, value_to_f64(&cells[15])?)?;
            let name = cells[1].as_str().unwrap_or("");

            Some(TurnoverRow {
                code: code.to_string(),
                name: html_tag_re().replace_all(name, "").trim().to_string(),
                turnover_rate: turnover,
                close: value_to_f64(&cells[2]),
                change_pct: None,
            })
        })
        .collect();

    if parsed.is_empty() {
        return Err(AppError::DataUnavailable("柜买中心行情中没有可算周转率的个股".to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(code: &str, turnover: f64) -> TurnoverRow {
        TurnoverRow {
            code: code.to_string(),
            name: String::new(),
            turnover_rate: turnover,
            close: None,
            change_pct: None,
        }
    }

    #[test]
    fn test_parse_twse_turnover_joins_issued_shares() {
        let prices = json!([
            {"Code": "2330", "Name": "台積電", "TradeVolume": "25,000,000", "ClosingPrice": "600.00", "Change": "10.0000"},
            {"Code": "3037", "Name": "欣興", "TradeVolume": "98765000", "ClosingPrice": "185.50", "Change": "-4.5000"},
            {"Code": "0050", "Name": "元大台灣50", "TradeVolume": "50000000", "ClosingPrice": "150", "Change": "1"},
            {"Code": "9105", "Name": "泰金寶-DR", "TradeVolume": "900000", "ClosingPrice": "5", "Change": "0"},
            {"Code": "1101", "Name": "台泥", "TradeVolume": "400000", "ClosingPrice": "33", "Change": "0"},
            {"Code": "6666", "Name": "无股本", "TradeVolume": "900000", "ClosingPrice": "10", "Change": "0"}
        ]);
        let companies = json!([
            {"公司代號": "2330", "已發行普通股數或TDR原股發行股數": "25,930,380,458"},
            {"公司代號": "2330", "已發行普通股數或TDR原股發行股數": "1"},
            {"公司代號": "3037", "已發行普通股數或TDR原股發行股數": "1,523,000,000"},
            {"公司代號": "0050", "已發行普通股數或TDR原股發行股數": "1,000,000"},
            {"公司代號": "9105", "已發行普通股數或TDR原股發行股數": "1,000,000"},
            {"公司代號": "1101", "已發行普通股數或TDR原股發行股數": "7,000,000"}
        ]);

        let rows = parse_twse_turnover(&prices, &companies).unwrap();
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["2330", "3037"]);

        let tsmc = &rows[0];
        assert_eq!(tsmc.name, "台積電");
        assert!((tsmc.turnover_rate - 25_000_000.0 / 25_930_380_458.0 * 100.0).abs() < 1e-12);
        assert_eq!(tsmc.close, Some(600.0));
        assert!((tsmc.change_pct.unwrap() - 10.0 / 590.0 * 100.0).abs() < 1e-9);
        assert!(rows[1].change_pct.unwrap() < 0.0);
    }

    #[test]
    fn test_parse_twse_turnover_empty_payload() {
        let err = parse_twse_turnover(&json!([]), &json!([{"公司代號": "2330"}])).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn test_parse_tpex_turnover() {
        let mut quote = vec![json!(""); 16];
        quote[0] = json!("8069");
        quote[1] = json!("<a href='#'>元太</a>");
        quote[2] = json!("215.50");
        quote[8] = json!("12,000,000");
        quote[15] = json!("1,140,000,000");
        let mut thin = quote.clone();
        thin[0] = json!("6488");
        thin[8] = json!("100,000");
        let mut warrant = quote.clone();
        warrant[0] = json!("70001P");

        let body = json!({"tables": [{"data": [quote, thin, warrant, ["short"]]}]});
        let rows = parse_tpex_turnover(&body).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "8069");
        assert_eq!(rows[0].name, "元太");
        assert_eq!(rows[0].close, Some(215.5));
        assert!((rows[0].turnover_rate - 12.0 / 1140.0 * 100.0).abs() < 1e-9);
        assert_eq!(rows[0].change_pct, None);
    }

    #[test]
    fn test_parse_tpex_turnover_rejects_empty() {
        assert!(matches!(parse_tpex_turnover(&json!({"aaData": []})), Err(AppError::DataUnavailable(_))));
        assert!(matches!(parse_tpex_turnover(&json!({})), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_merge_markets_sorts_and_tolerates_one_failure() {
        let merged = merge_markets(Ok(vec![row("2330", 0.1), row("3037", 6.5)]), Ok(vec![row("8069", 1.1)])).unwrap();
        let codes: Vec<&str> = merged.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["3037", "8069", "2330"]);

        let listed_only = merge_markets(Ok(vec![row("2330", 0.1)]), Err(AppError::Network("逾时".into()))).unwrap();
        assert_eq!(listed_only.len(), 1);

        let err = merge_markets(Err(AppError::Network("a".into())), Err(AppError::Network("b".into()))).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }
}
