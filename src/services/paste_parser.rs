use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::market::{TurnoverRow, WatchListRow};
use crate::utils::number::parse_number;

/// 表头关键字，出现时从下一行开始解析
const HEADER_KEYWORDS: [&str; 6] = ["代碼", "股票", "週轉率", "周轉率", "成交價", "收盤"];

/// 看盘软体「周转率排行」的标准栏位：
/// 排名 代碼 股票 成交價 漲跌 漲跌% 周漲跌% 振幅% 最高 最低 成交量 成交值 周轉率%
const STANDARD_COLUMNS: usize = 13;

fn column_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid regex"))
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"))
}

fn cjk_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x{4e00}-\x{9fff}]{2,}").expect("valid regex"))
}

fn watch_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})([\x{4e00}-\x{9fff}].*)$").expect("valid regex"))
}

fn is_stock_code(text: &str) -> bool {
    text.len() == 4 && text.chars().all(|c| c.is_ascii_digit())
}

#[derive(Default)]
struct Columns<'a> {
    code: Option<&'a str>,
    name: Option<&'a str>,
    close: Option<&'a str>,
    change_pct: Option<&'a str>,
    turnover: Option<&'a str>,
}

/// 解析贴上的周转率表格（Tab 或两个以上空白分隔）。
///
/// 13 栏的标准格式按位置取值，其他格式逐栏辨识。周转率缺失或不大于 0 的列略过，
/// 结果依周转率由高到低排列。
pub fn parse_turnover_table(text: &str) -> Vec<TurnoverRow> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| HEADER_KEYWORDS.iter().any(|k| line.contains(k)))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut rows: Vec<TurnoverRow> = lines[start..]
        .iter()
        .filter_map(|line| parse_turnover_line(line))
        .collect();

    rows.sort_by(|a, b| b.turnover_rate.total_cmp(&a.turnover_rate));
    log::info!("周转率表格解析出 {} 笔", rows.len());
    rows
}

fn parse_turnover_line(line: &str) -> Option<TurnoverRow> {
    let cleaned = line.trim().replace('▲', "").replace('▼', "");
    if cleaned.is_empty() {
        return None;
    }

    let parts: Vec<&str> = if cleaned.contains('\t') {
        cleaned.split('\t').map(str::trim).collect()
    } else {
        column_split_re().split(&cleaned).map(str::trim).collect()
    };
    if parts.len() < 3 {
        return None;
    }

    let mut cols = Columns::default();
    if parts.len() >= STANDARD_COLUMNS {
        cols.code = Some(parts[1]).filter(|p| is_stock_code(p));
        cols.name = Some(parts[2]).filter(|p| cjk_name_re().is_match(p));
        cols.close = Some(parts[3]).filter(|p| !p.is_empty());
        cols.change_pct = Some(parts[5]).filter(|p| !p.is_empty());
        cols.turnover = Some(parts[12]).filter(|p| !p.is_empty());
    }
    if cols.code.is_none() || cols.turnover.is_none() {
        scan_columns(&parts, &mut cols);
    }

    let code = cols.code.filter(|c| is_stock_code(c))?;
    let turnover_rate = cols.turnover.and_then(parse_number).filter(|t| *t > 0.0)?;

    Some(TurnoverRow {
        code: code.to_string(),
        name: cols.name.unwrap_or("").to_string(),
        turnover_rate,
        close: cols.close.and_then(parse_number),
        change_pct: cols.change_pct.and_then(parse_number),
    })
}

/// 非标准格式：依内容猜栏位
fn scan_columns<'a>(parts: &[&'a str], cols: &mut Columns<'a>) {
    let len = parts.len();
    for (idx, part) in parts.iter().copied().enumerate() {
        if cols.code.is_none() {
            if let Some(m) = code_re().captures(part).and_then(|c| c.get(1)) {
                cols.code = Some(m.as_str());
                continue;
            }
        }

        let signed = part.contains('+') || part.contains('-');
        if part.contains('%') && cols.turnover.is_none() && !signed && idx + 3 >= len {
            cols.turnover = Some(part);
            continue;
        }
        if part.contains('%') && signed && cols.change_pct.is_none() && (4..=6).contains(&idx) {
            cols.change_pct = Some(part);
            continue;
        }
        if part.contains('.') && cols.close.is_none() && (2..=4).contains(&idx) {
            if parse_number(part).is_some_and(|p| (1.0..=10000.0).contains(&p)) {
                cols.close = Some(part);
                continue;
            }
        }
        if cols.name.is_none() {
            if let Some(m) = cjk_name_re().find(part) {
                cols.name = Some(m.as_str());
            }
        }
    }

    if cols.code.is_none() && len >= 2 && is_stock_code(parts[1]) {
        cols.code = Some(parts[1]);
    }
}

/// 解析贴上的注意股公告：`2375凱美` 这类「4 码代码 + 中文名称」的列视为一档股票，
/// 同列名称后面或紧接的说明文字记为注意事由。标题列略过，重复代码只留第一次
pub fn parse_watch_list(text: &str) -> Vec<WatchListRow> {
    let mut rows: Vec<WatchListRow> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    // 最近一档新加入的股票，后续说明文字接在它的事由后面
    let mut current: Option<usize> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        let Some(caps) = watch_line_re().captures(line) else {
            if line.contains("股票名稱") || line.contains("事項") {
                continue;
            }
            if let Some(row) = current.and_then(|i| rows.get_mut(i)) {
                if !row.reason.is_empty() {
                    row.reason.push(' ');
                }
                row.reason.push_str(line);
            }
            continue;
        };

        let code = caps[1].to_string();
        let rest = caps[2].trim();
        let (name, reason) = match rest.split_once(char::is_whitespace) {
            Some((name, reason)) => (name, reason.trim()),
            None => (rest, ""),
        };

        if seen.insert(code.clone()) {
            rows.push(WatchListRow {
                code,
                name: name.to_string(),
                reason: reason.to_string(),
            });
            current = Some(rows.len() - 1);
        } else {
            current = None;
        }
    }

    log::info!("注意股解析出 {} 档", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_thirteen_column_table() {
        let text = "排名\t代碼\t股票\t成交價\t漲跌\t漲跌%\t周漲跌%\t振幅%\t最高\t最低\t成交量\t成交值 (億)\t周轉率%\n\
                    1\t3037\t欣興\t185.5\t▲16.5\t+9.76%\t12.1%\t10.2%\t185.5\t170\t98,765\t180.2\t6.78%\n\
                    2\t2409\t友達\t18.35\t▼0.4\t-2.13%\t1.1%\t4.5%\t19\t18.2\t150,000\t27.6\t1.95%";
        let rows = parse_turnover_table(text);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, "3037");
        assert_eq!(rows[0].name, "欣興");
        assert_eq!(rows[0].turnover_rate, 6.78);
        assert_eq!(rows[0].close, Some(185.5));
        assert_eq!(rows[0].change_pct, Some(9.76));
        assert_eq!(rows[1].change_pct, Some(-2.13));
    }

    #[test]
    fn test_space_separated_table_is_scanned() {
        let text = "代碼  股票  收盤  周轉率\n2330  台積電  580.0  0.45%\n8069  元太  215.5  3.2%\n";
        let rows = parse_turnover_table(text);
        assert_eq!(rows.len(), 2);
        // 依周转率排序
        assert_eq!(rows[0].code, "8069");
        assert_eq!(rows[0].name, "元太");
        assert_eq!(rows[0].close, Some(215.5));
        assert_eq!(rows[1].turnover_rate, 0.45);
    }

    #[test]
    fn test_rows_without_turnover_are_dropped() {
        let text = "1\t2330\t台積電\t580\t5\t+0.87%\t1%\t2%\t585\t575\t30,000\t174\t--";
        assert!(parse_turnover_table(text).is_empty());
        assert!(parse_turnover_table("").is_empty());
        assert!(parse_turnover_table("只有说明文字").is_empty());
    }

    #[test]
    fn test_watch_list_lines() {
        let text = "股票名稱 事項\n\
                    2375凱美\n\
                    最近六個營業日累積漲幅達32%\n\
                    1815富喬 第一款\n\
                    2375凱美\n\
                    说明文字\n";
        let rows = parse_watch_list(text);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, "2375");
        assert_eq!(rows[0].name, "凱美");
        assert_eq!(rows[0].reason, "最近六個營業日累積漲幅達32%");
        assert_eq!(rows[1].name, "富喬");
        assert_eq!(rows[1].reason, "第一款");
    }

    #[test]
    fn test_watch_list_reason_may_mention_header_words() {
        let text = "股票名稱 事項\n2375凱美 注意事項：最近六個營業日累積漲幅達32%\n";
        let rows = parse_watch_list(text);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "2375");
        assert_eq!(rows[0].reason, "注意事項：最近六個營業日累積漲幅達32%");
    }

    #[test]
    fn test_watch_list_ignores_non_stock_lines() {
        assert!(parse_watch_list("").is_empty());
        assert!(parse_watch_list("公告日期 113/05/02\n12345\n").is_empty());
    }
}
