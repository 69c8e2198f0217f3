use serde_json::Value;

/// 交易所与看盘软体的数字字串：千分位逗号、百分号、正号、涨跌箭头。
/// `--`、`X` 等无成交占位与空字串返回 `None`
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '+' | '$' | '▲' | '▼' | ' '))
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '-') {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// JSON 栏位可能是数字也可能是字串
pub fn value_to_f64(val: &Value) -> Option<f64> {
    match val {
        Value::String(s) => parse_number(s),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
