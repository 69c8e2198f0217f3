use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::error::{AppError, Result};
use crate::models::theme::{AnalysisReport, StockAttributeRecord, ThemeDetail, ThemeHeatEntry};
use crate::services::theme_registry::{normalize_code, ThemeRegistry};

/// 族群热度分析：把一批个股属性按族群归类、计算平均值并排行。
///
/// 周转率批次与注意股批次都走这里，两次呼叫互不共享状态。
pub fn aggregate(records: &[StockAttributeRecord], registry: &ThemeRegistry) -> AnalysisReport {
    let mut seen: HashSet<String> = HashSet::new();
    let mut groups: BTreeMap<String, Vec<StockAttributeRecord>> = BTreeMap::new();
    let mut unclassified = Vec::new();

    for record in records {
        let Some(code) = normalize_code(&record.code) else {
            log::debug!("无法辨识的股票代码: {:?}", record.code);
            unclassified.push(record.clone());
            continue;
        };
        // 同一批次重复出现的代码只算第一次
        if !seen.insert(code.clone()) {
            log::debug!("重复代码 {}，略过", code);
            continue;
        }

        let themes = registry.themes_for(&code);
        if themes.is_empty() {
            unclassified.push(record.clone());
            continue;
        }
        for theme in themes {
            groups.entry(theme).or_default().push(record.clone());
        }
    }

    let mut ranked_entries: Vec<ThemeHeatEntry> = groups
        .into_iter()
        .map(|(theme_name, members)| heat_entry(theme_name, members))
        .collect();
    ranked_entries.sort_by(rank_order);

    log::info!(
        "族群热度: {} 笔资料，{} 个族群，{} 笔未分类",
        records.len(),
        ranked_entries.len(),
        unclassified.len()
    );

    AnalysisReport {
        ranked_entries,
        unclassified,
    }
}

/// 单一族群的详情。族群名称不在族群表中时返回 `ThemeNotFound`；
/// 族群存在但本批次没有成分股时，`entry` 的数量为 0
pub fn theme_detail(theme_name: &str, records: &[StockAttributeRecord], registry: &ThemeRegistry) -> Result<ThemeDetail> {
    let theme = registry
        .theme(theme_name)
        .ok_or_else(|| AppError::ThemeNotFound(theme_name.to_string()))?;

    let entry = aggregate(records, registry)
        .ranked_entries
        .into_iter()
        .find(|e| e.theme_name == theme.name)
        .unwrap_or_else(|| heat_entry(theme.name.clone(), Vec::new()));

    Ok(ThemeDetail {
        entry,
        description: theme.description.clone(),
        all_members: theme.members.clone(),
    })
}

fn heat_entry(theme_name: String, mut members: Vec<StockAttributeRecord>) -> ThemeHeatEntry {
    // 稳定排序：周转率相同或缺值时保持输入顺序
    members.sort_by(|a, b| desc_none_last(a.turnover_rate, b.turnover_rate));

    ThemeHeatEntry {
        matched_count: members.len(),
        average_turnover: mean(members.iter().map(|m| m.turnover_rate)),
        average_change_pct: mean(members.iter().map(|m| m.change_pct)),
        theme_name,
        members,
    }
}

/// 只对有值的项目取平均，全部缺值时为 `None`
pub fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// 数值由大到小，缺值排最后
fn desc_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// 成分股数多者优先，其次平均周转率高者，最后依名称
fn rank_order(a: &ThemeHeatEntry, b: &ThemeHeatEntry) -> Ordering {
    b.matched_count
        .cmp(&a.matched_count)
        .then_with(|| desc_none_last(a.average_turnover, b.average_turnover))
        .then_with(|| a.theme_name.cmp(&b.theme_name))
}
