use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::market::{TurnoverRow, WatchListRow};
use crate::models::theme::{AnalysisReport, AnalyzeResponse, BatchSummary, StockAttributeRecord};
use crate::services::theme_heat::{aggregate, mean};
use crate::services::theme_registry::ThemeRegistry;

/// 依周转率由高到低取前 N 名。`None` 表示全部保留，0 视为无效输入
pub fn top_n_by_turnover(mut rows: Vec<TurnoverRow>, top_n: Option<usize>) -> Result<Vec<TurnoverRow>> {
    let Some(n) = top_n else {
        return Ok(rows);
    };
    if n == 0 {
        return Err(AppError::InvalidInput("top_n 必须大于 0".to_string()));
    }

    rows.sort_by(|a, b| b.turnover_rate.total_cmp(&a.turnover_rate));
    rows.truncate(n);
    Ok(rows)
}

/// 批次摘要。多族群个股在各族群各出现一次，批次平均周转率只算一次
pub fn summarize(total_records: usize, report: &AnalysisReport) -> BatchSummary {
    let mut seen = HashSet::new();
    let distinct = report
        .ranked_entries
        .iter()
        .flat_map(|e| e.members.iter())
        .chain(report.unclassified.iter())
        .filter(|r| seen.insert(r.code.as_str()));

    BatchSummary {
        total_records,
        classified_themes: report.ranked_entries.len(),
        unclassified_count: report.unclassified.len(),
        average_turnover: mean(distinct.map(|r| r.turnover_rate)),
    }
}

/// 周转率批次（可截断前 N 名）与注意股批次（不截断）分别跑同一套族群热度分析
pub fn analyze(
    turnover_rows: Vec<TurnoverRow>,
    watch_rows: Vec<WatchListRow>,
    top_n: Option<usize>,
    registry: &ThemeRegistry,
) -> Result<AnalyzeResponse> {
    let turnover_records: Vec<StockAttributeRecord> = top_n_by_turnover(turnover_rows, top_n)?
        .into_iter()
        .map(StockAttributeRecord::from)
        .collect();
    let watch_records: Vec<StockAttributeRecord> = watch_rows.into_iter().map(StockAttributeRecord::from).collect();

    let turnover_report = aggregate(&turnover_records, registry);
    let watch_list_report = aggregate(&watch_records, registry);

    Ok(AnalyzeResponse {
        turnover_summary: summarize(turnover_records.len(), &turnover_report),
        watch_list_summary: summarize(watch_records.len(), &watch_list_report),
        turnover_report,
        watch_list_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::theme::{ThemeDefinition, ThemeMember};

    fn row(code: &str, turnover: f64) -> TurnoverRow {
        TurnoverRow {
            code: code.to_string(),
            name: String::new(),
            turnover_rate: turnover,
            close: None,
            change_pct: None,
        }
    }

    fn registry() -> ThemeRegistry {
        let member = |code: &str| ThemeMember {
            code: code.to_string(),
            name: String::new(),
            description: String::new(),
        };
        ThemeRegistry::new(vec![
            ThemeDefinition { name: "记忆体".into(), description: String::new(), members: vec![member("2408"), member("2344")] },
            ThemeDefinition { name: "DRAM".into(), description: String::new(), members: vec![member("2408")] },
        ])
    }

    #[test]
    fn test_top_n_keeps_highest() {
        let rows = vec![row("1", 3.0), row("2", 9.0), row("3", 5.0)];
        let top = top_n_by_turnover(rows, Some(2)).unwrap();
        let codes: Vec<&str> = top.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["2", "3"]);
    }

    #[test]
    fn test_top_n_none_and_oversized() {
        let rows = vec![row("1", 3.0), row("2", 9.0)];
        assert_eq!(top_n_by_turnover(rows.clone(), None).unwrap(), rows);
        assert_eq!(top_n_by_turnover(rows, Some(10)).unwrap().len(), 2);
    }

    #[test]
    fn test_top_n_zero_rejected() {
        assert!(matches!(top_n_by_turnover(vec![], Some(0)), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_analyze_two_independent_batches() {
        let turnover = vec![row("2408", 12.0), row("2344", 8.0), row("9999", 30.0)];
        let watch = vec![WatchListRow {
            code: "2344".to_string(),
            name: "華邦電".to_string(),
            reason: "第一款".to_string(),
        }];

        let response = analyze(turnover, watch, Some(2), &registry()).unwrap();

        // 前 2 名为 9999、2408
        assert_eq!(response.turnover_summary.total_records, 2);
        assert_eq!(response.turnover_summary.unclassified_count, 1);
        assert_eq!(response.turnover_summary.average_turnover, Some(21.0));
        assert_eq!(response.turnover_report.ranked_entries.len(), 2);
        assert_eq!(response.turnover_report.ranked_entries[0].theme_name, "DRAM");

        assert_eq!(response.watch_list_summary.total_records, 1);
        assert_eq!(response.watch_list_summary.average_turnover, None);
        let entry = response.watch_list_report.entry("记忆体").unwrap();
        assert_eq!(entry.members[0].watch_reason.as_deref(), Some("第一款"));
    }

    #[test]
    fn test_analyze_rejects_zero_top_n() {
        assert!(analyze(vec![], vec![], Some(0), &registry()).is_err());
    }
}
