//! Result search for the summary views.

use tracing::info;
use worktally_core::{AnnotatedResult, DateWindow, PeriodReport, ResultDetail, SurveyTemplate, aggregate};

use crate::SyncError;
use crate::api::ResultApi;

/// Results surveyed within `window`, re-scored against `templates`.
///
/// The server filters by the same window; filtering again locally keeps
/// the inclusive bounds exact whatever the server's rounding.
pub async fn search_results<R: ResultApi + ?Sized>(
    results: &R,
    templates: &[SurveyTemplate],
    window: &DateWindow,
) -> Result<Vec<AnnotatedResult>, SyncError> {
    let records = results.query_results(window).await?;
    let found = aggregate::query(records, templates, window);
    info!(count = found.len(), start = %window.start, end = %window.end, "results found");
    Ok(found)
}

/// [`search_results`] shaped for the pivot table and trend chart.
pub async fn period_report<R: ResultApi + ?Sized>(
    results: &R,
    templates: &[SurveyTemplate],
    window: &DateWindow,
) -> Result<PeriodReport, SyncError> {
    Ok(PeriodReport::build(search_results(results, templates, window).await?))
}

/// One saved result by id, laid out against its template.
pub async fn find_result<R: ResultApi + ?Sized>(
    results: &R,
    templates: &[SurveyTemplate],
    id: &str,
) -> Result<ResultDetail, SyncError> {
    let record = results
        .list_all_results()
        .await?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| SyncError::NotFound {
            kind: "result",
            id: id.to_string(),
        })?;
    Ok(aggregate::detail(record, templates))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use worktally_core::{CountKey, Rank, ResultRecord};

    use super::*;
    use crate::fake::FakeRemote;

    fn template() -> SurveyTemplate {
        SurveyTemplate {
            id: "t1".into(),
            name: "ABC".into(),
            no: None,
            real_work: vec!["A".into()],
            incidental_work: vec!["B".into()],
            wasteful_work: vec!["C".into()],
            created_at: None,
        }
    }

    fn record(id: &str, at: &str, counts: &[(&str, u64)]) -> ResultRecord {
        ResultRecord {
            id: id.into(),
            instance_id: format!("inst-{id}"),
            survey_id: "t1".into(),
            survey_name: "ABC".into(),
            counts: counts
                .iter()
                .map(|(k, v)| (k.parse::<CountKey>().unwrap(), *v))
                .collect(),
            total_count: 0,
            discovery_rate: 0.0,
            rank: Rank::NotApplicable,
            surveyed_at: at.parse().unwrap(),
        }
    }

    fn remote() -> FakeRemote {
        let remote = FakeRemote::default();
        remote.results.lock().unwrap().extend([
            record("r1", "2026-03-01T10:00:00Z", &[("real-A", 3)]),
            record("r2", "2026-03-02T10:00:00Z", &[("incidental-B", 1), ("wasteful-C", 2)]),
        ]);
        remote
    }

    fn day(s: &str) -> DateWindow {
        DateWindow::day(s.parse::<NaiveDate>().unwrap(), &Utc).unwrap()
    }

    #[tokio::test]
    async fn single_day_search_finds_only_that_day() {
        let found = search_results(&remote(), &[template()], &day("2026-03-02"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record.id, "r2");
        assert_eq!(found[0].rank(), Rank::D);
        assert_eq!(found[0].total_count(), 3);
    }

    #[tokio::test]
    async fn period_report_spans_the_range() {
        let window = DateWindow::range(
            "2026-03-01".parse().unwrap(),
            "2026-03-02".parse().unwrap(),
            &Utc,
        )
        .unwrap();
        let report = period_report(&remote(), &[template()], &window).await.unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.columns.len(), 3);
        assert_eq!(report.trend.total_count, [3, 3]);
    }

    #[tokio::test]
    async fn find_result_scores_one_record() {
        let detail = find_result(&remote(), &[template()], "r2").await.unwrap();
        assert_eq!(detail.record.id, "r2");
        assert_eq!(detail.metrics.total, 3);
        assert_eq!(detail.metrics.rank, Rank::D);
        assert_eq!(detail.items.len(), 3);
    }

    #[tokio::test]
    async fn find_result_without_template_is_neutral() {
        let detail = find_result(&remote(), &[], "r1").await.unwrap();
        assert!(!detail.has_template);
        assert_eq!(detail.metrics.rank, Rank::NotApplicable);
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].count, 3);
    }

    #[tokio::test]
    async fn find_result_reports_unknown_id() {
        let err = find_result(&remote(), &[template()], "nope").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound { kind: "result", ref id } if id == "nope"));
    }

    #[tokio::test]
    async fn search_without_templates_still_lists_results() {
        let found = search_results(&remote(), &[], &day("2026-03-01")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rank(), Rank::NotApplicable);
    }
}
