//! Result aggregation for the summary views.
//!
//! Stored results carry the metrics computed when they were saved, but those
//! are never shown as-is: every record is re-scored against its template at
//! read time. A record whose template has since been deleted is still shown,
//! with neutral metrics.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::count_key::{CountKey, CountsMap};
use crate::error::ValidationError;
use crate::metrics::{ItemShare, Metrics, Rank, breakdown, compute_metrics};
use crate::model::{ResultRecord, SurveyTemplate};

/// Inclusive time window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// One calendar day in `tz`, from 00:00:00.000 to 23:59:59.999.
    pub fn day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<Self, ValidationError> {
        Self::range(date, date, tz)
    }

    /// From the start of `first` to the last millisecond of `last`, in `tz`.
    pub fn range<Tz: TimeZone>(
        first: NaiveDate,
        last: NaiveDate,
        tz: &Tz,
    ) -> Result<Self, ValidationError> {
        if first > last {
            return Err(ValidationError::InvertedDateRange {
                start: first.to_string(),
                end: last.to_string(),
            });
        }
        let end_of_day = last
            .and_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(|| ValidationError::NonexistentLocalTime(last.to_string()))?;
        let start = resolve_local(first.and_time(NaiveTime::MIN), tz, Bound::Earliest)?;
        let end = resolve_local(end_of_day, tz, Bound::Latest)?;
        Self::new(start, end)
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }
}

enum Bound {
    Earliest,
    Latest,
}

/// Local wall-clock time to UTC. Ambiguous times (DST fall-back) widen the
/// window rather than narrow it.
fn resolve_local<Tz: TimeZone>(
    naive: NaiveDateTime,
    tz: &Tz,
    bound: Bound,
) -> Result<DateTime<Utc>, ValidationError> {
    let mapped = tz.from_local_datetime(&naive);
    let picked = match bound {
        Bound::Earliest => mapped.earliest(),
        Bound::Latest => mapped.latest(),
    };
    picked
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::NonexistentLocalTime(naive.to_string()))
}

/// A stored result with freshly computed metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedResult {
    pub record: ResultRecord,
    pub metrics: Metrics,
}

impl AnnotatedResult {
    pub fn total_count(&self) -> u64 {
        self.metrics.total
    }

    pub fn discovery_rate(&self) -> f64 {
        self.metrics.discovery_rate
    }

    pub fn rank(&self) -> Rank {
        self.metrics.rank
    }

    pub fn counts(&self) -> &CountsMap {
        &self.record.counts
    }
}

/// Re-score each record against the template it was taken with.
pub fn annotate<I>(records: I, templates: &[SurveyTemplate]) -> Vec<AnnotatedResult>
where
    I: IntoIterator<Item = ResultRecord>,
{
    let by_id: HashMap<&str, &SurveyTemplate> =
        templates.iter().map(|t| (t.id.as_str(), t)).collect();

    records
        .into_iter()
        .map(|record| {
            let template = by_id.get(record.survey_id.as_str()).copied();
            if template.is_none() {
                debug!(
                    result_id = %record.id,
                    survey_id = %record.survey_id,
                    "no template for result, using neutral metrics"
                );
            }
            let metrics = compute_metrics(template, &record.counts);
            AnnotatedResult { record, metrics }
        })
        .collect()
}

/// A single stored result, item by item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDetail {
    pub record: ResultRecord,
    pub metrics: Metrics,
    /// Template order when the template exists, otherwise the record's own
    /// keys in sorted order.
    pub items: Vec<ItemShare>,
    pub has_template: bool,
}

/// Lay out one record against its template. Without a template the metrics
/// are neutral and shares are taken against the record's own total.
pub fn detail(record: ResultRecord, templates: &[SurveyTemplate]) -> ResultDetail {
    match templates.iter().find(|t| t.id == record.survey_id) {
        Some(template) => ResultDetail {
            metrics: compute_metrics(Some(template), &record.counts),
            items: breakdown(template, &record.counts),
            has_template: true,
            record,
        },
        None => {
            debug!(result_id = %record.id, survey_id = %record.survey_id, "no template for result detail");
            let total = record.counts.sum();
            let items = record
                .counts
                .iter()
                .map(|(key, count)| ItemShare {
                    category: key.category(),
                    item: key.item().to_string(),
                    count,
                    share: if total > 0 {
                        count as f64 / total as f64 * 100.0
                    } else {
                        0.0
                    },
                })
                .collect();
            ResultDetail {
                metrics: Metrics::NEUTRAL,
                items,
                has_template: false,
                record,
            }
        }
    }
}

/// Records surveyed inside `window`, annotated.
pub fn query<I>(records: I, templates: &[SurveyTemplate], window: &DateWindow) -> Vec<AnnotatedResult>
where
    I: IntoIterator<Item = ResultRecord>,
{
    let in_window = records
        .into_iter()
        .filter(|r| window.contains(&r.surveyed_at));
    annotate(in_window, templates)
}

/// X axis plus the two plotted series of the trend chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub surveyed_at: Vec<DateTime<Utc>>,
    pub discovery_rate: Vec<f64>,
    pub total_count: Vec<u64>,
}

/// Multi-record view: a pivot table keyed by every count key seen, and a
/// chronological trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    /// Sorted by `surveyed_at`, oldest first.
    pub rows: Vec<AnnotatedResult>,
    /// Union of count keys across all rows, sorted.
    pub columns: Vec<CountKey>,
    pub trend: TrendSeries,
}

impl PeriodReport {
    pub fn build(mut rows: Vec<AnnotatedResult>) -> Self {
        rows.sort_by_key(|r| r.record.surveyed_at);

        let columns = rows
            .iter()
            .flat_map(|r| r.record.counts.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let trend = TrendSeries {
            surveyed_at: rows.iter().map(|r| r.record.surveyed_at).collect(),
            discovery_rate: rows.iter().map(AnnotatedResult::discovery_rate).collect(),
            total_count: rows.iter().map(AnnotatedResult::total_count).collect(),
        };

        Self {
            rows,
            columns,
            trend,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, MappedLocalTime, Timelike};

    /// Fixed -05:00 zone, except that 02:00..03:00 on 2026-03-08 does not
    /// exist and 01:00..02:00 on 2026-11-01 happens twice (-04:00, then -05:00).
    #[derive(Debug, Clone, Copy)]
    struct Shifting;

    const WINTER: i32 = -5 * 3600;
    const SUMMER: i32 = -4 * 3600;

    impl TimeZone for Shifting {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            Shifting
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> MappedLocalTime<FixedOffset> {
            MappedLocalTime::Single(fixed(WINTER))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> MappedLocalTime<FixedOffset> {
            let day = local.date();
            if day == date("2026-03-08") && local.hour() == 2 {
                MappedLocalTime::None
            } else if day == date("2026-11-01") && local.hour() == 1 {
                MappedLocalTime::Ambiguous(fixed(SUMMER), fixed(WINTER))
            } else {
                MappedLocalTime::Single(fixed(WINTER))
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            fixed(WINTER)
        }

        fn offset_from_utc_datetime(&self, _: &NaiveDateTime) -> FixedOffset {
            fixed(WINTER)
        }
    }

    fn fixed(secs: i32) -> FixedOffset {
        FixedOffset::east_opt(secs).unwrap()
    }

    fn local(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn skipped_local_time_is_an_error() {
        let err = resolve_local(local("2026-03-08T02:30:00"), &Shifting, Bound::Earliest).unwrap_err();
        assert!(matches!(err, ValidationError::NonexistentLocalTime(t) if t.contains("02:30")));
    }

    #[test]
    fn repeated_local_time_widens_the_window() {
        let at = local("2026-11-01T01:30:00");
        let start = resolve_local(at, &Shifting, Bound::Earliest).unwrap();
        let end = resolve_local(at, &Shifting, Bound::Latest).unwrap();
        assert_eq!(start, utc("2026-11-01T05:30:00Z"));
        assert_eq!(end, utc("2026-11-01T06:30:00Z"));
    }

    #[test]
    fn day_window_outside_transitions_uses_the_zone() {
        let w = DateWindow::day(date("2026-03-08"), &Shifting).unwrap();
        assert_eq!(w.start, utc("2026-03-08T05:00:00Z"));
        assert_eq!(w.end, utc("2026-03-09T04:59:59.999Z"));
    }

    fn template(id: &str) -> SurveyTemplate {
        SurveyTemplate {
            id: id.into(),
            name: format!("Survey {id}"),
            no: None,
            real_work: vec!["A".into()],
            incidental_work: vec!["B".into()],
            wasteful_work: vec!["C".into()],
            created_at: None,
        }
    }

    fn record(id: &str, survey_id: &str, at: &str, counts: &[(&str, u64)]) -> ResultRecord {
        ResultRecord {
            id: id.into(),
            instance_id: format!("inst-{id}"),
            survey_id: survey_id.into(),
            survey_name: format!("Survey {survey_id}"),
            counts: counts.iter().map(|(k, v)| (k.parse::<CountKey>().unwrap(), *v)).collect(),
            // Stale values from save time; aggregation must not trust them.
            total_count: 999,
            discovery_rate: 99.0,
            rank: Rank::D,
            surveyed_at: at.parse().unwrap(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn day_window_spans_whole_day() {
        let w = DateWindow::day(date("2026-03-02"), &Utc).unwrap();
        assert_eq!(w.start.to_rfc3339(), "2026-03-02T00:00:00+00:00");
        assert_eq!(w.end, "2026-03-02T23:59:59.999Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn day_window_respects_local_offset() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let w = DateWindow::day(date("2026-03-02"), &jst).unwrap();
        assert_eq!(w.start, "2026-03-01T15:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(w.end, "2026-03-02T14:59:59.999Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateWindow::range(date("2026-03-05"), date("2026-03-01"), &Utc).unwrap_err();
        assert!(matches!(err, ValidationError::InvertedDateRange { .. }));
    }

    #[test]
    fn single_day_query_returns_only_that_day() {
        let records = vec![
            record("r1", "t1", "2026-03-01T10:00:00Z", &[("real-A", 1)]),
            record("r2", "t1", "2026-03-02T10:00:00Z", &[("real-A", 2)]),
        ];
        let w = DateWindow::day(date("2026-03-02"), &Utc).unwrap();
        let found = query(records, &[template("t1")], &w);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record.id, "r2");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let records = vec![
            record("first", "t1", "2026-03-02T00:00:00.000Z", &[]),
            record("last", "t1", "2026-03-02T23:59:59.999Z", &[]),
            record("after", "t1", "2026-03-03T00:00:00.000Z", &[]),
        ];
        let w = DateWindow::day(date("2026-03-02"), &Utc).unwrap();
        let ids: Vec<String> = query(records, &[], &w)
            .into_iter()
            .map(|r| r.record.id)
            .collect();
        assert_eq!(ids, ["first", "last"]);
    }

    #[test]
    fn metrics_are_recomputed_not_trusted() {
        let rows = annotate(
            vec![record(
                "r1",
                "t1",
                "2026-03-01T10:00:00Z",
                &[("incidental-B", 1), ("wasteful-C", 2)],
            )],
            &[template("t1")],
        );
        assert_eq!(rows[0].total_count(), 3);
        assert!((rows[0].discovery_rate() - 40.0).abs() < 1e-9);
        assert_eq!(rows[0].rank(), Rank::D);
    }

    #[test]
    fn orphaned_results_get_neutral_metrics() {
        let rows = annotate(
            vec![
                record("r1", "gone", "2026-03-01T10:00:00Z", &[("wasteful-C", 5)]),
                record("r2", "t1", "2026-03-01T11:00:00Z", &[("real-A", 1)]),
            ],
            &[template("t1")],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metrics, Metrics::NEUTRAL);
        assert_eq!(rows[1].total_count(), 1);
    }

    #[test]
    fn period_report_sorts_rows_and_unions_columns() {
        let t2 = SurveyTemplate {
            real_work: vec!["Z".into()],
            ..template("t2")
        };
        let rows = annotate(
            vec![
                record("late", "t2", "2026-03-05T08:00:00Z", &[("real-Z", 4), ("incidental-B", 0)]),
                record(
                    "early",
                    "t1",
                    "2026-03-01T08:00:00Z",
                    &[("wasteful-C", 1), ("real-A", 1)],
                ),
            ],
            &[template("t1"), t2],
        );
        let report = PeriodReport::build(rows);

        let ids: Vec<&str> = report.rows.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);

        let cols: Vec<String> = report.columns.iter().map(ToString::to_string).collect();
        assert_eq!(cols, ["incidental-B", "real-A", "real-Z", "wasteful-C"]);

        assert_eq!(report.trend.total_count, [2, 4]);
        assert!((report.trend.discovery_rate[0] - 25.0).abs() < 1e-9);
        assert_eq!(report.trend.discovery_rate[1], 0.0);
        assert!(report.trend.surveyed_at[0] < report.trend.surveyed_at[1]);
    }

    #[test]
    fn detail_lays_out_a_result_against_its_template() {
        let d = detail(
            record("r1", "t1", "2026-03-01T10:00:00Z", &[("incidental-B", 1), ("wasteful-C", 3)]),
            &[template("t1")],
        );
        assert!(d.has_template);
        assert_eq!(d.metrics.total, 4);
        assert_eq!(d.metrics.rank, Rank::D);
        let items: Vec<(&str, u64)> = d.items.iter().map(|i| (i.item.as_str(), i.count)).collect();
        assert_eq!(items, [("A", 0), ("B", 1), ("C", 3)]);
        assert!((d.items[2].share - 75.0).abs() < 1e-9);
    }

    #[test]
    fn detail_without_template_lists_recorded_keys() {
        let d = detail(
            record("r1", "gone", "2026-03-01T10:00:00Z", &[("wasteful-C", 1), ("real-A", 3)]),
            &[template("t1")],
        );
        assert!(!d.has_template);
        assert_eq!(d.metrics, Metrics::NEUTRAL);
        let items: Vec<(&str, u64)> = d.items.iter().map(|i| (i.item.as_str(), i.count)).collect();
        assert_eq!(items, [("A", 3), ("C", 1)]);
        assert!((d.items[0].share - 75.0).abs() < 1e-9);
    }

    #[test]
    fn empty_report() {
        let report = PeriodReport::build(Vec::new());
        assert!(report.is_empty());
        assert!(report.columns.is_empty());
        assert!(report.trend.surveyed_at.is_empty());
    }
}
