//! Aggregations over occurrence records.

use std::collections::BTreeMap;

use chrono::Weekday;
use crime_risk_analytics_models::{
    AnalysisParams, AnalysisReport, CategoryCount, CityHours, FocusBreakdown, StatusBreakdown,
    StatusShare, TimeSeriesPoint,
};
use crime_risk_crime_models::OccurrenceRecord;
use crime_risk_features::{ParsedRecord, parse_records};

const HOURS: usize = 24;
const WEEKDAYS: usize = 7;

/// Builds the full report from `records`.
///
/// Rows whose date or time does not parse are counted in
/// [`AnalysisReport::dropped_rows`] and left out of every table. A missing
/// time counts as midnight.
#[must_use]
pub fn analyze(records: &[OccurrenceRecord], params: &AnalysisParams) -> AnalysisReport {
    let parsed = parse_records(records);
    let dropped_rows = parsed.unparseable;
    let parsed = parsed.rows;

    let mut top_neighborhoods = ranked(parsed.iter().map(|p| p.record.neighborhood.as_str()));
    top_neighborhoods.truncate(params.top_neighborhoods);

    let mut by_hour = vec![0; HOURS];
    let mut weekday_hour = vec![vec![0; HOURS]; WEEKDAYS];
    let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
    for p in &parsed {
        let hour = usize::from(p.temporal.hour);
        by_hour[hour] += 1;
        weekday_hour[usize::from(p.temporal.day_of_week)][hour] += 1;
        *by_year.entry(p.temporal.year).or_default() += 1;
    }

    AnalysisReport {
        total_rows: records.len() as u64,
        dropped_rows,
        weekday_labels: weekday_labels(),
        by_crime_type: ranked(parsed.iter().map(|p| p.record.crime_type.as_str())),
        top_neighborhoods,
        by_year: by_year
            .into_iter()
            .map(|(year, count)| TimeSeriesPoint {
                period: year.to_string(),
                count,
            })
            .collect(),
        by_hour,
        weekday_hour,
        status_by_crime_type: status_breakdown(&parsed),
        focus: params
            .focus_types
            .iter()
            .map(|crime_type| focus_breakdown(&parsed, crime_type))
            .collect(),
    }
}

/// Weekday names, Monday first.
#[must_use]
pub fn weekday_labels() -> Vec<String> {
    (0..7_u8)
        .filter_map(|day| Weekday::try_from(day).ok())
        .map(|day| day.to_string())
        .collect()
}

/// Counts labels, most frequent first; ties by label.
fn ranked<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    out
}

#[allow(clippy::cast_precision_loss)]
fn status_breakdown(parsed: &[ParsedRecord<'_>]) -> Vec<StatusBreakdown> {
    let mut by_type: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for p in parsed {
        if let Some(status) = p
            .record
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            by_type
                .entry(p.record.crime_type.as_str())
                .or_default()
                .push(status);
        }
    }

    by_type
        .into_iter()
        .map(|(crime_type, statuses)| {
            let total = statuses.len() as u64;
            let statuses = ranked(statuses.into_iter())
                .into_iter()
                .map(|c| StatusShare {
                    proportion: c.count as f64 / total as f64,
                    status: c.category,
                    count: c.count,
                })
                .collect();
            StatusBreakdown {
                crime_type: crime_type.to_string(),
                total,
                statuses,
            }
        })
        .collect()
}

fn focus_breakdown(parsed: &[ParsedRecord<'_>], crime_type: &str) -> FocusBreakdown {
    let wanted = crime_type.to_lowercase();
    let matching: Vec<&ParsedRecord<'_>> = parsed
        .iter()
        .filter(|p| p.record.crime_type.to_lowercase() == wanted)
        .collect();

    let mut by_hour = vec![0; HOURS];
    let mut by_weekday = vec![0; WEEKDAYS];
    let mut weekday_hour = vec![vec![0; HOURS]; WEEKDAYS];
    let mut city_hours: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for p in &matching {
        let hour = usize::from(p.temporal.hour);
        let day = usize::from(p.temporal.day_of_week);
        by_hour[hour] += 1;
        by_weekday[day] += 1;
        weekday_hour[day][hour] += 1;
        city_hours
            .entry(p.record.city.as_str())
            .or_insert_with(|| vec![0; HOURS])[hour] += 1;
    }

    let by_city = ranked(matching.iter().map(|p| p.record.city.as_str()));
    let hour_by_city = by_city
        .iter()
        .filter_map(|c| {
            city_hours.remove(c.category.as_str()).map(|by_hour| CityHours {
                city: c.category.clone(),
                by_hour,
            })
        })
        .collect();

    FocusBreakdown {
        crime_type: crime_type.to_string(),
        total: matching.len() as u64,
        by_hour,
        by_weekday,
        weekday_hour,
        by_city,
        hour_by_city,
    }
}
