#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exploratory analysis parameters and report types.
//!
//! The report carries the aggregate tables behind the usual occurrence
//! charts (by type, by neighborhood, by hour, weekday × hour heatmap and
//! so on) as plain data; rendering is left to whatever consumes the JSON.

use serde::{Deserialize, Serialize};

/// Crime types broken down in detail when no focus list is given.
pub const DEFAULT_FOCUS_TYPES: &[&str] = &[
    "Furto",
    "Estupro",
    "Lesão corporal",
    "Violência doméstica",
];

/// Number of neighborhoods in the ranking when not overridden.
pub const DEFAULT_TOP_NEIGHBORHOODS: usize = 10;

/// Parameters for an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParams {
    /// Crime types to break down by hour, weekday and city. Matched
    /// case-insensitively.
    pub focus_types: Vec<String>,
    /// How many neighborhoods to rank.
    pub top_neighborhoods: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            focus_types: DEFAULT_FOCUS_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            top_neighborhoods: DEFAULT_TOP_NEIGHBORHOODS,
        }
    }
}

/// A category label with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Number of occurrences.
    pub count: u64,
}

/// A time-series data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Period label (e.g. "2024").
    pub period: String,
    /// Occurrences in this period.
    pub count: u64,
}

/// Share of one investigation status within a crime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusShare {
    /// Status label.
    pub status: String,
    /// Occurrences with this status.
    pub count: u64,
    /// `count` over the crime type's rows that carry a status.
    pub proportion: f64,
}

/// Investigation status distribution for one crime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    /// Crime type label.
    pub crime_type: String,
    /// Rows of this type that carry a status.
    pub total: u64,
    /// Statuses, most frequent first.
    pub statuses: Vec<StatusShare>,
}

/// Hourly counts within one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityHours {
    /// City name.
    pub city: String,
    /// 24 buckets, hour 0 first.
    pub by_hour: Vec<u64>,
}

/// Detailed breakdown of one focus crime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusBreakdown {
    /// The requested crime type.
    pub crime_type: String,
    /// Matching occurrences.
    pub total: u64,
    /// 24 buckets, hour 0 first.
    pub by_hour: Vec<u64>,
    /// 7 buckets, Monday first.
    pub by_weekday: Vec<u64>,
    /// 7 rows (Monday first) of 24 hourly buckets.
    pub weekday_hour: Vec<Vec<u64>>,
    /// Cities, most frequent first.
    pub by_city: Vec<CategoryCount>,
    /// Hourly counts per city, in `by_city` order.
    pub hour_by_city: Vec<CityHours>,
}

/// The full exploratory report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Rows considered.
    pub total_rows: u64,
    /// Rows dropped because their date or time did not parse.
    pub dropped_rows: u64,
    /// Weekday labels for the weekday buckets, Monday first.
    pub weekday_labels: Vec<String>,
    /// Crime types, most frequent first.
    pub by_crime_type: Vec<CategoryCount>,
    /// The most affected neighborhoods, most frequent first.
    pub top_neighborhoods: Vec<CategoryCount>,
    /// Occurrences per year, oldest first.
    pub by_year: Vec<TimeSeriesPoint>,
    /// 24 buckets, hour 0 first.
    pub by_hour: Vec<u64>,
    /// 7 rows (Monday first) of 24 hourly buckets.
    pub weekday_hour: Vec<Vec<u64>>,
    /// Investigation status shares per crime type.
    pub status_by_crime_type: Vec<StatusBreakdown>,
    /// One entry per requested focus type.
    pub focus: Vec<FocusBreakdown>,
}
