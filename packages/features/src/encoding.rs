//! Label ↔ code encoding maps for the categorical context fields.
//!
//! Codes are ranks in the sorted set of distinct labels, so rebuilding a
//! map from the same labels always yields the same assignment no matter
//! the row order. A label that is not in the map has no code; callers get
//! `None` and decide what that means. [`CategoryEncoders::encode_context`]
//! decides for both training and serving: unknown labels are rejected.

use std::collections::{BTreeMap, BTreeSet};

use crime_risk_crime_models::{CategoryField, Context, OccurrenceRecord};
use serde::{Deserialize, Serialize};

use crate::temporal::TemporalFeatures;

/// A bijection between the distinct labels of one field and `0..n`.
///
/// Serialized as a JSON object `label → code`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct EncodingMap {
    /// Sorted, distinct labels; a label's code is its index.
    labels: Vec<String>,
}

impl EncodingMap {
    /// Builds a map from any collection of labels. Duplicates and order
    /// are irrelevant.
    #[must_use]
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        Self {
            labels: distinct.into_iter().collect(),
        }
    }

    /// Returns the code for `label`, or `None` when it was never seen.
    #[must_use]
    pub fn code(&self, label: &str) -> Option<u32> {
        self.labels
            .binary_search_by(|probe| probe.as_str().cmp(label))
            .ok()
            .and_then(|index| u32::try_from(index).ok())
    }

    /// Returns the label for `code`.
    #[must_use]
    pub fn label(&self, code: u32) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|index| self.labels.get(index))
            .map(String::as_str)
    }

    /// Labels in code order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if the map has no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Error returned when a persisted map is not a valid rank assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("label '{label}' has code {code}, expected {expected}")]
pub struct InvalidEncodingMapError {
    /// Offending label.
    pub label: String,
    /// Code found in the map.
    pub code: u32,
    /// Code the label's sort position requires.
    pub expected: u32,
}

impl TryFrom<BTreeMap<String, u32>> for EncodingMap {
    type Error = InvalidEncodingMapError;

    fn try_from(map: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        let mut labels = Vec::with_capacity(map.len());
        for (expected, (label, code)) in (0_u32..).zip(map) {
            if code != expected {
                return Err(InvalidEncodingMapError {
                    label,
                    code,
                    expected,
                });
            }
            labels.push(label);
        }
        Ok(Self { labels })
    }
}

impl From<EncodingMap> for BTreeMap<String, u32> {
    fn from(map: EncodingMap) -> Self {
        (0_u32..).zip(map.labels).map(|(code, label)| (label, code)).collect()
    }
}

/// Raw categorical labels of one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLabels<'a> {
    /// Neighborhood name.
    pub neighborhood: &'a str,
    /// City name.
    pub city: &'a str,
    /// Crime type label.
    pub crime_type: &'a str,
}

impl<'a> From<&'a OccurrenceRecord> for CategoryLabels<'a> {
    fn from(record: &'a OccurrenceRecord) -> Self {
        Self {
            neighborhood: &record.neighborhood,
            city: &record.city,
            crime_type: &record.crime_type,
        }
    }
}

/// A label that has no code in its field's map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel {
    /// The field the label was given for.
    pub field: CategoryField,
    /// The label as received.
    pub label: String,
}

impl std::fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' not found in mapping", self.field, self.label)
    }
}

/// One or more labels of a context are absent from the persisted maps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {}", join_labels(.unknown))]
pub struct UnknownCategoryError {
    /// Every unknown label, in field order.
    pub unknown: Vec<UnknownLabel>,
}

fn join_labels(unknown: &[UnknownLabel]) -> String {
    unknown
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The three encoding maps of a training run.
///
/// Built once from the training records and carried, unchanged, inside
/// the artifact bundle to the prediction service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryEncoders {
    /// Neighborhood map.
    #[serde(rename = "bairros")]
    pub neighborhoods: EncodingMap,
    /// City map.
    #[serde(rename = "cidades")]
    pub cities: EncodingMap,
    /// Crime type map.
    #[serde(rename = "tiposCrime")]
    pub crime_types: EncodingMap,
}

impl CategoryEncoders {
    /// Builds all three maps from the distinct labels in `records`.
    #[must_use]
    pub fn fit<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a OccurrenceRecord>,
        I::IntoIter: Clone,
    {
        let records = records.into_iter();
        Self {
            neighborhoods: EncodingMap::from_labels(records.clone().map(|r| &r.neighborhood)),
            cities: EncodingMap::from_labels(records.clone().map(|r| &r.city)),
            crime_types: EncodingMap::from_labels(records.map(|r| &r.crime_type)),
        }
    }

    /// Returns the map for `field`.
    #[must_use]
    pub const fn map(&self, field: CategoryField) -> &EncodingMap {
        match field {
            CategoryField::Neighborhood => &self.neighborhoods,
            CategoryField::City => &self.cities,
            CategoryField::CrimeType => &self.crime_types,
        }
    }

    /// Encodes one context.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCategoryError`] naming every label that has no
    /// code. Unknown labels are never mapped to an existing code.
    pub fn encode_context(
        &self,
        temporal: TemporalFeatures,
        labels: CategoryLabels<'_>,
    ) -> Result<Context, UnknownCategoryError> {
        let mut unknown = Vec::new();
        let mut lookup = |field: CategoryField, label: &str| {
            let code = self.map(field).code(label);
            if code.is_none() {
                unknown.push(UnknownLabel {
                    field,
                    label: label.to_string(),
                });
            }
            code
        };

        let neighborhood = lookup(CategoryField::Neighborhood, labels.neighborhood);
        let city = lookup(CategoryField::City, labels.city);
        let crime_type = lookup(CategoryField::CrimeType, labels.crime_type);

        match (neighborhood, city, crime_type) {
            (Some(neighborhood), Some(city), Some(crime_type)) => Ok(Context {
                day_of_week: temporal.day_of_week,
                hour: temporal.hour,
                month: temporal.month,
                year: temporal.year,
                neighborhood,
                city,
                crime_type,
            }),
            _ => Err(UnknownCategoryError { unknown }),
        }
    }
}
