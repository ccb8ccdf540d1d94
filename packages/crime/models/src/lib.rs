#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Context, occurrence and report types shared across the crime risk
//! workspace.
//!
//! A [`Context`] is the unit of classification: a discretized
//! (time, place, crime type) cell. Raw CSV rows are [`OccurrenceRecord`]s;
//! the training pipeline turns them into labeled contexts and the
//! prediction service turns a single request into one context.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{Display, EnumIter, EnumString};

/// One feature column of a [`Context`], in classifier input order.
///
/// Display names are the column names the model was originally trained
/// with so exported reports stay readable next to older runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum ContextField {
    /// Day of week, 0 = Monday.
    #[strum(serialize = "dia_semana_num")]
    DayOfWeek,
    /// Hour of day, 0-23.
    #[strum(serialize = "hora_do_dia")]
    Hour,
    /// Month, 1-12.
    #[strum(serialize = "mes")]
    Month,
    /// Calendar year.
    #[strum(serialize = "ano")]
    Year,
    /// Encoded neighborhood.
    #[strum(serialize = "bairro_encoded")]
    Neighborhood,
    /// Encoded city.
    #[strum(serialize = "cidade_encoded")]
    City,
    /// Encoded crime type.
    #[strum(serialize = "tipo_crime_encoded")]
    CrimeType,
}

impl ContextField {
    /// Returns all fields in classifier input order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DayOfWeek,
            Self::Hour,
            Self::Month,
            Self::Year,
            Self::Neighborhood,
            Self::City,
            Self::CrimeType,
        ]
    }
}

/// The three categorical fields that go through an encoding map.
///
/// Display names are the request/CSV field names so error messages point
/// at the field the caller actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
pub enum CategoryField {
    /// Neighborhood (`bairro`).
    #[strum(serialize = "bairro")]
    Neighborhood,
    /// City (`cidade`).
    #[strum(serialize = "cidade")]
    City,
    /// Crime type (`tipo_crime`).
    #[strum(serialize = "tipo_crime")]
    CrimeType,
}

/// A discretized space-time-category cell.
///
/// Field order is significant: it is both the derived ordering and the
/// feature order handed to the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Day of week, 0 = Monday through 6 = Sunday.
    pub day_of_week: u8,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Month, 1-12.
    pub month: u8,
    /// Calendar year.
    pub year: i32,
    /// Neighborhood code from the neighborhood encoding map.
    pub neighborhood: u32,
    /// City code from the city encoding map.
    pub city: u32,
    /// Crime type code from the crime type encoding map.
    pub crime_type: u32,
}

impl Context {
    /// Number of classifier features per context.
    pub const FEATURE_COUNT: usize = 7;

    /// Returns the numeric value of a single field.
    #[must_use]
    pub fn value(&self, field: ContextField) -> i64 {
        match field {
            ContextField::DayOfWeek => i64::from(self.day_of_week),
            ContextField::Hour => i64::from(self.hour),
            ContextField::Month => i64::from(self.month),
            ContextField::Year => i64::from(self.year),
            ContextField::Neighborhood => i64::from(self.neighborhood),
            ContextField::City => i64::from(self.city),
            ContextField::CrimeType => i64::from(self.crime_type),
        }
    }

    /// Returns the feature vector in [`ContextField::all`] order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn features(&self) -> [f32; Self::FEATURE_COUNT] {
        let mut out = [0.0; Self::FEATURE_COUNT];
        for (slot, field) in out.iter_mut().zip(ContextField::iter()) {
            *slot = self.value(field) as f32;
        }
        out
    }
}

/// Binary classification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// No occurrence recorded; synthesized.
    Absent = 0,
    /// An occurrence was recorded in the context.
    Occurred = 1,
}

impl Target {
    /// Returns the 0/1 label.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Returns `true` for [`Target::Occurred`].
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Occurred)
    }
}

/// A context together with its binary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabeledContext {
    /// The context cell.
    pub context: Context,
    /// Whether an occurrence was recorded there.
    pub target: Target,
}

impl LabeledContext {
    /// Labels `context` as an observed occurrence.
    #[must_use]
    pub const fn positive(context: Context) -> Self {
        Self {
            context,
            target: Target::Occurred,
        }
    }

    /// Labels `context` as a synthesized absence.
    #[must_use]
    pub const fn negative(context: Context) -> Self {
        Self {
            context,
            target: Target::Absent,
        }
    }
}

/// One row of the occurrence log, as read from CSV.
///
/// Header names follow the source export; older exports used
/// `tipo_crime` and `status_crime`, accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    /// Date, `YYYY-MM-DD` (a trailing time part is tolerated).
    #[serde(rename = "dia")]
    pub date: String,
    /// Time of day, `HH:MM`. Missing means midnight.
    #[serde(rename = "hora", default)]
    pub time: Option<String>,
    /// City name.
    #[serde(rename = "cidade")]
    pub city: String,
    /// Neighborhood name.
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    /// Crime type label.
    #[serde(rename = "tipo_de_crime", alias = "tipo_crime")]
    pub crime_type: String,
    /// Investigation status, used only by the exploratory analysis.
    #[serde(rename = "status_investigacao", alias = "status_crime", default)]
    pub status: Option<String>,
}

/// A neighborhood as exposed to clients building input controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodRecord {
    /// Neighborhood name.
    #[serde(rename = "bairro")]
    pub name: String,
    /// The city this neighborhood belongs to.
    #[serde(rename = "cidade")]
    pub city: String,
    /// Latitude, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latitude: Option<f64>,
    /// Longitude, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub longitude: Option<f64>,
}

/// Held-out evaluation of a trained classifier.
///
/// Diagnostic only; nothing enforces a minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    /// Fraction of correct predictions at threshold 0.5.
    pub accuracy: f64,
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Area under the ROC curve; `None` when the test split has one class.
    pub roc_auc: Option<f64>,
    /// Negative/positive ratio of the training split passed to the learner.
    pub scale_pos_weight: f64,
    /// Number of training examples.
    pub train_size: usize,
    /// Number of held-out examples.
    pub test_size: usize,
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accuracy {:.3} | precision {:.3} | recall {:.3} | f1 {:.3} | roc auc ",
            self.accuracy, self.precision, self.recall, self.f1
        )?;
        match self.roc_auc {
            Some(auc) => write!(f, "{auc:.3}"),
            None => write!(f, "n/a"),
        }
    }
}
