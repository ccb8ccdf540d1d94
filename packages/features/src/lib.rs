#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Categorical encoding maps and temporal feature extraction for crime
//! contexts.
//!
//! Both the training pipeline and the prediction service turn raw labels
//! and date strings into a [`Context`] through this crate, so the two
//! paths cannot drift.

pub mod encoding;
pub mod temporal;

use crime_risk_crime_models::{Context, OccurrenceRecord};

pub use encoding::{
    CategoryEncoders, CategoryLabels, EncodingMap, UnknownCategoryError, UnknownLabel,
};
pub use temporal::{ParseError, TemporalFeatures};

/// An occurrence record whose date and time parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRecord<'a> {
    /// The source row.
    pub record: &'a OccurrenceRecord,
    /// Its temporal features.
    pub temporal: TemporalFeatures,
}

/// The usable rows of an occurrence log.
#[derive(Debug, Clone, Default)]
pub struct ParsedRecords<'a> {
    /// Rows whose date and time parsed, in record order.
    pub rows: Vec<ParsedRecord<'a>>,
    /// Rows dropped because their date or time did not parse.
    pub unparseable: u64,
}

impl ParsedRecords<'_> {
    /// Fits the encoding maps on the parsed rows only, so every code has a
    /// row behind it.
    #[must_use]
    pub fn fit_encoders(&self) -> CategoryEncoders {
        CategoryEncoders::fit(self.rows.iter().map(|row| row.record))
    }
}

/// Parses the date and time of every record once.
///
/// Rows with a malformed date or time are dropped, never defaulted. The
/// date column may carry a trailing time part; a missing time is midnight.
#[must_use]
pub fn parse_records(records: &[OccurrenceRecord]) -> ParsedRecords<'_> {
    let mut out = ParsedRecords {
        rows: Vec::with_capacity(records.len()),
        unparseable: 0,
    };

    for record in records {
        match temporal::extract(temporal::date_part(&record.date), record.time.as_deref()) {
            Ok(temporal) => out.rows.push(ParsedRecord { record, temporal }),
            Err(e) => {
                log::debug!("Dropping record: {e}");
                out.unparseable += 1;
            }
        }
    }

    if out.unparseable > 0 {
        log::warn!(
            "Dropped {} records with malformed date or time",
            out.unparseable
        );
    }

    out
}

/// Contexts derived from parsed occurrence rows.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContexts {
    /// One context per encodable row, in row order (duplicates kept).
    pub contexts: Vec<Context>,
    /// Rows dropped because a label has no code in the maps.
    pub unknown_category: u64,
}

/// Converts parsed rows into contexts with `encoders`.
///
/// When `encoders` were fitted on the same rows no row can carry an
/// unknown label; if one does, it is dropped under the same policy the
/// service applies.
#[must_use]
pub fn extract_contexts(rows: &[ParsedRecord<'_>], encoders: &CategoryEncoders) -> ExtractedContexts {
    let mut out = ExtractedContexts {
        contexts: Vec::with_capacity(rows.len()),
        unknown_category: 0,
    };

    for row in rows {
        match encoders.encode_context(row.temporal, CategoryLabels::from(row.record)) {
            Ok(context) => out.contexts.push(context),
            Err(e) => {
                log::debug!("Dropping record: {e}");
                out.unknown_category += 1;
            }
        }
    }

    if out.unknown_category > 0 {
        log::warn!(
            "Dropped {} records with unmapped labels",
            out.unknown_category
        );
    }

    out
}
