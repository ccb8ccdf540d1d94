//! The versioned artifact bundle: one JSON file holding the trained model,
//! the three encoding maps and the metadata the service exposes.
//!
//! The maps and the model only make sense together, so they are written
//! and read as one unit. A fingerprint of the maps is stored next to them
//! and checked on load.

use std::fs;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use chrono::{DateTime, Utc};
use crime_risk_crime_models::{ClassificationReport, NeighborhoodRecord};
use crime_risk_features::CategoryEncoders;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tempfile::NamedTempFile;

use crate::GbdtRiskModel;

/// Bundle layout version written by this build.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Errors that can occur while saving or loading a bundle.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed bundle JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Written by an incompatible build.
    #[error("unsupported bundle format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// The encoding maps do not match the stored fingerprint.
    #[error("encoding map fingerprint mismatch: stored {stored}, computed {computed}")]
    FingerprintMismatch {
        /// Fingerprint recorded at training time.
        stored: String,
        /// Fingerprint of the maps actually in the file.
        computed: String,
    },
}

/// Everything the prediction service needs, produced by one training run.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBundle {
    /// Layout version, [`BUNDLE_FORMAT_VERSION`] when written.
    pub format_version: u32,
    /// When the bundle was built.
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the canonical JSON of `encoders`.
    pub fingerprint: String,
    /// The trained classifier.
    pub model: GbdtRiskModel,
    /// Encoding maps the model was trained with.
    pub encoders: CategoryEncoders,
    /// Neighborhoods with their city (and coordinates when known).
    pub neighborhoods: Vec<NeighborhoodRecord>,
    /// Held-out evaluation, when available.
    #[serde(default)]
    pub report: Option<ClassificationReport>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleHeader {
    format_version: u32,
}

/// Computes the fingerprint of a set of encoding maps.
///
/// # Errors
///
/// * If the maps fail to serialize
pub fn fingerprint(encoders: &CategoryEncoders) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(encoders)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

impl ArtifactBundle {
    /// Assembles a bundle stamped with the current time and the maps'
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// * If the maps fail to serialize
    pub fn new(
        model: GbdtRiskModel,
        encoders: CategoryEncoders,
        neighborhoods: Vec<NeighborhoodRecord>,
        report: Option<ClassificationReport>,
    ) -> Result<Self, BundleError> {
        Ok(Self {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            fingerprint: fingerprint(&encoders)?,
            model,
            encoders,
            neighborhoods,
            report,
        })
    }

    /// Writes the bundle to `path`, replacing any existing file atomically.
    ///
    /// # Errors
    ///
    /// * If the parent directory cannot be created
    /// * If serialization or the final rename fails
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(&temp);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        temp.persist(path).map_err(|e| e.error)?;

        log::info!(
            "Wrote bundle to {} (fingerprint {})",
            path.display(),
            self.fingerprint
        );
        Ok(())
    }

    /// Reads and verifies a bundle from `path`.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read or is not a bundle
    /// * If the format version is not [`BUNDLE_FORMAT_VERSION`]
    /// * If the encoding maps do not match the stored fingerprint
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let bytes = fs::read(path)?;
        let bundle = Self::from_slice(&bytes)?;
        log::info!(
            "Loaded bundle from {} (created {}, fingerprint {})",
            path.display(),
            bundle.created_at,
            bundle.fingerprint
        );
        Ok(bundle)
    }

    /// Parses and verifies a bundle from JSON bytes.
    ///
    /// # Errors
    ///
    /// * If the bytes are not a bundle
    /// * If the format version is not [`BUNDLE_FORMAT_VERSION`]
    /// * If the encoding maps do not match the stored fingerprint
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BundleError> {
        let header: BundleHeader = serde_json::from_slice(bytes)?;
        if header.format_version != BUNDLE_FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion {
                found: header.format_version,
                expected: BUNDLE_FORMAT_VERSION,
            });
        }

        let bundle: Self = serde_json::from_slice(bytes)?;
        let computed = fingerprint(&bundle.encoders)?;
        if computed != bundle.fingerprint {
            return Err(BundleError::FingerprintMismatch {
                stored: bundle.fingerprint,
                computed,
            });
        }

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::separable_examples;
    use crate::{GbdtParams, RiskModel};
    use crime_risk_features::EncodingMap;

    fn encoders() -> CategoryEncoders {
        CategoryEncoders {
            neighborhoods: EncodingMap::from_labels(["Centro", "Aldeota"]),
            cities: EncodingMap::from_labels(["Fortaleza"]),
            crime_types: EncodingMap::from_labels(["Furto"]),
        }
    }

    fn bundle() -> ArtifactBundle {
        let params = GbdtParams {
            n_estimators: 10,
            max_depth: 3,
            ..GbdtParams::default()
        };
        let model = GbdtRiskModel::fit(&separable_examples(), &params, 1.0);
        ArtifactBundle::new(
            model,
            encoders(),
            vec![NeighborhoodRecord {
                name: "Centro".to_string(),
                city: "Fortaleza".to_string(),
                latitude: Some(-3.7275),
                longitude: Some(-38.5275),
            }],
            None,
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = fingerprint(&encoders()).unwrap();
        assert_eq!(a, fingerprint(&encoders()).unwrap());
        assert_eq!(a.len(), 64);

        let mut changed = encoders();
        changed.crime_types = EncodingMap::from_labels(["Furto", "Roubo"]);
        assert_ne!(a, fingerprint(&changed).unwrap());
    }

    #[test]
    fn save_and_load_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("risk_bundle.json");

        let original = bundle();
        original.save(&path).unwrap();
        let loaded = ArtifactBundle::load(&path).unwrap();

        assert_eq!(loaded.format_version, BUNDLE_FORMAT_VERSION);
        assert_eq!(loaded.fingerprint, original.fingerprint);
        assert_eq!(loaded.encoders, original.encoders);
        assert_eq!(loaded.neighborhoods, original.neighborhoods);

        let contexts: Vec<_> = separable_examples().iter().map(|e| e.context).collect();
        let before = original.model.predict_batch(&contexts);
        let after = loaded.model.predict_batch(&contexts);
        for (b, a) in before.iter().zip(&after) {
            assert!((b - a).abs() < 1e-6, "{b} != {a}");
        }
    }

    #[test]
    fn rejects_other_format_versions() {
        let mut value = serde_json::to_value(bundle()).unwrap();
        value["formatVersion"] = serde_json::json!(2);
        let err = ArtifactBundle::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::UnsupportedVersion {
                found: 2,
                expected: 1
            }
        ));
    }

    #[test]
    fn rejects_tampered_encoders() {
        let mut value = serde_json::to_value(bundle()).unwrap();
        value["encoders"]["bairros"] = serde_json::json!({ "Centro": 0 });
        let err = ArtifactBundle::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert!(matches!(err, BundleError::FingerprintMismatch { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactBundle::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BundleError::Io(_)));
    }
}
