//! Data Export Module
//!
//! Assembles extracted vectors into a fixed-width table and writes it out
//! for an external training harness.
//!
//! # Output Layout
//!
//! ```text
//! output_dir/
//! ├── features.npy    [N_series, N_columns] f64
//! ├── labels.npy      [N_series] i8   (1 = break, 0 = no break, -1 = unknown)
//! └── metadata.json   columns, series ids, batch summary, config, schema version
//! ```
//!
//! # Example
//!
//! ```ignore
//! use levy_sections::export::{FeatureTable, NumpyExporter};
//! use levy_sections::schema::FeatureSchema;
//!
//! let schema = FeatureSchema::from_config(extractor.config());
//! let output = processor.process_labeled(&items)?;
//! let table = FeatureTable::assemble(&schema, &output.examples)?;
//!
//! NumpyExporter::new("out/run_01").export(&table, &output.summary, extractor.config())?;
//! ```

use crate::batch::BatchSummary;
use crate::config::ExtractorConfig;
use crate::error::{LevyError, Result};
use crate::schema::FeatureSchema;
use crate::series::{LabeledExample, SeriesId};
use ndarray::{Array1, Array2};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Label code for a series without a known outcome.
pub const UNKNOWN_LABEL: i8 = -1;

/// Encode an optional break label as `i8`.
#[inline]
pub fn encode_label(label: Option<bool>) -> i8 {
    match label {
        Some(true) => 1,
        Some(false) => 0,
        None => UNKNOWN_LABEL,
    }
}

// ============================================================================
// Feature Table
// ============================================================================

/// Fixed-width feature table, one row per accepted series.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub series_ids: Vec<SeriesId>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<Option<bool>>,
    pub schema_version: String,
}

impl FeatureTable {
    /// Build a table from extracted examples.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` when any row is not exactly as wide as `schema`.
    pub fn assemble(schema: &FeatureSchema, examples: &[LabeledExample]) -> Result<Self> {
        let width = schema.total_count();
        let mut rows = Vec::with_capacity(examples.len());

        for example in examples {
            let row = example.features.to_row();
            if row.len() != width {
                return Err(LevyError::SchemaMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            rows.push(row);
        }

        Ok(Self {
            columns: schema.feature_names().iter().map(|s| s.to_string()).collect(),
            series_ids: examples.iter().map(|e| e.series_id.clone()).collect(),
            rows,
            labels: examples.iter().map(|e| e.label).collect(),
            schema_version: schema.version.clone(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as a `[n_rows, n_columns]` array.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let flat: Vec<f64> = self.rows.iter().flat_map(|row| row.iter().copied()).collect();
        Array2::from_shape_vec((self.n_rows(), self.n_columns()), flat)
            .map_err(|e| LevyError::Export(format!("failed to create feature array: {e}")))
    }

    /// Labels encoded as 1 / 0 / -1.
    pub fn label_array(&self) -> Array1<i8> {
        self.labels.iter().map(|&l| encode_label(l)).collect()
    }

    /// Column values by name.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    /// Counts of (positive, negative, unknown) labels.
    pub fn label_distribution(&self) -> (usize, usize, usize) {
        self.labels
            .iter()
            .fold((0, 0, 0), |(pos, neg, unk), label| match label {
                Some(true) => (pos + 1, neg, unk),
                Some(false) => (pos, neg + 1, unk),
                None => (pos, neg, unk + 1),
            })
    }
}

// ============================================================================
// NumPy Export
// ============================================================================

/// Contents of `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub n_samples: usize,
    pub n_features: usize,
    pub columns: Vec<String>,
    pub series_ids: Vec<SeriesId>,

    /// (positive, negative, unknown)
    pub label_distribution: (usize, usize, usize),

    pub summary: BatchSummary,
    pub config: ExtractorConfig,
    pub schema_version: String,

    /// RFC 3339
    pub export_timestamp: String,
}

/// NumPy exporter - writes `.npy` arrays plus JSON metadata.
pub struct NumpyExporter {
    output_dir: PathBuf,
}

impl NumpyExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `features.npy`, `labels.npy` and `metadata.json`.
    ///
    /// # Errors
    ///
    /// `Export` for an empty table or a failed `.npy` write, `Io` / `Json`
    /// for filesystem and metadata failures.
    pub fn export(
        &self,
        table: &FeatureTable,
        summary: &BatchSummary,
        config: &ExtractorConfig,
    ) -> Result<ExportMetadata> {
        if table.is_empty() {
            return Err(LevyError::Export("no rows to export".to_string()));
        }

        fs::create_dir_all(&self.output_dir)?;

        self.write_features(table)?;
        self.write_labels(table)?;

        let metadata = ExportMetadata {
            n_samples: table.n_rows(),
            n_features: table.n_columns(),
            columns: table.columns.clone(),
            series_ids: table.series_ids.clone(),
            label_distribution: table.label_distribution(),
            summary: *summary,
            config: config.clone(),
            schema_version: table.schema_version.clone(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.write_metadata(&metadata)?;

        Ok(metadata)
    }

    fn write_features(&self, table: &FeatureTable) -> Result<()> {
        let array = table.to_array()?;
        let path = self.output_dir.join("features.npy");
        let file = BufWriter::new(File::create(&path)?);
        array
            .write_npy(file)
            .map_err(|e| LevyError::Export(format!("failed to write features.npy: {e}")))?;

        log::info!(
            "Exported features: {} [{} series x {} columns]",
            path.display(),
            table.n_rows(),
            table.n_columns()
        );
        Ok(())
    }

    fn write_labels(&self, table: &FeatureTable) -> Result<()> {
        let array = table.label_array();
        let path = self.output_dir.join("labels.npy");
        let file = BufWriter::new(File::create(&path)?);
        array
            .write_npy(file)
            .map_err(|e| LevyError::Export(format!("failed to write labels.npy: {e}")))?;

        let (pos, neg, unk) = table.label_distribution();
        log::info!(
            "Exported labels: {} (break={pos}, no_break={neg}, unknown={unk})",
            path.display()
        );
        Ok(())
    }

    fn write_metadata(&self, metadata: &ExportMetadata) -> Result<()> {
        let path = self.output_dir.join("metadata.json");
        let file = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(file, metadata)?;

        log::info!("Exported metadata: {}", path.display());
        Ok(())
    }
}
