//! Labeled digit datasets in CSV form

use std::io::Read;
use std::path::Path;

use inference_engine::{INPUT_FEATURES, NUM_CLASSES};
use ndarray::{Array2, ArrayView1};
use thiserror::Error;
use tracing::debug;

/// Errors while reading a dataset; rows are 1-based
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset: {0}")]
    Open(#[from] std::io::Error),

    #[error("Row {row}: {reason}")]
    Csv { row: usize, reason: String },

    #[error("Row {row}: expected {expected} columns, found {found}")]
    Columns { row: usize, expected: usize, found: usize },

    #[error("Row {row}: invalid label {value:?}")]
    InvalidLabel { row: usize, value: String },

    #[error("Row {row}: invalid pixel intensity {value:?}")]
    InvalidPixel { row: usize, value: String },

    #[error("Dataset contains no rows")]
    Empty,
}

/// Label plus 784 intensities per row, scaled into [0.0, 1.0]
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Vec<u8>,
}

impl Dataset {
    /// Parse a header-less CSV file
    pub fn from_csv_path(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse header-less CSV rows: `label,p0,p1,...,p783`
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let expected = INPUT_FEATURES + 1;
        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (i, record) in csv_reader.records().enumerate() {
            let row = i + 1;
            let record = record.map_err(|e| DatasetError::Csv {
                row,
                reason: e.to_string(),
            })?;

            if record.len() != expected {
                return Err(DatasetError::Columns {
                    row,
                    expected,
                    found: record.len(),
                });
            }

            let label = record[0]
                .parse::<u8>()
                .ok()
                .filter(|l| (*l as usize) < NUM_CLASSES)
                .ok_or_else(|| DatasetError::InvalidLabel {
                    row,
                    value: record[0].to_string(),
                })?;
            labels.push(label);

            for field in record.iter().skip(1) {
                let value = field.parse::<u8>().map_err(|_| DatasetError::InvalidPixel {
                    row,
                    value: field.to_string(),
                })?;
                features.push(value as f32 / 255.0);
            }
        }

        if labels.is_empty() {
            return Err(DatasetError::Empty);
        }

        let rows = labels.len();
        let features = Array2::from_shape_vec((rows, INPUT_FEATURES), features).map_err(|e| {
            DatasetError::Csv {
                row: rows,
                reason: e.to_string(),
            }
        })?;
        debug!("Parsed {} labeled rows", rows);

        Ok(Self { features, labels })
    }

    /// Build from already-scaled features
    pub fn from_parts(features: Array2<f32>, labels: Vec<u8>) -> Option<Self> {
        let consistent = features.nrows() == labels.len()
            && features.ncols() == INPUT_FEATURES
            && labels.iter().all(|l| (*l as usize) < NUM_CLASSES);
        consistent.then_some(Self { features, labels })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// (rows, 784) feature matrix
    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Features of one row
    pub fn row(&self, index: usize) -> ArrayView1<f32> {
        self.features.row(index)
    }

    /// Rows per class
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for label in &self.labels {
            counts[*label as usize] += 1;
        }
        counts
    }
}
