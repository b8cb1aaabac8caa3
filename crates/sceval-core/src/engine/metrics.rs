//! Per-sample metric tables.
//!
//! Each candidate writes one CSV per prediction method (and a joint table when
//! both ran). Floating-point metrics are written with three decimals.

use crate::engine::config::FoldingMethod;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const METRIC_COLUMNS: [&str; 14] = [
    "sample_idx",
    "header",
    "sequence",
    "mpnn_score",
    "rmsd",
    "motif_rmsd",
    "backbone_motif_rmsd",
    "refold_motif_rmsd",
    "pae",
    "ptm",
    "plddt",
    "length",
    "tm_score",
    "sample_path",
];

pub const FOLDING_METHOD_COLUMN: &str = "folding_method";
pub const JOINT_TABLE_NAME: &str = "joint_eval_results.csv";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("CSV error in '{path}': {source}", path = path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Table '{path}' has no column '{column}'", path = path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Table '{path}' row {row} has a non-numeric '{column}': '{value}'", path = path.display())]
    InvalidNumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
}

/// One refolded sequence of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMetrics {
    pub sample_idx: usize,
    pub header: String,
    pub sequence: String,
    pub mpnn_score: f64,
    /// Global CA RMSD between design and prediction.
    pub rmsd: f64,
    /// Backbone RMSD between the reference motif and the predicted motif.
    pub motif_rmsd: f64,
    /// CA RMSD between the reference motif and the design motif, before prediction.
    pub backbone_motif_rmsd: f64,
    /// CA RMSD between the design motif and the predicted motif.
    pub refold_motif_rmsd: Option<f64>,
    pub pae: f64,
    pub ptm: f64,
    pub plddt: f64,
    pub length: usize,
    pub tm_score: f64,
    pub sample_path: PathBuf,
}

fn fixed3(value: f64) -> String {
    format!("{value:.3}")
}

impl SampleMetrics {
    fn record(&self) -> Vec<String> {
        vec![
            self.sample_idx.to_string(),
            self.header.clone(),
            self.sequence.clone(),
            fixed3(self.mpnn_score),
            fixed3(self.rmsd),
            fixed3(self.motif_rmsd),
            fixed3(self.backbone_motif_rmsd),
            self.refold_motif_rmsd.map(fixed3).unwrap_or_default(),
            fixed3(self.pae),
            fixed3(self.ptm),
            fixed3(self.plddt),
            self.length.to_string(),
            fixed3(self.tm_score),
            self.sample_path.display().to_string(),
        ]
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> MetricsError + '_ {
    move |source| MetricsError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn sorted(rows: &[SampleMetrics]) -> Vec<&SampleMetrics> {
    let mut rows: Vec<_> = rows.iter().collect();
    rows.sort_by_key(|r| r.sample_idx);
    rows
}

/// Writes one method's table, sorted by `sample_idx`.
pub fn write_metrics_table(path: &Path, rows: &[SampleMetrics]) -> Result<(), MetricsError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;
    writer.write_record(METRIC_COLUMNS).map_err(csv_err(path))?;
    for row in sorted(rows) {
        writer.write_record(row.record()).map_err(csv_err(path))?;
    }
    writer.flush().map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the concatenation of several method tables with a method column.
pub fn write_joint_table(
    path: &Path,
    tables: &[(FoldingMethod, &[SampleMetrics])],
) -> Result<(), MetricsError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;
    let header = METRIC_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(FOLDING_METHOD_COLUMN));
    writer.write_record(header).map_err(csv_err(path))?;
    for (method, rows) in tables {
        for row in sorted(rows) {
            let mut record = row.record();
            record.push(method.label().to_string());
            writer.write_record(record).map_err(csv_err(path))?;
        }
    }
    writer.flush().map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A loosely typed CSV table: named columns of string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultsTable {
    pub fn read_path(path: &Path) -> Result<Self, MetricsError> {
        let file = File::open(path).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let headers = reader
            .headers()
            .map_err(csv_err(path))?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|r| r.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(csv_err(path))?;
        Ok(Self { headers, rows })
    }

    pub fn write_path(&self, path: &Path) -> Result<(), MetricsError> {
        let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;
        writer.write_record(&self.headers).map_err(csv_err(path))?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_err(path))?;
        }
        writer.flush().map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Parses every cell of `column` as a number; empty cells become `None`.
    pub fn numeric_column(&self, column: &str, source: &Path) -> Result<Vec<Option<f64>>, MetricsError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| MetricsError::MissingColumn {
                path: source.to_path_buf(),
                column: column.to_string(),
            })?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let raw = row.get(col).map(|s| s.trim()).unwrap_or("");
                if raw.is_empty() {
                    return Ok(None);
                }
                raw.parse().map(Some).map_err(|_| MetricsError::InvalidNumber {
                    path: source.to_path_buf(),
                    row: i + 1,
                    column: column.to_string(),
                    value: raw.to_string(),
                })
            })
            .collect()
    }

    /// Appends a column, or overwrites it if it already exists. Rows beyond
    /// `values` get an empty cell.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };
        let mut values = values.into_iter();
        for row in &mut self.rows {
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = values.next().unwrap_or_default();
        }
    }

    /// Appends the rows of `other`, aligning columns by name. Columns missing
    /// on either side are filled with empty cells.
    pub fn append(&mut self, other: &ResultsTable) {
        for header in &other.headers {
            if self.column_index(header).is_none() {
                self.headers.push(header.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let mapping: Vec<Option<usize>> = self
            .headers
            .iter()
            .map(|h| other.column_index(h))
            .collect();
        for row in &other.rows {
            self.rows.push(
                mapping
                    .iter()
                    .map(|m| m.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(idx: usize, tm: f64) -> SampleMetrics {
        SampleMetrics {
            sample_idx: idx,
            header: format!("T=0.1, sample={idx}, global_score=1.0"),
            sequence: "MKV".into(),
            mpnn_score: 1.23456,
            rmsd: 0.5,
            motif_rmsd: 0.25,
            backbone_motif_rmsd: 0.1,
            refold_motif_rmsd: None,
            pae: 4.0,
            ptm: 0.8,
            plddt: 88.88888,
            length: 3,
            tm_score: tm,
            sample_path: PathBuf::from(format!("/x/esmf/sample_{idx}.pdb")),
        }
    }

    #[test]
    fn table_is_sorted_and_formatted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("esm_eval_results.csv");
        write_metrics_table(&path, &[sample(3, 0.9), sample(1, 0.7)]).unwrap();

        let table = ResultsTable::read_path(&path).unwrap();
        assert_eq!(table.headers, METRIC_COLUMNS);
        assert_eq!(table.cell(0, "sample_idx"), Some("1"));
        assert_eq!(table.cell(0, "plddt"), Some("88.889"));
        assert_eq!(table.cell(0, "mpnn_score"), Some("1.235"));
        assert_eq!(table.cell(0, "refold_motif_rmsd"), Some(""));
        assert_eq!(table.cell(1, "tm_score"), Some("0.900"));
        assert_eq!(table.cell(0, "header"), Some("T=0.1, sample=1, global_score=1.0"));
    }

    #[test]
    fn joint_table_labels_methods() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(JOINT_TABLE_NAME);
        let esm = [sample(1, 0.7)];
        let af2 = [sample(1, 0.6), sample(2, 0.8)];
        write_joint_table(
            &path,
            &[(FoldingMethod::EsmFold, &esm), (FoldingMethod::AlphaFold2, &af2)],
        )
        .unwrap();
        let table = ResultsTable::read_path(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, FOLDING_METHOD_COLUMN), Some("ESMFold"));
        assert_eq!(table.cell(2, FOLDING_METHOD_COLUMN), Some("AlphaFold2"));
    }

    #[test]
    fn numeric_column_reports_bad_cells() {
        let table = ResultsTable {
            headers: vec!["tm_score".into()],
            rows: vec![vec!["0.5".into()], vec!["".into()], vec!["high".into()]],
        };
        let err = table.numeric_column("tm_score", Path::new("t.csv")).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidNumber { row: 3, .. }));
        assert!(matches!(
            table.numeric_column("rmsd", Path::new("t.csv")),
            Err(MetricsError::MissingColumn { .. })
        ));
    }

    #[test]
    fn append_aligns_columns_by_name() {
        let mut a = ResultsTable {
            headers: vec!["x".into(), "y".into()],
            rows: vec![vec!["1".into(), "2".into()]],
        };
        let b = ResultsTable {
            headers: vec!["y".into(), "z".into()],
            rows: vec![vec!["3".into(), "4".into()]],
        };
        a.append(&b);
        assert_eq!(a.headers, vec!["x", "y", "z"]);
        assert_eq!(a.rows[0], vec!["1", "2", ""]);
        assert_eq!(a.rows[1], vec!["", "3", "4"]);

        a.set_column("Success", vec!["True".into(), "False".into()]);
        assert_eq!(a.cell(1, "Success"), Some("False"));
    }
}
