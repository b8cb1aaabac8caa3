//! Motif metadata for one candidate backbone.
//!
//! The raw description (design contig, optional redesign positions, optional
//! reference segment order) comes from the per-case motif CSV when one is
//! configured, otherwise from `REMARK 999` annotations in the backbone itself.
//! [`ResolvedMotif`] turns it into the design-frame index sets used downstream.

use crate::core::contig::{
    Contig, ContigError, DesignLayout, MotifIndexSet, RedesignSet, apply_redesign, correspondence,
};
use crate::core::io::pdb::PdbMetadata;
use crate::engine::naming::CandidateName;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MOTIF_INFO_FILE: &str = "motif_info.json";

pub const CONTIG_ANNOTATION: &str = "CONTIG";
pub const REDESIGN_ANNOTATION: &str = "REDESIGN";
pub const SEGMENT_ORDER_ANNOTATION: &str = "SEGMENT_ORDER";

#[derive(Debug, Error)]
pub enum MotifInfoError {
    #[error("Failed to read motif CSV '{path}': {source}", path = path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("No motif information for '{candidate}'")]
    NotFound { candidate: String },

    #[error("Invalid motif description: {0}")]
    Contig(#[from] ContigError),

    #[error("Failed to write '{path}': {source}", path = path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize motif information: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unparsed motif description of one sampled backbone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotifSpec {
    pub contig: String,
    pub redesign_positions: Option<String>,
    pub segment_order: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MotifCsvRow {
    pdb_name: String,
    sample_num: usize,
    contig: String,
    #[serde(default)]
    redesign_positions: Option<String>,
    #[serde(default)]
    segment_order: Option<String>,
}

impl MotifCsvRow {
    fn spec(&self) -> MotifSpec {
        MotifSpec {
            contig: self.contig.clone(),
            redesign_positions: self.redesign_positions.clone(),
            segment_order: self.segment_order.clone(),
        }
    }
}

/// Per-case motif table with columns `pdb_name, sample_num, contig`,
/// `redesign_positions` and `segment_order` (the last two optional).
#[derive(Debug, Clone, Default)]
pub struct MotifCsv {
    rows: Vec<MotifCsvRow>,
}

impl MotifCsv {
    pub fn read_path(path: &Path) -> Result<Self, MotifInfoError> {
        let err = |source: csv::Error| MotifInfoError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(err)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<MotifCsvRow>, _>>()
            .map_err(err)?;
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for `name`, matched on backbone name first, then reference name.
    pub fn lookup(&self, name: &CandidateName) -> Option<MotifSpec> {
        name.lookup_keys().iter().find_map(|key| {
            self.rows
                .iter()
                .find(|row| row.sample_num == name.sample_num && row.pdb_name.eq_ignore_ascii_case(key))
                .map(MotifCsvRow::spec)
        })
    }
}

/// Reads the motif description from structured `REMARK 999` annotations.
pub fn spec_from_header(metadata: &PdbMetadata) -> Option<MotifSpec> {
    let non_empty = |key| {
        metadata
            .annotation(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    Some(MotifSpec {
        contig: non_empty(CONTIG_ANNOTATION)?,
        redesign_positions: non_empty(REDESIGN_ANNOTATION),
        segment_order: non_empty(SEGMENT_ORDER_ANNOTATION),
    })
}

/// Finds the motif description of a candidate: the CSV when configured, the
/// backbone header otherwise.
pub fn lookup_spec(
    csv: Option<&MotifCsv>,
    name: &CandidateName,
    metadata: &PdbMetadata,
) -> Result<MotifSpec, MotifInfoError> {
    let found = match csv {
        Some(csv) => csv.lookup(name),
        None => spec_from_header(metadata),
    };
    found.ok_or_else(|| MotifInfoError::NotFound {
        candidate: name.candidate_id(),
    })
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Motif description resolved into both coordinate frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMotif {
    pub spec: MotifSpec,
    /// Contig of the sampled design, in design numbering.
    pub design_contig: Contig,
    /// Motif blocks in reference numbering, in correspondence order.
    pub reference_contig: Contig,
    pub layout: DesignLayout,
    pub redesign: RedesignSet,
    /// Design-frame motif positions held fixed during sequence design.
    pub fixed: MotifIndexSet,
}

impl ResolvedMotif {
    pub fn resolve(spec: MotifSpec, design_chain: char) -> Result<Self, MotifInfoError> {
        let design_contig = Contig::parse(spec.contig.trim())?;
        let layout = design_contig.layout_design(design_chain);

        let reference_contig = match blank_to_none(&spec.segment_order) {
            Some(order) => Contig::parse(&order.replace(';', "/"))?,
            None => design_contig.motif_only(),
        };
        correspondence(&reference_contig, &layout.motif_indices)?;

        let redesign = match blank_to_none(&spec.redesign_positions) {
            Some(positions) => {
                RedesignSet::from_reference(positions, &reference_contig, &layout.motif_indices)?
            }
            None => RedesignSet::default(),
        };
        let fixed = apply_redesign(&layout.motif_indices, &redesign);

        Ok(Self {
            spec,
            design_contig,
            reference_contig,
            layout,
            redesign,
            fixed,
        })
    }

    /// Design residues occupied by the motif, redesignable ones included.
    pub fn design_motif(&self) -> &MotifIndexSet {
        &self.layout.motif_indices
    }

    pub fn info_entry(&self) -> MotifInfoEntry {
        MotifInfoEntry {
            contig: self.spec.contig.clone(),
            motif_idx: self.design_motif().indices(),
            redesign_info: blank_to_none(&self.spec.redesign_positions).map(str::to_string),
        }
    }
}

/// One `motif_info.json` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifInfoEntry {
    pub contig: String,
    pub motif_idx: Vec<isize>,
    pub redesign_info: Option<String>,
}

/// Writes the run's motif information with sorted keys and a 4-space indent.
pub fn write_motif_info(
    path: &Path,
    entries: &BTreeMap<String, MotifInfoEntry>,
) -> Result<(), MotifInfoError> {
    let write_err = |source: io::Error| MotifInfoError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    entries.serialize(&mut serializer)?;
    writer.flush().map_err(write_err)
}
