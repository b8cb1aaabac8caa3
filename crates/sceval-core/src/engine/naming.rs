//! Backbone filename conventions.
//!
//! Generated backbones are expected as `<case>_<reference>_<sample>.pdb`
//! (e.g. `01_1BCF_3.pdb`) or `<reference>_<sample>.pdb` (e.g. `1BCF_3.pdb`).
//! Files matching neither are recovered by looking for a known benchmark name
//! inside the stem and renaming the file to the two-part form.

use phf::phf_set;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Motif-scaffolding benchmark targets recognised during name recovery.
pub static BENCHMARK_CASES: phf::Set<&'static str> = phf_set! {
    "1PRW", "1BCF", "5TPN", "5IUS", "3IXT", "5YUI", "1QJG", "1YCR",
    "2KL8", "7MRX_60", "7MRX_85", "7MRX_128", "4JHW", "4ZYP", "5WN9",
    "6VW1", "5TRV_short", "5TRV_med", "5TRV_long", "6E6R_short",
    "6E6R_med", "6E6R_long", "6EXZ_short", "6EXZ_med", "6EXZ_long",
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("No benchmark case recognised in '{file_name}'")]
    Unrecognized { file_name: String },

    #[error("Failed to rename '{from}' to '{to}': {message}", from = from.display(), to = to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
}

/// Identity of one generated backbone, derived from its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateName {
    pub case_number: Option<String>,
    /// Benchmark / reference structure name, e.g. `1BCF`.
    pub reference_name: String,
    pub sample_num: usize,
}

impl CandidateName {
    /// `<case>_<reference>` when a case number is known, else the reference name.
    pub fn backbone_name(&self) -> String {
        match &self.case_number {
            Some(case) => format!("{case}_{}", self.reference_name),
            None => self.reference_name.clone(),
        }
    }

    /// Name of the candidate's working directory and metadata key.
    pub fn candidate_id(&self) -> String {
        format!("{}_{}", self.backbone_name(), self.sample_num)
    }

    /// Identifiers to try, most specific first, when resolving per-case settings.
    pub fn lookup_keys(&self) -> Vec<String> {
        let mut keys = vec![self.backbone_name()];
        if self.case_number.is_some() {
            keys.push(self.reference_name.clone());
        }
        keys
    }
}

/// Parses a filename stem by the three-part convention, falling back to the
/// two-part one.
///
/// Benchmark names may themselves contain underscores (`5TRV_short`), so a
/// stem whose head is a known benchmark name is always read as two-part. A
/// reference containing an underscore is only accepted when it is a known
/// benchmark name.
pub fn parse_stem(stem: &str, benchmark: &[String]) -> Option<CandidateName> {
    let (head, sample) = stem.rsplit_once('_')?;
    let sample_num = sample.parse().ok()?;
    if head.is_empty() {
        return None;
    }

    let is_benchmark = |name: &str| benchmark.iter().any(|b| b.eq_ignore_ascii_case(name));
    let (case_number, reference_name) = match head.split_once('_') {
        Some(_) if is_benchmark(head) => (None, head.to_string()),
        Some((case, reference)) if !case.is_empty() && !reference.is_empty() => {
            if reference.contains('_') && !is_benchmark(reference) {
                return None;
            }
            (Some(case.to_string()), reference.to_string())
        }
        Some(_) => return None,
        None => (None, head.to_string()),
    };
    Some(CandidateName {
        case_number,
        reference_name,
        sample_num,
    })
}

/// Finds the benchmark name contained in `stem`, ignoring case.
///
/// The longest match wins so that e.g. `7MRX_128` beats a shorter name that
/// happens to be a prefix.
pub fn recover_reference<'a>(stem: &str, benchmark: &'a [String]) -> Option<&'a str> {
    let upper = stem.to_ascii_uppercase();
    benchmark
        .iter()
        .filter(|name| upper.contains(&name.to_ascii_uppercase()))
        .max_by_key(|name| name.len())
        .map(String::as_str)
}

/// Resolves the identity of a backbone file, renaming it in place when only the
/// benchmark-substring fallback applies.
///
/// Returns the (possibly new) path together with the parsed name.
pub fn resolve_candidate(
    path: &Path,
    benchmark: &[String],
) -> Result<(PathBuf, CandidateName), NamingError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(name) = parse_stem(&stem, benchmark) {
        return Ok((path.to_path_buf(), name));
    }
    warn!(file = %path.display(), "Backbone name does not follow '<case>_<reference>_<sample>' or '<reference>_<sample>'.");

    let reference = recover_reference(&stem, benchmark).ok_or_else(|| NamingError::Unrecognized {
        file_name: stem.clone(),
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut sample_num = 1;
    let renamed = loop {
        let candidate = dir.join(format!("{reference}_{sample_num}.pdb"));
        if !candidate.exists() {
            break candidate;
        }
        sample_num += 1;
    };
    fs::rename(path, &renamed).map_err(|e| NamingError::Rename {
        from: path.to_path_buf(),
        to: renamed.clone(),
        message: e.to_string(),
    })?;
    info!(from = %path.display(), to = %renamed.display(), "Renamed backbone to the standard naming format.");

    Ok((
        renamed,
        CandidateName {
            case_number: None,
            reference_name: reference.to_string(),
            sample_num,
        },
    ))
}
