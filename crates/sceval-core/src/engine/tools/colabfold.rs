//! AlphaFold2 (single-sequence mode) through `colabfold_batch`.
//!
//! All sequences of a candidate go through one batch run into
//! `af2_raw_outputs/`. Afterwards the rank-1 model of each query is copied to
//! `af2/sample_<idx>.pdb` and its confidence metrics are read from the
//! matching scores JSON.

use super::{
    DesignedSequence, Invocation, Prediction, RetryPolicy, StructurePredictor, ToolError,
};
use crate::core::io::fasta::{FastaRecord, write_fasta_path};
use crate::engine::config::FoldingMethod;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TOOL: &str = "AlphaFold2";
const RAW_OUTPUT_DIR: &str = "af2_raw_outputs";
const RANK_ONE: &str = "_rank_001_";

#[derive(Debug, Clone, PartialEq)]
pub struct ColabFoldConfig {
    pub program: PathBuf,
    pub num_recycle: u32,
    pub random_seed: u64,
    pub model_type: String,
    pub num_models: u32,
    /// Ranking metric, only passed when more than one model runs.
    pub rank: String,
    pub use_amber_relax: bool,
    pub num_relax: u32,
    pub use_gpu_relax: bool,
    pub retry: RetryPolicy,
}

impl Default for ColabFoldConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("colabfold_batch"),
            num_recycle: 3,
            random_seed: 0,
            model_type: "alphafold2_ptm".to_string(),
            num_models: 1,
            rank: "plddt".to_string(),
            use_amber_relax: false,
            num_relax: 0,
            use_gpu_relax: false,
            retry: RetryPolicy::new(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreFile {
    plddt: Vec<f64>,
    #[serde(default)]
    pae: Vec<Vec<f64>>,
    #[serde(default)]
    ptm: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

pub struct ColabFold {
    config: ColabFoldConfig,
}

impl ColabFold {
    pub fn new(config: ColabFoldConfig) -> Self {
        Self { config }
    }

    pub fn invocation(&self, fasta: &Path, raw_dir: &Path) -> Invocation {
        let c = &self.config;
        let mut inv = Invocation::new(&c.program)
            .arg(fasta)
            .arg(raw_dir)
            .args(["--msa-mode", "single_sequence"])
            .arg("--num-recycle")
            .arg(c.num_recycle.to_string())
            .arg("--random-seed")
            .arg(c.random_seed.to_string())
            .arg("--model-type")
            .arg(&c.model_type)
            .arg("--num-models")
            .arg(c.num_models.to_string());
        if c.num_models > 1 {
            inv = inv.arg("--rank").arg(&c.rank);
        }
        if c.use_amber_relax {
            inv = inv
                .arg("--amber")
                .arg("--num-relax")
                .arg(c.num_relax.to_string());
            if c.use_gpu_relax {
                inv = inv.arg("--use-gpu-relax");
            }
        }
        inv.log_to(raw_dir.join("colabfold.log"))
    }
}

fn query_name(sample_idx: usize) -> String {
    format!("sample_{sample_idx}")
}

/// Picks the rank-1 file of `query` with the given kind (`relaxed`,
/// `unrelaxed`, `scores`) and extension.
fn rank_one_file(raw_files: &[PathBuf], query: &str, kind: &str, ext: &str) -> Option<PathBuf> {
    let prefix = format!("{query}_{kind}{RANK_ONE}");
    raw_files
        .iter()
        .find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(ext))
        })
        .cloned()
}

/// Moves the rank-1 outputs of each query into `af2_dir` and reads their scores.
pub fn collect_outputs(
    raw_dir: &Path,
    af2_dir: &Path,
    sample_indices: &[usize],
    prefer_relaxed: bool,
) -> Result<Vec<Prediction>, ToolError> {
    fs::create_dir_all(af2_dir).map_err(ToolError::io(TOOL))?;
    let raw_files: Vec<PathBuf> = fs::read_dir(raw_dir)
        .map_err(ToolError::io(TOOL))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    let mut predictions = Vec::with_capacity(sample_indices.len());
    for &idx in sample_indices {
        let query = query_name(idx);
        let missing = || ToolError::MissingOutput {
            tool: TOOL.to_string(),
            path: raw_dir.join(format!("{query}_unrelaxed{RANK_ONE}*.pdb")),
        };
        let model = prefer_relaxed
            .then(|| rank_one_file(&raw_files, &query, "relaxed", ".pdb"))
            .flatten()
            .or_else(|| rank_one_file(&raw_files, &query, "unrelaxed", ".pdb"))
            .ok_or_else(missing)?;
        let scores_path = rank_one_file(&raw_files, &query, "scores", ".json").ok_or_else(|| {
            ToolError::MissingOutput {
                tool: TOOL.to_string(),
                path: raw_dir.join(format!("{query}_scores{RANK_ONE}*.json")),
            }
        })?;

        let invalid = |reason: String| ToolError::InvalidOutput {
            tool: TOOL.to_string(),
            path: scores_path.clone(),
            reason,
        };
        let text = fs::read_to_string(&scores_path).map_err(|e| invalid(e.to_string()))?;
        let scores: ScoreFile = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        let target = af2_dir.join(format!("{query}.pdb"));
        fs::copy(&model, &target).map_err(ToolError::io(TOOL))?;

        predictions.push(Prediction {
            sample_idx: idx,
            structure_path: target,
            mean_plddt: mean(scores.plddt.iter().copied()),
            ptm: scores.ptm.unwrap_or(0.0),
            pae: mean(scores.pae.iter().flatten().copied()),
        });
    }
    Ok(predictions)
}

impl StructurePredictor for ColabFold {
    fn method(&self) -> FoldingMethod {
        FoldingMethod::AlphaFold2
    }

    fn predict(
        &mut self,
        work_dir: &Path,
        sequences: &[DesignedSequence],
    ) -> Result<Vec<Prediction>, ToolError> {
        let raw_dir = work_dir.join(RAW_OUTPUT_DIR);
        fs::create_dir_all(&raw_dir).map_err(ToolError::io(TOOL))?;

        let fasta = work_dir.join("af2_input.fa");
        let records: Vec<_> = sequences
            .iter()
            .map(|d| FastaRecord::new(query_name(d.sample_idx), d.sequence.clone()))
            .collect();
        write_fasta_path(&records, &fasta).map_err(|e| ToolError::InvalidOutput {
            tool: TOOL.to_string(),
            path: fasta.clone(),
            reason: e.to_string(),
        })?;

        self.invocation(&fasta, &raw_dir)
            .run(TOOL, &self.config.retry)?;

        let indices: Vec<usize> = sequences.iter().map(|d| d.sample_idx).collect();
        let af2_dir = work_dir.join(FoldingMethod::AlphaFold2.output_subdir());
        let predictions =
            collect_outputs(&raw_dir, &af2_dir, &indices, self.config.use_amber_relax)?;
        info!(count = predictions.len(), dir = %af2_dir.display(), "Collected AlphaFold2 models.");
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn rank_one_outputs_are_collected_per_query() {
        let raw = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let scores = r#"{"plddt":[80.0,90.0],"pae":[[1.0,3.0],[5.0,7.0]],"ptm":0.66}"#;
        write(raw.path(), "sample_1_unrelaxed_rank_001_alphafold2_ptm_model_1_seed_000.pdb", "MODEL1\n");
        write(raw.path(), "sample_1_unrelaxed_rank_002_alphafold2_ptm_model_2_seed_000.pdb", "MODEL2\n");
        write(raw.path(), "sample_1_scores_rank_001_alphafold2_ptm_model_1_seed_000.json", scores);
        write(raw.path(), "sample_10_unrelaxed_rank_001_alphafold2_ptm_model_1_seed_000.pdb", "TEN\n");
        write(raw.path(), "sample_10_scores_rank_001_alphafold2_ptm_model_1_seed_000.json", scores);

        let preds = collect_outputs(raw.path(), out.path(), &[1, 10], false).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].mean_plddt, 85.0);
        assert_eq!(preds[0].pae, 4.0);
        assert_eq!(preds[0].ptm, 0.66);
        assert_eq!(
            fs::read_to_string(out.path().join("sample_1.pdb")).unwrap(),
            "MODEL1\n"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("sample_10.pdb")).unwrap(),
            "TEN\n"
        );
    }

    #[test]
    fn relaxed_model_is_preferred_when_requested() {
        let raw = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(raw.path(), "sample_2_unrelaxed_rank_001_m.pdb", "RAW\n");
        write(raw.path(), "sample_2_relaxed_rank_001_m.pdb", "RELAXED\n");
        write(raw.path(), "sample_2_scores_rank_001_m.json", r#"{"plddt":[70.0]}"#);
        let preds = collect_outputs(raw.path(), out.path(), &[2], true).unwrap();
        assert_eq!(
            fs::read_to_string(&preds[0].structure_path).unwrap(),
            "RELAXED\n"
        );
        assert_eq!(preds[0].ptm, 0.0);
    }

    #[test]
    fn missing_model_is_reported() {
        let raw = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect_outputs(raw.path(), out.path(), &[3], false),
            Err(ToolError::MissingOutput { .. })
        ));
    }

    #[test]
    fn invocation_matches_colabfold_flags() {
        let af2 = ColabFold::new(ColabFoldConfig {
            num_models: 5,
            use_amber_relax: true,
            num_relax: 1,
            ..ColabFoldConfig::default()
        });
        let text = af2
            .invocation(Path::new("in.fa"), Path::new("raw"))
            .display();
        assert!(text.starts_with("colabfold_batch in.fa raw --msa-mode single_sequence --num-recycle 3"));
        assert!(text.contains("--num-models 5 --rank plddt"));
        assert!(text.ends_with("--amber --num-relax 1"));
    }
}
