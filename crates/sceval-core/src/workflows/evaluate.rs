use crate::engine::config::{EvaluationConfig, SuccessCriteria};
use crate::engine::error::EngineError;
use crate::engine::metrics::{METRIC_COLUMNS, MetricsError, ResultsTable};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tools::foldseek::{ClusterSummary, NoveltySearcher, StructureClusterer};
use crate::workflows::refold::SELF_CONSISTENCY_DIR;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const COMPLETE_RESULTS_FILE: &str = "complete_results.csv";
pub const SUMMARY_RESULTS_FILE: &str = "summary_results.csv";
pub const NOVELTY_RESULTS_FILE: &str = "successful_novelty_results.csv";
pub const SUMMARY_TEXT_FILE: &str = "summary.txt";
pub const SUMMARY_JSON_FILE: &str = "summary.json";
pub const SUCCESSFUL_DIR: &str = "successful_backbones";
pub const UNIQUE_DIR: &str = "unique_designable_backbones";
pub const CLUSTER_TSV_FILE: &str = "diversity_cluster.tsv";
pub const ASSIST_PROTEIN_FILE: &str = "assist_protein.pdb";

pub const SUCCESS_COLUMN: &str = "Success";
pub const BACKBONE_NAME_COLUMN: &str = "backbone_name";
pub const BACKBONE_PATH_COLUMN: &str = "backbone_path";
pub const PDB_TM_COLUMN: &str = "pdbTM";

/// Written in place of a value that could not be computed.
pub const NULL_SENTINEL: &str = "null";

/// Run-level designability, diversity and novelty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub result_dir: PathBuf,
    /// Merged sample rows.
    pub total: usize,
    /// Rows meeting every success threshold.
    pub designable: usize,
    /// Percentage of designable rows.
    pub designable_fraction: f64,
    pub successful_backbones: usize,
    pub clusters: Option<usize>,
    pub diversity: Option<f64>,
    /// 1 - median pdbTM over successful backbones.
    pub novelty: Option<f64>,
    /// pdbTM of the most novel successful backbone.
    pub min_pdb_tm: Option<f64>,
}

/// pdbTM of one successful backbone; `None` when its search failed.
#[derive(Debug, Clone, PartialEq)]
pub struct NoveltyResult {
    pub structure: PathBuf,
    pub pdb_tm: Option<f64>,
}

#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(
    config: &EvaluationConfig,
    clusterer: &dyn StructureClusterer,
    searcher: &dyn NoveltySearcher,
    reporter: &ProgressReporter,
) -> Result<EvaluationSummary, EngineError> {
    let result_dir = &config.result_dir;
    let prefix = config.prediction.result_prefix();

    // === Phase 1: Merge and classify ===
    reporter.report(Progress::PhaseStart { name: "Merging" });
    info!(dir = %result_dir.display(), prefix, "Merging per-candidate results.");
    let mut complete = merge_results(result_dir, prefix)?;
    let total = complete.len();
    let success = classify_success(&mut complete, &config.criteria, result_dir)?;
    let designable = success.iter().filter(|s| **s).count();
    complete.write_path(&result_dir.join(COMPLETE_RESULTS_FILE))?;
    summarize_backbones(&complete, &success).write_path(&result_dir.join(SUMMARY_RESULTS_FILE))?;
    info!(total, designable, "Designable samples counted.");
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Diversity ===
    reporter.report(Progress::PhaseStart { name: "Diversity" });
    let successful_dir = result_dir.join(SUCCESSFUL_DIR);
    recreate_dir(&successful_dir)?;
    recreate_dir(&result_dir.join(UNIQUE_DIR))?;
    let successful = copy_successful_backbones(&complete, &success, &successful_dir)?;
    let clustering = if successful.is_empty() {
        info!("No designable backbone; skipping clustering.");
        None
    } else {
        cluster_successful(config, clusterer, &successful_dir)?
    };
    if let Some(clusters) = &clustering {
        info!(
            samples = clusters.samples,
            clusters = clusters.clusters,
            diversity = clusters.diversity(),
            "Diversity calculation finished."
        );
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Novelty ===
    reporter.report(Progress::PhaseStart { name: "Novelty" });
    let novelty = match &clustering {
        Some(_) => {
            let results = search_novelty(&successful, searcher, config.novelty_workers, reporter)?;
            write_novelty_results(&result_dir.join(NOVELTY_RESULTS_FILE), &results)?;
            novelty_score(&results)
        }
        None => {
            info!("No clustering result; novelty is reported as {NULL_SENTINEL}.");
            None
        }
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Summary ===
    let summary = EvaluationSummary {
        result_dir: result_dir.clone(),
        total,
        designable,
        designable_fraction: designable_fraction(designable, total),
        successful_backbones: successful.len(),
        clusters: clustering.as_ref().map(|c| c.clusters),
        diversity: clustering.as_ref().and_then(ClusterSummary::diversity),
        novelty: novelty.map(|(score, _)| score),
        min_pdb_tm: novelty.map(|(_, min)| min),
    };
    write_summary(&summary, result_dir)?;
    info!(
        fraction = %format!("{:.2}", summary.designable_fraction),
        diversity = ?summary.diversity,
        novelty = ?summary.novelty,
        "Evaluation workflow complete."
    );
    Ok(summary)
}

/// Percentage with the same small denominator offset as the summary report.
pub fn designable_fraction(designable: usize, total: usize) -> f64 {
    designable as f64 / (total as f64 + 1e-6) * 100.0
}

fn candidate_backbone(candidate_dir: &Path) -> Option<PathBuf> {
    let mut pdbs: Vec<PathBuf> = fs::read_dir(candidate_dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdb")))
        .collect();
    pdbs.sort();
    pdbs.into_iter().next()
}

/// Concatenates `<prefix>_eval_results.csv` of every candidate directory under
/// `result_dir`, adding the backbone name and path.
pub fn merge_results(result_dir: &Path, prefix: &str) -> Result<ResultsTable, EngineError> {
    let table_name = format!("{prefix}_eval_results.csv");
    let mut candidate_dirs: Vec<PathBuf> = fs::read_dir(result_dir)
        .map_err(EngineError::io(result_dir))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.join(SELF_CONSISTENCY_DIR).is_dir())
        .collect();
    candidate_dirs.sort();

    let mut merged = ResultsTable {
        headers: METRIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: Vec::new(),
    };
    for dir in candidate_dirs {
        let table_path = dir.join(SELF_CONSISTENCY_DIR).join(&table_name);
        if !table_path.exists() {
            debug!(dir = %dir.display(), "No {table_name} in candidate directory.");
            continue;
        }
        let mut table = ResultsTable::read_path(&table_path)?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backbone = candidate_backbone(&dir)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        table.set_column(BACKBONE_NAME_COLUMN, vec![name; table.len()]);
        table.set_column(BACKBONE_PATH_COLUMN, vec![backbone; table.len()]);
        merged.append(&table);
    }
    Ok(merged)
}

/// Adds the `Success` column and returns the per-row verdicts.
pub fn classify_success(
    table: &mut ResultsTable,
    criteria: &SuccessCriteria,
    source: &Path,
) -> Result<Vec<bool>, MetricsError> {
    let tm = table.numeric_column("tm_score", source)?;
    let rmsd = table.numeric_column("rmsd", source)?;
    let motif = table.numeric_column("motif_rmsd", source)?;
    let plddt = table.numeric_column("plddt", source)?;

    let verdicts: Vec<bool> = (0..table.len())
        .map(|i| match (tm[i], rmsd[i], motif[i]) {
            (Some(tm), Some(rmsd), Some(motif)) => criteria.is_success(tm, rmsd, motif, plddt[i]),
            _ => false,
        })
        .collect();
    let labels = verdicts
        .iter()
        .map(|s| if *s { "True" } else { "False" }.to_string())
        .collect();
    table.set_column(SUCCESS_COLUMN, labels);
    Ok(verdicts)
}

/// One row per backbone: sample count, designable count and best metrics.
fn summarize_backbones(complete: &ResultsTable, success: &[bool]) -> ResultsTable {
    #[derive(Default)]
    struct Group {
        path: String,
        samples: usize,
        designable: usize,
        best_tm: Option<f64>,
        best_motif_rmsd: Option<f64>,
    }

    let cell_f64 = |row: usize, column: &str| complete.cell(row, column).and_then(|v| v.parse::<f64>().ok());
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for (row, ok) in success.iter().enumerate() {
        let name = complete.cell(row, BACKBONE_NAME_COLUMN).unwrap_or_default().to_string();
        let group = groups.entry(name).or_default();
        group.path = complete.cell(row, BACKBONE_PATH_COLUMN).unwrap_or_default().to_string();
        group.samples += 1;
        group.designable += usize::from(*ok);
        if let Some(tm) = cell_f64(row, "tm_score") {
            group.best_tm = Some(group.best_tm.map_or(tm, |b| b.max(tm)));
        }
        if let Some(m) = cell_f64(row, "motif_rmsd") {
            group.best_motif_rmsd = Some(group.best_motif_rmsd.map_or(m, |b| b.min(m)));
        }
    }

    let fmt = |v: Option<f64>| v.map_or_else(String::new, |v| format!("{v:.3}"));
    ResultsTable {
        headers: [
            BACKBONE_NAME_COLUMN,
            BACKBONE_PATH_COLUMN,
            "samples",
            "designable_samples",
            "best_tm_score",
            "best_motif_rmsd",
            SUCCESS_COLUMN,
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        rows: groups
            .into_iter()
            .map(|(name, g)| {
                vec![
                    name,
                    g.path,
                    g.samples.to_string(),
                    g.designable.to_string(),
                    fmt(g.best_tm),
                    fmt(g.best_motif_rmsd),
                    if g.designable > 0 { "True" } else { "False" }.to_string(),
                ]
            })
            .collect(),
    }
}

/// Empties `dir`, creating it when absent. Output directories hold only the
/// current run's structures.
fn recreate_dir(dir: &Path) -> Result<(), EngineError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(EngineError::io(dir))?;
    }
    fs::create_dir_all(dir).map_err(EngineError::io(dir))
}

/// Copies each distinct successful backbone into `target`; returns the copies.
fn copy_successful_backbones(
    complete: &ResultsTable,
    success: &[bool],
    target: &Path,
) -> Result<Vec<PathBuf>, EngineError> {
    let mut copied: Vec<PathBuf> = Vec::new();
    for (row, _) in success.iter().enumerate().filter(|(_, ok)| **ok) {
        let Some(source) = complete
            .cell(row, BACKBONE_PATH_COLUMN)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
        else {
            warn!(row = row + 1, "Successful row has no backbone path.");
            continue;
        };
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let destination = target.join(file_name);
        if copied.contains(&destination) {
            continue;
        }
        fs::copy(&source, &destination).map_err(EngineError::io(&source))?;
        copied.push(destination);
    }
    Ok(copied)
}

/// Clusters the successful backbones and copies one structure per cluster.
/// A clustering failure is logged and yields `None`.
fn cluster_successful(
    config: &EvaluationConfig,
    clusterer: &dyn StructureClusterer,
    successful_dir: &Path,
) -> Result<Option<ClusterSummary>, EngineError> {
    if let Some(assist) = &config.assist_protein {
        let target = successful_dir.join(ASSIST_PROTEIN_FILE);
        fs::copy(assist, &target).map_err(EngineError::io(assist))?;
    }
    let tsv = successful_dir.join(CLUSTER_TSV_FILE);
    let assignments = match clusterer.cluster(successful_dir, &tsv, config.cluster_tm_threshold) {
        Ok(a) if !a.is_empty() => a,
        Ok(_) => {
            warn!(dir = %successful_dir.display(), "Clustering produced no assignments.");
            return Ok(None);
        }
        Err(e) => {
            warn!(error = %e, "Diversity results not found; clustering failed.");
            return Ok(None);
        }
    };
    let excluded = config.assist_protein.as_ref().map(|_| ASSIST_PROTEIN_FILE);
    let summary = ClusterSummary::from_assignments(&assignments, excluded);

    let unique_dir = config.result_dir.join(UNIQUE_DIR);
    for representative in &summary.representatives {
        let with_ext = format!("{representative}.pdb");
        let source = [representative.as_str(), with_ext.as_str()]
            .iter()
            .map(|name| successful_dir.join(name))
            .find(|p| p.is_file());
        match source {
            Some(source) => {
                let target = unique_dir.join(source.file_name().unwrap_or_default());
                fs::copy(&source, &target).map_err(EngineError::io(&source))?;
            }
            None => warn!(%representative, "Cluster representative not found among successful backbones."),
        }
    }
    Ok(Some(summary))
}

/// Searches every structure on a bounded pool; failed searches are kept with
/// no score.
pub fn search_novelty(
    structures: &[PathBuf],
    searcher: &dyn NoveltySearcher,
    workers: usize,
    reporter: &ProgressReporter,
) -> Result<Vec<NoveltyResult>, EngineError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| EngineError::Internal(format!("novelty worker pool: {e}")))?;
    reporter.report(Progress::TaskStart {
        total_steps: structures.len() as u64,
    });
    let results = pool.install(|| {
        structures
            .par_iter()
            .map(|structure| {
                let pdb_tm = match searcher.max_similarity(structure) {
                    Ok(score) => Some(score),
                    Err(e) => {
                        warn!(structure = %structure.display(), error = %e, "Novelty search failed.");
                        None
                    }
                };
                reporter.report(Progress::TaskIncrement);
                NoveltyResult {
                    structure: structure.clone(),
                    pdb_tm,
                }
            })
            .collect()
    });
    reporter.report(Progress::TaskFinish);
    Ok(results)
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// `(1 - median pdbTM, min pdbTM)` over the searches that succeeded.
pub fn novelty_score(results: &[NoveltyResult]) -> Option<(f64, f64)> {
    let mut scores: Vec<f64> = results.iter().filter_map(|r| r.pdb_tm).collect();
    scores.sort_by(f64::total_cmp);
    let min = scores.first().copied()?;
    Some((1.0 - median(&scores)?, min))
}

fn write_novelty_results(path: &Path, results: &[NoveltyResult]) -> Result<(), MetricsError> {
    ResultsTable {
        headers: vec![BACKBONE_PATH_COLUMN.to_string(), PDB_TM_COLUMN.to_string()],
        rows: results
            .iter()
            .map(|r| {
                vec![
                    r.structure.display().to_string(),
                    r.pdb_tm
                        .map_or_else(|| NULL_SENTINEL.to_string(), |v| format!("{v:.3}")),
                ]
            })
            .collect(),
    }
    .write_path(path)
}

fn or_null(value: Option<f64>) -> String {
    value.map_or_else(|| NULL_SENTINEL.to_string(), |v| format!("{v:.3}"))
}

/// Human-readable report.
pub fn render_summary(summary: &EvaluationSummary) -> String {
    let evaluated = summary
        .result_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let absolute = fs::canonicalize(&summary.result_dir).unwrap_or_else(|_| summary.result_dir.clone());

    let mut text = String::new();
    let _ = writeln!(text, "-------------------Summary-------------------");
    let _ = writeln!(text, "The following are evaluation results for {}:", absolute.display());
    let _ = writeln!(text, "Evaluated Protein: {evaluated}");
    let _ = writeln!(text, "Total Samples: {}", summary.total);
    let _ = writeln!(text, "Designable Samples: {}", summary.designable);
    let _ = writeln!(text, "Designability Fraction: {:.2}%", summary.designable_fraction);
    let _ = writeln!(text, "Diversity: {}", or_null(summary.diversity));
    let _ = writeln!(text, "Novelty: {}", or_null(summary.novelty));
    if let Some(min) = summary.min_pdb_tm {
        let _ = writeln!(text, "Most Novel pdbTM: {min:.3}");
    }
    text
}

fn write_summary(summary: &EvaluationSummary, result_dir: &Path) -> Result<(), EngineError> {
    let text_path = result_dir.join(SUMMARY_TEXT_FILE);
    fs::write(&text_path, render_summary(summary)).map_err(EngineError::io(&text_path))?;

    let json_path = result_dir.join(SUMMARY_JSON_FILE);
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| EngineError::Internal(format!("summary serialization: {e}")))?;
    fs::write(&json_path, json).map_err(EngineError::io(&json_path))
}
