//! Foldseek collaborators: structural clustering (diversity) and database
//! search (novelty).

use super::{Invocation, RetryPolicy, ToolError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TOOL: &str = "Foldseek";

/// Cluster assignments as `(representative, member)` pairs.
pub type ClusterAssignments = Vec<(String, String)>;

/// Groups structures into clusters.
pub trait StructureClusterer {
    /// Clusters every structure in `input_dir`, writing the assignment table to
    /// `output_tsv` and returning its rows.
    fn cluster(
        &self,
        input_dir: &Path,
        output_tsv: &Path,
        tm_threshold: f64,
    ) -> Result<ClusterAssignments, ToolError>;
}

/// Scores a structure against a reference database.
pub trait NoveltySearcher: Sync {
    /// Highest alignment TM-score of `structure` against the database (0 when
    /// nothing aligns).
    fn max_similarity(&self, structure: &Path) -> Result<f64, ToolError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldseekConfig {
    pub program: PathBuf,
    pub database: Option<PathBuf>,
    pub alignment_type: u8,
    /// Scratch space for Foldseek's temporary files.
    pub tmp_dir: PathBuf,
    pub threads_per_search: usize,
    pub retry: RetryPolicy,
}

impl Default for FoldseekConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("foldseek"),
            database: None,
            alignment_type: 1,
            tmp_dir: std::env::temp_dir().join("sceval-foldseek"),
            threads_per_search: 1,
            retry: RetryPolicy::once(),
        }
    }
}

pub struct Foldseek {
    config: FoldseekConfig,
}

impl Foldseek {
    pub fn new(config: FoldseekConfig) -> Self {
        Self { config }
    }

    pub fn cluster_invocation(&self, input_dir: &Path, prefix: &Path, tmp: &Path, tm: f64) -> Invocation {
        Invocation::new(&self.config.program)
            .arg("easy-cluster")
            .arg(input_dir)
            .arg(prefix)
            .arg(tmp)
            .arg("--alignment-type")
            .arg(self.config.alignment_type.to_string())
            .arg("--tmscore-threshold")
            .arg(tm.to_string())
    }

    pub fn search_invocation(&self, query: &Path, database: &Path, out: &Path, tmp: &Path) -> Invocation {
        Invocation::new(&self.config.program)
            .arg("easy-search")
            .arg(query)
            .arg(database)
            .arg(out)
            .arg(tmp)
            .arg("--alignment-type")
            .arg(self.config.alignment_type.to_string())
            .arg("--exhaustive-search")
            .args(["--tmscore-threshold", "0.0", "--max-seqs", "10000"])
            .args(["--format-output", "query,target,alntmscore"])
            .arg("--threads")
            .arg(self.config.threads_per_search.to_string())
    }

    fn scratch(&self, name: &str) -> Result<PathBuf, ToolError> {
        let dir = self.config.tmp_dir.join(name);
        fs::create_dir_all(&dir).map_err(ToolError::io(TOOL))?;
        Ok(dir)
    }
}

/// Parses Foldseek's two-column cluster table.
pub fn parse_cluster_tsv(text: &str) -> ClusterAssignments {
    text.lines()
        .filter_map(|line| {
            let mut cols = line.split('\t');
            let rep = cols.next()?.trim();
            let member = cols.next()?.trim();
            (!rep.is_empty() && !member.is_empty()).then(|| (rep.to_string(), member.to_string()))
        })
        .collect()
}

/// Highest `alntmscore` in an `easy-search` result with
/// `query,target,alntmscore` columns.
pub fn parse_search_hits(text: &str) -> f64 {
    text.lines()
        .filter_map(|line| line.split('\t').nth(2)?.trim().parse::<f64>().ok())
        .fold(0.0, f64::max)
}

/// Diversity summary over a set of cluster assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub samples: usize,
    pub clusters: usize,
    /// One structure per cluster, in representative order.
    pub representatives: Vec<String>,
}

impl ClusterSummary {
    /// Summarises `assignments`, ignoring the `excluded` helper structure.
    ///
    /// A cluster whose representative is the excluded structure is represented
    /// by its first other member instead; a cluster holding only the excluded
    /// structure does not count.
    pub fn from_assignments(assignments: &ClusterAssignments, excluded: Option<&str>) -> Self {
        let mut clusters: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut order: Vec<&str> = Vec::new();
        for (rep, member) in assignments {
            if Some(member.as_str()) == excluded {
                continue;
            }
            let entry = clusters.entry(rep.as_str()).or_default();
            if entry.is_empty() {
                order.push(rep.as_str());
            }
            if !entry.contains(&member.as_str()) {
                entry.push(member.as_str());
            }
        }
        let representatives: Vec<String> = order
            .iter()
            .filter_map(|rep| {
                let members = clusters.get(rep)?;
                if Some(*rep) == excluded {
                    members.first().map(|m| m.to_string())
                } else {
                    Some(rep.to_string())
                }
            })
            .collect();
        Self {
            samples: clusters.values().map(Vec::len).sum(),
            clusters: representatives.len(),
            representatives,
        }
    }

    /// Unique clusters per successful structure; `None` when there are none.
    pub fn diversity(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.clusters as f64 / self.samples as f64)
    }
}

impl StructureClusterer for Foldseek {
    fn cluster(
        &self,
        input_dir: &Path,
        output_tsv: &Path,
        tm_threshold: f64,
    ) -> Result<ClusterAssignments, ToolError> {
        let tmp = self.scratch("cluster")?;
        let prefix = tmp.join("res");
        self.cluster_invocation(input_dir, &prefix, &tmp.join("tmp"), tm_threshold)
            .log_to(tmp.join("cluster.log"))
            .run(TOOL, &self.config.retry)?;

        let produced = tmp.join("res_cluster.tsv");
        super::require_output(TOOL, &produced)?;
        fs::copy(&produced, output_tsv).map_err(ToolError::io(TOOL))?;
        let text = fs::read_to_string(output_tsv).map_err(ToolError::io(TOOL))?;
        Ok(parse_cluster_tsv(&text))
    }
}

impl NoveltySearcher for Foldseek {
    fn max_similarity(&self, structure: &Path) -> Result<f64, ToolError> {
        let database = self.config.database.as_deref().ok_or_else(|| ToolError::Fatal {
            tool: TOOL.to_string(),
            reason: "no search database configured".to_string(),
        })?;
        let stem = structure
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "query".to_string());
        let tmp = self.scratch(&format!("search_{stem}"))?;
        let out = tmp.join("aln.m8");
        self.search_invocation(structure, database, &out, &tmp.join("tmp"))
            .log_to(tmp.join("search.log"))
            .run(TOOL, &self.config.retry)?;
        super::require_output(TOOL, &out)?;
        let text = fs::read_to_string(&out).map_err(ToolError::io(TOOL))?;
        let best = parse_search_hits(&text);
        debug!(structure = %structure.display(), pdb_tm = best, "Novelty search finished.");
        Ok(best)
    }
}
