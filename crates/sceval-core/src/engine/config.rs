use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

pub const DEFAULT_MIN_TM_SCORE: f64 = 0.5;
pub const DEFAULT_MAX_RMSD: f64 = 2.0;
pub const DEFAULT_MAX_MOTIF_RMSD: f64 = 1.0;
pub const DEFAULT_CLUSTER_TM_THRESHOLD: f64 = 0.5;
pub const DEFAULT_DESIGN_CHAIN: char = 'A';

/// Acceptance thresholds a refolded sample must meet to count as designable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuccessCriteria {
    pub min_tm_score: f64,
    /// Global RMSD between design and prediction, in Å.
    pub max_rmsd: f64,
    /// Motif RMSD between reference and prediction, in Å.
    pub max_motif_rmsd: f64,
    pub min_plddt: Option<f64>,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self {
            min_tm_score: DEFAULT_MIN_TM_SCORE,
            max_rmsd: DEFAULT_MAX_RMSD,
            max_motif_rmsd: DEFAULT_MAX_MOTIF_RMSD,
            min_plddt: None,
        }
    }
}

impl SuccessCriteria {
    pub fn is_success(&self, tm_score: f64, rmsd: f64, motif_rmsd: f64, plddt: Option<f64>) -> bool {
        let plddt_ok = match (self.min_plddt, plddt) {
            (Some(min), Some(value)) => value >= min,
            (Some(_), None) => false,
            (None, _) => true,
        };
        tm_score >= self.min_tm_score
            && rmsd <= self.max_rmsd
            && motif_rmsd <= self.max_motif_rmsd
            && plddt_ok
    }
}

/// A single structure prediction back end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FoldingMethod {
    EsmFold,
    AlphaFold2,
}

impl FoldingMethod {
    /// Value written to the `folding_method` column.
    pub fn label(&self) -> &'static str {
        match self {
            FoldingMethod::EsmFold => "ESMFold",
            FoldingMethod::AlphaFold2 => "AlphaFold2",
        }
    }

    pub fn table_prefix(&self) -> &'static str {
        match self {
            FoldingMethod::EsmFold => "esm",
            FoldingMethod::AlphaFold2 => "af2",
        }
    }

    /// Subdirectory of `self_consistency/` holding the predicted structures.
    pub fn output_subdir(&self) -> &'static str {
        match self {
            FoldingMethod::EsmFold => "esmf",
            FoldingMethod::AlphaFold2 => "af2",
        }
    }

    pub fn table_name(&self) -> String {
        format!("{}_eval_results.csv", self.table_prefix())
    }
}

impl fmt::Display for FoldingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which prediction back ends a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMethod {
    #[default]
    EsmFold,
    AlphaFold2,
    Both,
}

impl PredictionMethod {
    pub fn methods(&self) -> &'static [FoldingMethod] {
        match self {
            PredictionMethod::EsmFold => &[FoldingMethod::EsmFold],
            PredictionMethod::AlphaFold2 => &[FoldingMethod::AlphaFold2],
            PredictionMethod::Both => &[FoldingMethod::EsmFold, FoldingMethod::AlphaFold2],
        }
    }

    pub fn uses(&self, method: FoldingMethod) -> bool {
        self.methods().contains(&method)
    }

    /// Prefix of the per-candidate table the evaluator merges.
    pub fn result_prefix(&self) -> &'static str {
        match self {
            PredictionMethod::Both => "joint",
            PredictionMethod::EsmFold => FoldingMethod::EsmFold.table_prefix(),
            PredictionMethod::AlphaFold2 => FoldingMethod::AlphaFold2.table_prefix(),
        }
    }
}

impl FromStr for PredictionMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "esmfold" | "esm" => Ok(PredictionMethod::EsmFold),
            "alphafold2" | "af2" => Ok(PredictionMethod::AlphaFold2),
            "both" | "joint" => Ok(PredictionMethod::Both),
            other => Err(ConfigError::InvalidValue {
                parameter: "prediction_method",
                reason: format!("unknown method '{other}' (expected esmfold, alphafold2 or both)"),
            }),
        }
    }
}

/// How motif positions are handed to the sequence design tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedPositionStrategy {
    /// Only `chain` is designed; every fixed motif position lives on it.
    SingleChain { chain: char },
    /// Both chains are designable. Motif positions stay fixed on `design_chain`
    /// except `partner_positions`, which are fixed on `partner_chain` instead.
    Complex {
        design_chain: char,
        partner_chain: char,
        partner_positions: Vec<isize>,
    },
}

impl Default for FixedPositionStrategy {
    fn default() -> Self {
        FixedPositionStrategy::SingleChain {
            chain: DEFAULT_DESIGN_CHAIN,
        }
    }
}

/// Case identifier → fixed-position strategy, resolved once per candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedPositionStrategyTable {
    default: FixedPositionStrategy,
    cases: HashMap<String, FixedPositionStrategy>,
}

impl FixedPositionStrategyTable {
    pub fn new(default: FixedPositionStrategy) -> Self {
        Self {
            default,
            cases: HashMap::new(),
        }
    }

    pub fn with_case(mut self, case: impl Into<String>, strategy: FixedPositionStrategy) -> Self {
        self.cases.insert(case.into(), strategy);
        self
    }

    /// Returns the strategy of the first identifier that has one, else the default.
    pub fn resolve<'s>(&self, identifiers: impl IntoIterator<Item = &'s str>) -> &FixedPositionStrategy {
        identifiers
            .into_iter()
            .find_map(|id| self.cases.get(id))
            .unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefoldConfig {
    pub backbone_dir: PathBuf,
    pub output_dir: PathBuf,
    /// A reference PDB file, or a directory holding `<reference>.pdb` files.
    pub reference_pdb: PathBuf,
    pub motif_csv: Option<PathBuf>,
    pub benchmark_names: Vec<String>,
    pub max_backbones: Option<usize>,
    pub design_chain: char,
    pub prediction: PredictionMethod,
    pub fixed_positions: FixedPositionStrategyTable,
}

#[derive(Default)]
pub struct RefoldConfigBuilder {
    backbone_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    reference_pdb: Option<PathBuf>,
    motif_csv: Option<PathBuf>,
    benchmark_names: Option<Vec<String>>,
    max_backbones: Option<usize>,
    design_chain: Option<char>,
    prediction: Option<PredictionMethod>,
    fixed_positions: Option<FixedPositionStrategyTable>,
}

impl RefoldConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backbone_dir(mut self, path: PathBuf) -> Self {
        self.backbone_dir = Some(path);
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn reference_pdb(mut self, path: PathBuf) -> Self {
        self.reference_pdb = Some(path);
        self
    }
    pub fn motif_csv(mut self, path: Option<PathBuf>) -> Self {
        self.motif_csv = path;
        self
    }
    pub fn benchmark_names(mut self, names: Vec<String>) -> Self {
        self.benchmark_names = Some(names);
        self
    }
    pub fn max_backbones(mut self, max: Option<usize>) -> Self {
        self.max_backbones = max;
        self
    }
    pub fn design_chain(mut self, chain: char) -> Self {
        self.design_chain = Some(chain);
        self
    }
    pub fn prediction(mut self, method: PredictionMethod) -> Self {
        self.prediction = Some(method);
        self
    }
    pub fn fixed_positions(mut self, table: FixedPositionStrategyTable) -> Self {
        self.fixed_positions = Some(table);
        self
    }

    pub fn build(self) -> Result<RefoldConfig, ConfigError> {
        if self.max_backbones == Some(0) {
            return Err(ConfigError::InvalidValue {
                parameter: "max_backbones",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        Ok(RefoldConfig {
            backbone_dir: self
                .backbone_dir
                .ok_or(ConfigError::MissingParameter("backbone_dir"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            reference_pdb: self
                .reference_pdb
                .ok_or(ConfigError::MissingParameter("reference_pdb"))?,
            motif_csv: self.motif_csv,
            benchmark_names: self.benchmark_names.unwrap_or_else(|| {
                crate::engine::naming::BENCHMARK_CASES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            max_backbones: self.max_backbones,
            design_chain: self.design_chain.unwrap_or(DEFAULT_DESIGN_CHAIN),
            prediction: self.prediction.unwrap_or_default(),
            fixed_positions: self.fixed_positions.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub result_dir: PathBuf,
    pub prediction: PredictionMethod,
    pub criteria: SuccessCriteria,
    pub cluster_tm_threshold: f64,
    pub assist_protein: Option<PathBuf>,
    /// Worker threads for the novelty search.
    pub novelty_workers: usize,
}

#[derive(Default)]
pub struct EvaluationConfigBuilder {
    result_dir: Option<PathBuf>,
    prediction: Option<PredictionMethod>,
    criteria: Option<SuccessCriteria>,
    cluster_tm_threshold: Option<f64>,
    assist_protein: Option<PathBuf>,
    novelty_workers: Option<usize>,
}

impl EvaluationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_dir(mut self, path: PathBuf) -> Self {
        self.result_dir = Some(path);
        self
    }
    pub fn prediction(mut self, method: PredictionMethod) -> Self {
        self.prediction = Some(method);
        self
    }
    pub fn criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }
    pub fn cluster_tm_threshold(mut self, threshold: f64) -> Self {
        self.cluster_tm_threshold = Some(threshold);
        self
    }
    pub fn assist_protein(mut self, path: Option<PathBuf>) -> Self {
        self.assist_protein = path;
        self
    }
    pub fn novelty_workers(mut self, n: usize) -> Self {
        self.novelty_workers = Some(n);
        self
    }

    pub fn build(self) -> Result<EvaluationConfig, ConfigError> {
        let cluster_tm_threshold = self
            .cluster_tm_threshold
            .unwrap_or(DEFAULT_CLUSTER_TM_THRESHOLD);
        if !(0.0..=1.0).contains(&cluster_tm_threshold) {
            return Err(ConfigError::InvalidValue {
                parameter: "cluster_tm_threshold",
                reason: format!("{cluster_tm_threshold} is outside [0, 1]"),
            });
        }
        let novelty_workers = match self.novelty_workers {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    parameter: "novelty_workers",
                    reason: "must be at least 1".to_string(),
                });
            }
            Some(n) => n,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        };
        Ok(EvaluationConfig {
            result_dir: self
                .result_dir
                .ok_or(ConfigError::MissingParameter("result_dir"))?,
            prediction: self.prediction.unwrap_or_default(),
            criteria: self.criteria.unwrap_or_default(),
            cluster_tm_threshold,
            assist_protein: self.assist_protein,
            novelty_workers,
        })
    }
}
