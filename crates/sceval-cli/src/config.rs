use crate::cli::{CommonArgs, EvaluationOverrides, RefoldOverrides};
use crate::error::{CliError, Result};
use sceval::engine::config::{
    self as core_config, FixedPositionStrategy, FixedPositionStrategyTable, PredictionMethod,
    SuccessCriteria,
};
use sceval::engine::tools::RetryPolicy;
use sceval::engine::tools::colabfold::ColabFoldConfig;
use sceval::engine::tools::esmfold::EsmFoldConfig;
use sceval::engine::tools::foldseek::FoldseekConfig;
use sceval::engine::tools::mpnn::MpnnConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRefoldConfig {
    backbone_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    reference_pdb: Option<PathBuf>,
    motif_csv: Option<PathBuf>,
    max_backbones: Option<usize>,
    design_chain: Option<char>,
    benchmark_names: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialMpnnConfig {
    root_dir: Option<PathBuf>,
    python: Option<PathBuf>,
    seq_per_sample: Option<usize>,
    batch_size: Option<usize>,
    sampling_temp: Option<f64>,
    seed: Option<u64>,
    device: Option<String>,
    hide_accelerators: Option<bool>,
    sort_by_score: Option<bool>,
    retries: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEsmFoldConfig {
    command: Option<Vec<String>>,
    device: Option<String>,
    retries: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialColabFoldConfig {
    program: Option<PathBuf>,
    num_recycle: Option<u32>,
    random_seed: Option<u64>,
    model_type: Option<String>,
    num_models: Option<u32>,
    rank: Option<String>,
    use_amber_relax: Option<bool>,
    num_relax: Option<u32>,
    use_gpu_relax: Option<bool>,
    retries: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialFoldseekConfig {
    program: Option<PathBuf>,
    database: Option<PathBuf>,
    alignment_type: Option<u8>,
    tmp_dir: Option<PathBuf>,
    threads_per_search: Option<usize>,
    retries: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEvaluationConfig {
    cluster_tm_threshold: Option<f64>,
    novelty_workers: Option<usize>,
    assist_protein: Option<PathBuf>,
    min_tm_score: Option<f64>,
    max_rmsd: Option<f64>,
    max_motif_rmsd: Option<f64>,
    min_plddt: Option<f64>,
}

/// One `[[fixed-positions]]` entry. A `partner-chain` makes the case a
/// two-chain complex.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialFixedPositionCase {
    case: String,
    design_chain: Option<char>,
    partner_chain: Option<char>,
    #[serde(default)]
    partner_positions: Vec<isize>,
}

impl PartialFixedPositionCase {
    fn strategy(&self) -> Result<FixedPositionStrategy> {
        let design_chain = self.design_chain.unwrap_or(core_config::DEFAULT_DESIGN_CHAIN);
        match self.partner_chain {
            Some(partner_chain) if partner_chain == design_chain => Err(CliError::Config(format!(
                "Fixed-position case '{}' uses chain {} as both design and partner chain.",
                self.case, partner_chain
            ))),
            Some(partner_chain) => Ok(FixedPositionStrategy::Complex {
                design_chain,
                partner_chain,
                partner_positions: self.partner_positions.clone(),
            }),
            None if !self.partner_positions.is_empty() => Err(CliError::Config(format!(
                "Fixed-position case '{}' lists partner positions without a partner chain.",
                self.case
            ))),
            None => Ok(FixedPositionStrategy::SingleChain {
                chain: design_chain,
            }),
        }
    }
}

/// Everything a configuration file may set, before defaults and CLI flags.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialAppConfig {
    prediction_method: Option<String>,
    refold: Option<PartialRefoldConfig>,
    mpnn: Option<PartialMpnnConfig>,
    esmfold: Option<PartialEsmFoldConfig>,
    colabfold: Option<PartialColabFoldConfig>,
    foldseek: Option<PartialFoldseekConfig>,
    evaluation: Option<PartialEvaluationConfig>,
    fixed_positions: Option<Vec<PartialFixedPositionCase>>,
}

/// Final settings for the refolding stage.
#[derive(Debug, Clone)]
pub struct RefoldSettings {
    pub core: core_config::RefoldConfig,
    pub mpnn: MpnnConfig,
    pub esmfold: EsmFoldConfig,
    pub colabfold: ColabFoldConfig,
}

/// Final settings for the evaluation stage.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    pub core: core_config::EvaluationConfig,
    pub foldseek: FoldseekConfig,
}

fn retry_policy(
    default: RetryPolicy,
    retries: Option<usize>,
    timeout_secs: Option<u64>,
    section: &str,
) -> Result<RetryPolicy> {
    if retries == Some(0) {
        return Err(CliError::Config(format!(
            "`{}.retries` must be at least 1.",
            section
        )));
    }
    Ok(RetryPolicy::new(retries.unwrap_or(default.max_attempts))
        .with_timeout(timeout_secs.map(Duration::from_secs).or(default.timeout)))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

impl PartialAppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the optional config file and applies `--set` overrides on top.
    pub fn load(common: &CommonArgs) -> Result<Self> {
        let mut config = match &common.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_set_values(&common.set_values)?;
        Ok(config)
    }

    pub fn prediction_method(&self, common: &CommonArgs) -> Result<PredictionMethod> {
        if let Some(method) = common.prediction_method {
            return Ok(method);
        }
        match &self.prediction_method {
            Some(name) => name
                .parse()
                .map_err(|e: core_config::ConfigError| CliError::Config(e.to_string())),
            None => Ok(PredictionMethod::default()),
        }
    }

    fn fixed_position_table(&self) -> Result<FixedPositionStrategyTable> {
        let mut table = FixedPositionStrategyTable::default();
        for case in self.fixed_positions.iter().flatten() {
            table = table.with_case(case.case.clone(), case.strategy()?);
        }
        Ok(table)
    }

    pub fn refold_settings(
        &self,
        common: &CommonArgs,
        args: &RefoldOverrides,
    ) -> Result<RefoldSettings> {
        let refold = self.refold.as_ref();
        let pick = |cli: &Option<PathBuf>, file: Option<&Option<PathBuf>>| {
            cli.clone().or_else(|| file.cloned().flatten())
        };

        let mut builder = core_config::RefoldConfigBuilder::new()
            .motif_csv(pick(&args.motif_csv, refold.map(|r| &r.motif_csv)))
            .max_backbones(
                args.max_backbones
                    .or(refold.and_then(|r| r.max_backbones)),
            )
            .prediction(self.prediction_method(common)?)
            .fixed_positions(self.fixed_position_table()?);
        if let Some(path) = pick(&args.backbone_dir, refold.map(|r| &r.backbone_dir)) {
            builder = builder.backbone_dir(path);
        }
        if let Some(path) = pick(&args.output_dir, refold.map(|r| &r.output_dir)) {
            builder = builder.output_dir(path);
        }
        if let Some(path) = pick(&args.reference_pdb, refold.map(|r| &r.reference_pdb)) {
            builder = builder.reference_pdb(path);
        }
        if let Some(chain) = refold.and_then(|r| r.design_chain) {
            builder = builder.design_chain(chain);
        }
        if let Some(names) = refold.and_then(|r| r.benchmark_names.clone()) {
            builder = builder.benchmark_names(names);
        }
        let core = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

        Ok(RefoldSettings {
            core,
            mpnn: self.mpnn_config(args.seq_per_sample)?,
            esmfold: self.esmfold_config()?,
            colabfold: self.colabfold_config()?,
        })
    }

    fn mpnn_config(&self, seq_per_sample: Option<usize>) -> Result<MpnnConfig> {
        let defaults = MpnnConfig::default();
        let unset = PartialMpnnConfig::default();
        let file = self.mpnn.as_ref().unwrap_or(&unset);
        let config = MpnnConfig {
            root_dir: file.root_dir.clone().unwrap_or(defaults.root_dir),
            python: file.python.clone().unwrap_or(defaults.python),
            seq_per_sample: seq_per_sample
                .or(file.seq_per_sample)
                .unwrap_or(defaults.seq_per_sample),
            batch_size: file.batch_size.unwrap_or(defaults.batch_size),
            sampling_temp: file.sampling_temp.unwrap_or(defaults.sampling_temp),
            seed: file.seed.unwrap_or(defaults.seed),
            device: file.device.clone().or(defaults.device),
            hide_accelerators: file.hide_accelerators.unwrap_or(defaults.hide_accelerators),
            sort_by_score: file.sort_by_score.unwrap_or(defaults.sort_by_score),
            retry: retry_policy(defaults.retry, file.retries, file.timeout_secs, "mpnn")?,
        };
        config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(config)
    }

    fn esmfold_config(&self) -> Result<EsmFoldConfig> {
        let defaults = EsmFoldConfig::default();
        let Some(file) = &self.esmfold else {
            return Ok(defaults);
        };
        let command = file.command.clone().unwrap_or(defaults.command);
        if command.is_empty() {
            return Err(CliError::Config(
                "`esmfold.command` must name the worker executable.".to_string(),
            ));
        }
        Ok(EsmFoldConfig {
            command,
            device: file.device.clone().or(defaults.device),
            retry: retry_policy(defaults.retry, file.retries, file.timeout_secs, "esmfold")?,
        })
    }

    fn colabfold_config(&self) -> Result<ColabFoldConfig> {
        let defaults = ColabFoldConfig::default();
        let Some(file) = &self.colabfold else {
            return Ok(defaults);
        };
        Ok(ColabFoldConfig {
            program: file.program.clone().unwrap_or(defaults.program),
            num_recycle: file.num_recycle.unwrap_or(defaults.num_recycle),
            random_seed: file.random_seed.unwrap_or(defaults.random_seed),
            model_type: file.model_type.clone().unwrap_or(defaults.model_type),
            num_models: file.num_models.unwrap_or(defaults.num_models),
            rank: file.rank.clone().unwrap_or(defaults.rank),
            use_amber_relax: file.use_amber_relax.unwrap_or(defaults.use_amber_relax),
            num_relax: file.num_relax.unwrap_or(defaults.num_relax),
            use_gpu_relax: file.use_gpu_relax.unwrap_or(defaults.use_gpu_relax),
            retry: retry_policy(defaults.retry, file.retries, file.timeout_secs, "colabfold")?,
        })
    }

    /// Builds the evaluation settings. `result_dir` falls back to
    /// `refold.output-dir`; a Foldseek database is mandatory.
    pub fn evaluation_settings(
        &self,
        common: &CommonArgs,
        result_dir: Option<PathBuf>,
        args: &EvaluationOverrides,
        threads: Option<usize>,
    ) -> Result<EvaluationSettings> {
        let result_dir = result_dir
            .or_else(|| self.refold.as_ref().and_then(|r| r.output_dir.clone()))
            .ok_or_else(|| {
                CliError::Config(
                    "A result directory is required: pass --result-dir or set `refold.output-dir`."
                        .to_string(),
                )
            })?;

        let foldseek_file = self.foldseek.as_ref();
        let database = args
            .foldseek_database
            .clone()
            .or_else(|| foldseek_file.and_then(|f| f.database.clone()))
            .ok_or_else(|| {
                CliError::Config(
                    "A Foldseek database is required for novelty: pass --foldseek-database or set `foldseek.database`."
                        .to_string(),
                )
            })?;

        let eval_file = self.evaluation.as_ref();
        let defaults = SuccessCriteria::default();
        let criteria = SuccessCriteria {
            min_tm_score: eval_file
                .and_then(|e| e.min_tm_score)
                .unwrap_or(defaults.min_tm_score),
            max_rmsd: eval_file
                .and_then(|e| e.max_rmsd)
                .unwrap_or(defaults.max_rmsd),
            max_motif_rmsd: eval_file
                .and_then(|e| e.max_motif_rmsd)
                .unwrap_or(defaults.max_motif_rmsd),
            min_plddt: eval_file.and_then(|e| e.min_plddt).or(defaults.min_plddt),
        };

        let mut builder = core_config::EvaluationConfigBuilder::new()
            .result_dir(result_dir)
            .prediction(self.prediction_method(common)?)
            .criteria(criteria)
            .assist_protein(
                args.assist_protein
                    .clone()
                    .or_else(|| eval_file.and_then(|e| e.assist_protein.clone())),
            );
        if let Some(threshold) = eval_file.and_then(|e| e.cluster_tm_threshold) {
            builder = builder.cluster_tm_threshold(threshold);
        }
        if let Some(workers) = threads.or(eval_file.and_then(|e| e.novelty_workers)) {
            builder = builder.novelty_workers(workers);
        }
        let core = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

        let defaults = FoldseekConfig::default();
        let foldseek = FoldseekConfig {
            program: foldseek_file
                .and_then(|f| f.program.clone())
                .unwrap_or(defaults.program),
            database: Some(database),
            alignment_type: foldseek_file
                .and_then(|f| f.alignment_type)
                .unwrap_or(defaults.alignment_type),
            tmp_dir: foldseek_file
                .and_then(|f| f.tmp_dir.clone())
                .unwrap_or_else(|| core.result_dir.join("foldseek_tmp")),
            threads_per_search: foldseek_file
                .and_then(|f| f.threads_per_search)
                .unwrap_or(defaults.threads_per_search),
            retry: retry_policy(
                defaults.retry,
                foldseek_file.and_then(|f| f.retries),
                foldseek_file.and_then(|f| f.timeout_secs),
                "foldseek",
            )?,
        };

        Ok(EvaluationSettings { core, foldseek })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "prediction-method" => {
                    parse_value::<PredictionMethod>(key, value_str)?;
                    self.prediction_method = Some(value_str.to_string());
                }
                "refold.max-backbones" => {
                    self.refold.get_or_insert_with(Default::default).max_backbones =
                        Some(parse_value(key, value_str)?);
                }
                "refold.design-chain" => {
                    self.refold.get_or_insert_with(Default::default).design_chain =
                        Some(parse_value(key, value_str)?);
                }
                "mpnn.seq-per-sample" => {
                    self.mpnn.get_or_insert_with(Default::default).seq_per_sample =
                        Some(parse_value(key, value_str)?);
                }
                "mpnn.batch-size" => {
                    self.mpnn.get_or_insert_with(Default::default).batch_size =
                        Some(parse_value(key, value_str)?);
                }
                "mpnn.sampling-temp" => {
                    self.mpnn.get_or_insert_with(Default::default).sampling_temp =
                        Some(parse_value(key, value_str)?);
                }
                "mpnn.seed" => {
                    self.mpnn.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value_str)?);
                }
                "mpnn.retries" => {
                    self.mpnn.get_or_insert_with(Default::default).retries =
                        Some(parse_value(key, value_str)?);
                }
                "esmfold.retries" => {
                    self.esmfold.get_or_insert_with(Default::default).retries =
                        Some(parse_value(key, value_str)?);
                }
                "colabfold.num-recycle" => {
                    self.colabfold.get_or_insert_with(Default::default).num_recycle =
                        Some(parse_value(key, value_str)?);
                }
                "colabfold.retries" => {
                    self.colabfold.get_or_insert_with(Default::default).retries =
                        Some(parse_value(key, value_str)?);
                }
                "foldseek.database" => {
                    self.foldseek.get_or_insert_with(Default::default).database =
                        Some(PathBuf::from(value_str));
                }
                "foldseek.retries" => {
                    self.foldseek.get_or_insert_with(Default::default).retries =
                        Some(parse_value(key, value_str)?);
                }
                "evaluation.cluster-tm-threshold" => {
                    self.evaluation
                        .get_or_insert_with(Default::default)
                        .cluster_tm_threshold = Some(parse_value(key, value_str)?);
                }
                "evaluation.novelty-workers" => {
                    self.evaluation
                        .get_or_insert_with(Default::default)
                        .novelty_workers = Some(parse_value(key, value_str)?);
                }
                "evaluation.min-tm-score" => {
                    self.evaluation.get_or_insert_with(Default::default).min_tm_score =
                        Some(parse_value(key, value_str)?);
                }
                "evaluation.max-rmsd" => {
                    self.evaluation.get_or_insert_with(Default::default).max_rmsd =
                        Some(parse_value(key, value_str)?);
                }
                "evaluation.max-motif-rmsd" => {
                    self.evaluation
                        .get_or_insert_with(Default::default)
                        .max_motif_rmsd = Some(parse_value(key, value_str)?);
                }
                "evaluation.min-plddt" => {
                    self.evaluation.get_or_insert_with(Default::default).min_plddt =
                        Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("sceval.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn common(config: Option<PathBuf>, set_values: &[&str]) -> CommonArgs {
        CommonArgs {
            config,
            prediction_method: None,
            set_values: set_values.iter().map(|s| s.to_string()).collect(),
        }
    }

    const FULL_CONFIG: &str = r#"
        prediction-method = "both"

        [refold]
        backbone-dir = "designs"
        output-dir = "results"
        reference-pdb = "motifs"
        max-backbones = 50
        design-chain = "A"

        [mpnn]
        root-dir = "/opt/ProteinMPNN"
        seq-per-sample = 4
        sampling-temp = 0.2
        retries = 2

        [esmfold]
        command = ["python", "worker.py"]
        timeout-secs = 600

        [foldseek]
        database = "/data/pdb"

        [evaluation]
        cluster-tm-threshold = 0.6
        novelty-workers = 3
        min-plddt = 70.0

        [[fixed-positions]]
        case = "6VW1"
        partner-chain = "B"
        partner-positions = [20, 21, 22]
    "#;

    #[test]
    fn file_values_are_merged_with_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, FULL_CONFIG);
        let config = PartialAppConfig::load(&common(Some(path), &[])).unwrap();
        let refold = config
            .refold_settings(&common(None, &[]), &RefoldOverrides::default())
            .unwrap();

        assert_eq!(refold.core.backbone_dir, PathBuf::from("designs"));
        assert_eq!(refold.core.max_backbones, Some(50));
        assert_eq!(refold.core.prediction, PredictionMethod::Both);
        assert_eq!(refold.mpnn.seq_per_sample, 4);
        assert_eq!(refold.mpnn.sampling_temp, 0.2);
        assert_eq!(refold.mpnn.retry.max_attempts, 2);
        assert_eq!(refold.mpnn.seed, MpnnConfig::default().seed);
        assert_eq!(refold.esmfold.retry.max_attempts, 3);
        assert_eq!(refold.esmfold.retry.timeout, Some(Duration::from_secs(600)));
        assert_eq!(refold.colabfold, ColabFoldConfig::default());
        assert_eq!(
            refold.core.fixed_positions.resolve(["6VW1"]),
            &FixedPositionStrategy::Complex {
                design_chain: 'A',
                partner_chain: 'B',
                partner_positions: vec![20, 21, 22],
            }
        );

        let eval = config
            .evaluation_settings(&common(None, &[]), None, &EvaluationOverrides::default(), None)
            .unwrap();
        assert_eq!(eval.core.result_dir, PathBuf::from("results"));
        assert_eq!(eval.core.cluster_tm_threshold, 0.6);
        assert_eq!(eval.core.novelty_workers, 3);
        assert_eq!(eval.core.criteria.min_plddt, Some(70.0));
        assert_eq!(eval.foldseek.database, Some(PathBuf::from("/data/pdb")));
        assert_eq!(eval.foldseek.tmp_dir, PathBuf::from("results/foldseek_tmp"));
    }

    #[test]
    fn cli_overrides_set_values_which_override_the_file() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, FULL_CONFIG);
        let mut args = common(
            Some(path),
            &["mpnn.seq-per-sample=6", "refold.max-backbones=5", "mpnn.seed=7"],
        );
        let config = PartialAppConfig::load(&args).unwrap();

        args.prediction_method = Some(PredictionMethod::EsmFold);
        let overrides = RefoldOverrides {
            seq_per_sample: Some(2),
            output_dir: Some(PathBuf::from("elsewhere")),
            ..RefoldOverrides::default()
        };
        let refold = config.refold_settings(&args, &overrides).unwrap();

        assert_eq!(refold.mpnn.seq_per_sample, 2);
        assert_eq!(refold.mpnn.seed, 7);
        assert_eq!(refold.core.max_backbones, Some(5));
        assert_eq!(refold.core.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(refold.core.prediction, PredictionMethod::EsmFold);
    }

    #[test]
    fn thread_flag_sizes_the_novelty_pool() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, FULL_CONFIG);
        let config = PartialAppConfig::load(&common(Some(path), &[])).unwrap();
        let eval = config
            .evaluation_settings(&common(None, &[]), None, &EvaluationOverrides::default(), Some(8))
            .unwrap();
        assert_eq!(eval.core.novelty_workers, 8);
    }

    #[test]
    fn evaluation_requires_a_foldseek_database() {
        let config = PartialAppConfig::default();
        let err = config
            .evaluation_settings(
                &common(None, &[]),
                Some(PathBuf::from("results")),
                &EvaluationOverrides::default(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("Foldseek database")));

        let overrides = EvaluationOverrides {
            foldseek_database: Some(PathBuf::from("db")),
            assist_protein: None,
        };
        assert!(
            config
                .evaluation_settings(&common(None, &[]), Some(PathBuf::from("results")), &overrides, None)
                .is_ok()
        );
    }

    #[test]
    fn missing_required_paths_are_reported() {
        let config = PartialAppConfig::default();
        let err = config
            .refold_settings(&common(None, &[]), &RefoldOverrides::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("backbone_dir")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "[mpnn]\nseq-per-sampel = 4\n");
        assert!(matches!(
            PartialAppConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));

        let mut config = PartialAppConfig::default();
        assert!(config.apply_set_values(&["mpnn.colour=red".into()]).is_err());
        assert!(config.apply_set_values(&["mpnn.seed".into()]).is_err());
        assert!(config.apply_set_values(&["mpnn.seed=abc".into()]).is_err());
        assert!(config.apply_set_values(&["prediction-method=rosetta".into()]).is_err());
    }

    #[test]
    fn invalid_fixed_position_cases_are_rejected() {
        let case = PartialFixedPositionCase {
            case: "X".into(),
            design_chain: Some('A'),
            partner_chain: Some('A'),
            partner_positions: vec![],
        };
        assert!(case.strategy().is_err());

        let orphan = PartialFixedPositionCase {
            case: "Y".into(),
            design_chain: None,
            partner_chain: None,
            partner_positions: vec![4],
        };
        assert!(orphan.strategy().is_err());
    }

    #[test]
    fn zero_retries_is_a_configuration_error() {
        let mut config = PartialAppConfig::default();
        config.apply_set_values(&["esmfold.retries=0".into()]).unwrap();
        assert!(config.esmfold_config().is_err());
    }
}
