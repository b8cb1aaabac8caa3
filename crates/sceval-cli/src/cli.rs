use clap::{Args, Parser, Subcommand};
use sceval::engine::config::PredictionMethod;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Scaffold-Lab Contributors",
    version,
    about = "sceval - self-consistency evaluation of motif-scaffolding protein backbone designs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation (novelty searches).
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resequence and refold every backbone in a directory, scoring each sample.
    Refold(RefoldArgs),
    /// Aggregate refolding results into designability, diversity and novelty.
    Evaluate(EvaluateArgs),
    /// Refold, then evaluate the same output directory.
    Run(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Structure prediction back end: esmfold, alphafold2 or both.
    #[arg(short = 'm', long, value_name = "METHOD")]
    pub prediction_method: Option<PredictionMethod>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S mpnn.seq-per-sample=4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Overrides for the refolding stage.
#[derive(Args, Debug, Clone, Default)]
pub struct RefoldOverrides {
    /// Directory of designed backbone PDB files.
    #[arg(short = 'i', long, value_name = "DIR")]
    pub backbone_dir: Option<PathBuf>,

    /// Directory receiving one working directory per candidate.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Reference PDB file, or a directory of `<reference>.pdb` files.
    #[arg(short = 'r', long, value_name = "PATH")]
    pub reference_pdb: Option<PathBuf>,

    /// Motif table with contig and redesign information per backbone.
    #[arg(long, value_name = "PATH")]
    pub motif_csv: Option<PathBuf>,

    /// Only refold backbones whose sample number is below this bound.
    #[arg(long, value_name = "INT")]
    pub max_backbones: Option<usize>,

    /// Override the number of sequences designed per backbone.
    #[arg(short = 'n', long, value_name = "INT")]
    pub seq_per_sample: Option<usize>,
}

/// Overrides for the evaluation stage.
#[derive(Args, Debug, Clone, Default)]
pub struct EvaluationOverrides {
    /// Foldseek database searched for novelty.
    #[arg(long, value_name = "PATH")]
    pub foldseek_database: Option<PathBuf>,

    /// Helper structure included in clustering but excluded from diversity.
    #[arg(long, value_name = "PATH")]
    pub assist_protein: Option<PathBuf>,
}

/// Arguments for the `refold` subcommand.
#[derive(Args, Debug)]
pub struct RefoldArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub refold: RefoldOverrides,
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Refolding output directory to evaluate.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub result_dir: Option<PathBuf>,

    #[command(flatten)]
    pub evaluation: EvaluationOverrides,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub refold: RefoldOverrides,

    #[command(flatten)]
    pub evaluation: EvaluationOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_refold_and_evaluation_flags_together() {
        let cli = Cli::parse_from([
            "sceval",
            "-vv",
            "run",
            "-i",
            "backbones",
            "-o",
            "out",
            "-r",
            "ref.pdb",
            "-m",
            "both",
            "--foldseek-database",
            "db/pdb",
            "-S",
            "mpnn.seed=7",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.refold.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.common.prediction_method, Some(PredictionMethod::Both));
        assert_eq!(args.evaluation.foldseek_database, Some(PathBuf::from("db/pdb")));
        assert_eq!(args.common.set_values, vec!["mpnn.seed=7"]);
    }

    #[test]
    fn unknown_prediction_method_is_rejected() {
        let parsed = Cli::try_parse_from(["sceval", "refold", "-m", "rosetta"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["sceval", "-q", "-v", "evaluate"]).is_err());
    }
}
