use crate::cli::EvaluateArgs;
use crate::config::{EvaluationSettings, PartialAppConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use sceval::engine::progress::ProgressReporter;
use sceval::engine::tools::foldseek::Foldseek;
use sceval::workflows::{
    self,
    evaluate::{EvaluationSummary, render_summary},
};
use tracing::info;

pub async fn run(args: EvaluateArgs, threads: Option<usize>) -> Result<()> {
    let config = PartialAppConfig::load(&args.common)?;
    info!("Merging configuration from file and CLI arguments...");
    let settings =
        config.evaluation_settings(&args.common, args.result_dir, &args.evaluation, threads)?;
    super::blocking(|| execute(&settings))?;
    Ok(())
}

/// Runs the evaluation workflow with Foldseek as both clusterer and searcher.
pub fn execute(settings: &EvaluationSettings) -> Result<EvaluationSummary> {
    let foldseek = Foldseek::new(settings.foldseek.clone());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Evaluating results in {}...",
        settings.core.result_dir.display()
    );
    info!("Invoking the core evaluation workflow...");
    let summary = workflows::evaluate::run(&settings.core, &foldseek, &foldseek, &reporter)?;

    println!("{}", render_summary(&summary));
    Ok(summary)
}
