use super::{evaluate, refold};
use crate::cli::RunArgs;
use crate::config::PartialAppConfig;
use crate::error::Result;
use std::time::Instant;
use tracing::info;

/// Refolds, then evaluates the refolding output directory.
///
/// Both stages are configured before either starts, so a missing Foldseek
/// database is reported before any tool runs.
pub async fn run(args: RunArgs, threads: Option<usize>) -> Result<()> {
    let config = PartialAppConfig::load(&args.common)?;
    info!("Merging configuration from file and CLI arguments...");
    let refold_settings = config.refold_settings(&args.common, &args.refold)?;
    let evaluation_settings = config.evaluation_settings(
        &args.common,
        Some(refold_settings.core.output_dir.clone()),
        &args.evaluation,
        threads,
    )?;

    let start = Instant::now();
    super::blocking(|| refold::execute(&refold_settings))?;
    let refold_elapsed = start.elapsed();
    info!("Refolding took {:.2?}.", refold_elapsed);

    let start = Instant::now();
    super::blocking(|| evaluate::execute(&evaluation_settings))?;
    let evaluate_elapsed = start.elapsed();
    info!("Evaluation took {:.2?}.", evaluate_elapsed);

    println!(
        "Refolding took {:.2?}; evaluation took {:.2?}.",
        refold_elapsed, evaluate_elapsed
    );
    Ok(())
}
