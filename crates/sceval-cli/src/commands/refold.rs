use crate::cli::RefoldArgs;
use crate::config::{PartialAppConfig, RefoldSettings};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use sceval::engine::config::FoldingMethod;
use sceval::engine::error::EngineError;
use sceval::engine::progress::ProgressReporter;
use sceval::engine::tools::StructurePredictor;
use sceval::engine::tools::colabfold::ColabFold;
use sceval::engine::tools::esmfold::EsmFoldWorker;
use sceval::engine::tools::mpnn::ProteinMpnn;
use sceval::workflows::{self, refold::RefoldSummary};
use tracing::{debug, info, warn};

pub async fn run(args: RefoldArgs) -> Result<()> {
    let config = PartialAppConfig::load(&args.common)?;
    info!("Merging configuration from file and CLI arguments...");
    let settings = config.refold_settings(&args.common, &args.refold)?;
    super::blocking(|| execute(&settings))?;
    Ok(())
}

fn build_predictors(settings: &RefoldSettings) -> Result<Vec<Box<dyn StructurePredictor>>> {
    settings
        .core
        .prediction
        .methods()
        .iter()
        .map(|method| -> Result<Box<dyn StructurePredictor>> {
            match method {
                FoldingMethod::EsmFold => {
                    info!("Starting the ESMFold worker...");
                    let worker = EsmFoldWorker::spawn(settings.esmfold.clone())
                        .map_err(EngineError::from)?;
                    Ok(Box::new(worker))
                }
                FoldingMethod::AlphaFold2 => Ok(Box::new(ColabFold::new(settings.colabfold.clone()))),
            }
        })
        .collect()
}

/// Runs the refolding workflow with the real tool adapters. Blocks the calling
/// thread; async callers go through [`super::blocking`].
pub fn execute(settings: &RefoldSettings) -> Result<RefoldSummary> {
    let designer =
        ProteinMpnn::new(settings.mpnn.clone()).map_err(|e| CliError::Config(e.to_string()))?;
    let mut predictors = build_predictors(settings)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Refolding backbones from {}...",
        settings.core.backbone_dir.display()
    );
    info!("Invoking the core refolding workflow...");
    let summary = workflows::refold::run(&settings.core, &designer, &mut predictors, &reporter)?;

    info!(
        "Refolding finished: {} processed, {} already present, {} skipped.",
        summary.processed.len(),
        summary.existing.len(),
        summary.skipped.len()
    );
    debug!(
        "{} candidate(s) reported skipped through progress events.",
        progress_handler.skipped()
    );
    for (path, reason) in &summary.skipped {
        warn!("Skipped {:?}: {}", path, reason);
    }
    println!(
        "✓ Refolded {} backbone(s); {} already present, {} skipped. Motif info: {}",
        summary.processed.len(),
        summary.existing.len(),
        summary.skipped.len(),
        summary.motif_info_path.display()
    );
    Ok(summary)
}
