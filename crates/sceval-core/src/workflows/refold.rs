use crate::core::comparison::{ComparisonError, rmsd, similarity_score};
use crate::core::comparison::superposition::aligned_rmsd;
use crate::core::io::pdb::{PdbFile, PdbMetadata};
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use crate::core::selection::{
    AtomPart, CoordinateFrame, SelectionError, extract_from, whole_structure,
};
use crate::engine::config::{ConfigError, FoldingMethod, RefoldConfig};
use crate::engine::error::EngineError;
use crate::engine::metrics::{JOINT_TABLE_NAME, SampleMetrics, write_joint_table, write_metrics_table};
use crate::engine::motif::{
    MOTIF_INFO_FILE, MotifCsv, MotifInfoEntry, ResolvedMotif, lookup_spec, write_motif_info,
};
use crate::engine::naming::{CandidateName, resolve_candidate};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tools::{DesignRequest, DesignedSequence, Prediction, SequenceDesigner, StructurePredictor};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const SELF_CONSISTENCY_DIR: &str = "self_consistency";

/// One designed backbone, resolved against its reference structure.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub name: CandidateName,
    pub backbone_path: PathBuf,
    pub reference_path: PathBuf,
    pub motif: ResolvedMotif,
    /// Representative-atom motif RMSD between reference and raw design.
    pub backbone_motif_rmsd: f64,
}

impl CandidateRecord {
    pub fn id(&self) -> String {
        self.name.candidate_id()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefoldSummary {
    /// Candidates refolded during this run.
    pub processed: Vec<String>,
    /// Candidates whose working directory already existed.
    pub existing: Vec<String>,
    /// Files skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    pub motif_info_path: PathBuf,
}

enum Outcome {
    Refolded,
    AlreadyProcessed,
}

/// Loaded inputs shared by every candidate of one run.
struct RunContext<'a> {
    config: &'a RefoldConfig,
    motif_csv: Option<MotifCsv>,
}

#[instrument(skip_all, name = "refold_workflow")]
pub fn run(
    config: &RefoldConfig,
    designer: &dyn SequenceDesigner,
    predictors: &mut [Box<dyn StructurePredictor>],
    reporter: &ProgressReporter,
) -> Result<RefoldSummary, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        backbones = %config.backbone_dir.display(),
        output = %config.output_dir.display(),
        "Starting refolding workflow."
    );
    check_predictors(config, predictors)?;
    fs::create_dir_all(&config.output_dir).map_err(EngineError::io(&config.output_dir))?;

    let motif_csv = config
        .motif_csv
        .as_deref()
        .map(MotifCsv::read_path)
        .transpose()?;
    if let Some(csv) = &motif_csv {
        info!(rows = csv.len(), "Loaded motif CSV.");
    }
    let backbones = list_backbones(&config.backbone_dir)?;
    let context = RunContext { config, motif_csv };
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Per-candidate self-consistency ===
    reporter.report(Progress::PhaseStart { name: "Refolding" });
    reporter.report(Progress::TaskStart {
        total_steps: backbones.len() as u64,
    });

    let mut summary = RefoldSummary::default();
    let mut motif_info: BTreeMap<String, MotifInfoEntry> = BTreeMap::new();
    for backbone in &backbones {
        let result = process_backbone(
            &context,
            backbone,
            designer,
            predictors,
            &mut motif_info,
            reporter,
        );
        match result {
            Ok(Some((id, Outcome::Refolded))) => {
                info!(candidate = %id, "Candidate refolded.");
                summary.processed.push(id);
            }
            Ok(Some((id, Outcome::AlreadyProcessed))) => summary.existing.push(id),
            Ok(None) => summary
                .skipped
                .push((backbone.clone(), "beyond max_backbones".to_string())),
            Err(e) if e.is_candidate_local() => {
                warn!(file = %backbone.display(), error = %e, "Skipping candidate.");
                reporter.report(Progress::CandidateSkipped {
                    name: backbone.display().to_string(),
                    reason: e.to_string(),
                });
                summary.skipped.push((backbone.clone(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Run-level motif information ===
    let motif_info_path = config.output_dir.join(MOTIF_INFO_FILE);
    write_motif_info(&motif_info_path, &motif_info)?;
    info!(path = %motif_info_path.display(), "Motif information saved.");

    info!(
        processed = summary.processed.len(),
        existing = summary.existing.len(),
        skipped = summary.skipped.len(),
        "Refolding workflow complete."
    );
    summary.motif_info_path = motif_info_path;
    Ok(summary)
}

fn process_backbone(
    context: &RunContext<'_>,
    backbone: &Path,
    designer: &dyn SequenceDesigner,
    predictors: &mut [Box<dyn StructurePredictor>],
    motif_info: &mut BTreeMap<String, MotifInfoEntry>,
    reporter: &ProgressReporter,
) -> Result<Option<(String, Outcome)>, EngineError> {
    let Some(record) = prepare_candidate(context, backbone, reporter)? else {
        return Ok(None);
    };
    motif_info.insert(record.id(), record.motif.info_entry());
    let outcome = refold_candidate(context, &record, designer, predictors)?;
    Ok(Some((record.id(), outcome)))
}

fn check_predictors(
    config: &RefoldConfig,
    predictors: &[Box<dyn StructurePredictor>],
) -> Result<(), ConfigError> {
    for method in config.prediction.methods() {
        if !predictors.iter().any(|p| p.method() == *method) {
            return Err(ConfigError::InvalidValue {
                parameter: "prediction_method",
                reason: format!("no {method} predictor was provided"),
            });
        }
    }
    Ok(())
}

/// `.pdb` files of `dir` in directory-listing order.
fn list_backbones(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let entries = fs::read_dir(dir).map_err(EngineError::io(dir))?;
    let mut backbones = Vec::new();
    for entry in entries {
        let path = entry.map_err(EngineError::io(dir))?.path();
        let is_pdb = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdb"));
        if is_pdb && path.is_file() {
            backbones.push(path);
        }
    }
    Ok(backbones)
}

fn read_pdb(path: &Path) -> Result<(Structure, PdbMetadata), SelectionError> {
    PdbFile::read_from_path(path).map_err(|source| SelectionError::Structure {
        path: path.to_path_buf(),
        source,
    })
}

fn reference_structure_path(config: &RefoldConfig, name: &CandidateName) -> PathBuf {
    if config.reference_pdb.is_dir() {
        config
            .reference_pdb
            .join(format!("{}.pdb", name.reference_name))
    } else {
        config.reference_pdb.clone()
    }
}

/// RMSD over a motif selection; a pure scaffold has no motif to deviate.
fn motif_rmsd(a: &CoordinateFrame, b: &CoordinateFrame) -> Result<f64, ComparisonError> {
    if a.is_empty() && b.is_empty() {
        Ok(0.0)
    } else {
        rmsd(a, b)
    }
}

/// Resolves name and motif of one backbone. `None` means the backbone is
/// beyond the configured per-case cutoff.
fn prepare_candidate(
    context: &RunContext<'_>,
    backbone: &Path,
    reporter: &ProgressReporter,
) -> Result<Option<CandidateRecord>, EngineError> {
    let config = context.config;
    let (backbone_path, name) = resolve_candidate(backbone, &config.benchmark_names)?;
    if let Some(max) = config.max_backbones {
        if name.sample_num >= max {
            info!(
                candidate = %name.candidate_id(),
                max_backbones = max,
                "Skipping sample beyond max_backbones."
            );
            return Ok(None);
        }
    }
    reporter.report(Progress::CandidateStart {
        name: name.candidate_id(),
    });

    let (design, metadata) = read_pdb(&backbone_path)?;
    let spec = lookup_spec(context.motif_csv.as_ref(), &name, &metadata)?;
    let motif = ResolvedMotif::resolve(spec, config.design_chain)?;
    if !motif.redesign.is_empty() {
        info!(
            candidate = %name.candidate_id(),
            positions = motif.redesign.residues().len(),
            "Motif positions allowed to be redesigned."
        );
    }

    let reference_path = reference_structure_path(config, &name);
    let (reference, _) = read_pdb(&reference_path)?;
    let reference_source = reference_path.display().to_string();
    let design_source = backbone_path.display().to_string();
    let reference_ca = extract_from(
        &motif.reference_contig,
        &reference,
        AtomPart::Representative,
        &reference_source,
    )?;
    let design_ca = extract_from(
        motif.design_motif(),
        &design,
        AtomPart::Representative,
        &design_source,
    )?;
    let backbone_motif_rmsd = motif_rmsd(&reference_ca, &design_ca)?;
    debug!(candidate = %name.candidate_id(), rmsd = backbone_motif_rmsd, "Backbone motif RMSD.");

    Ok(Some(CandidateRecord {
        name,
        backbone_path,
        reference_path,
        motif,
        backbone_motif_rmsd,
    }))
}

fn refold_candidate(
    context: &RunContext<'_>,
    record: &CandidateRecord,
    designer: &dyn SequenceDesigner,
    predictors: &mut [Box<dyn StructurePredictor>],
) -> Result<Outcome, EngineError> {
    let config = context.config;
    let candidate_dir = config.output_dir.join(record.id());
    if candidate_dir.exists() {
        warn!(
            candidate = %record.id(),
            dir = %candidate_dir.display(),
            "Candidate directory already exists; skipping."
        );
        return Ok(Outcome::AlreadyProcessed);
    }

    let (reference, _) = read_pdb(&record.reference_path)?;
    let reference_backbone = extract_from(
        &record.motif.reference_contig,
        &reference,
        AtomPart::Backbone,
        &record.reference_path.display().to_string(),
    )?;

    let file_name = record
        .backbone_path
        .file_name()
        .ok_or_else(|| EngineError::Internal(format!("backbone path {:?} has no file name", record.backbone_path)))?;
    let sc_dir = candidate_dir.join(SELF_CONSISTENCY_DIR);
    fs::create_dir_all(&sc_dir).map_err(EngineError::io(&sc_dir))?;
    let candidate_backbone = candidate_dir.join(file_name);
    fs::copy(&record.backbone_path, &candidate_backbone).map_err(EngineError::io(&candidate_backbone))?;
    let sc_backbone = sc_dir.join(file_name);
    fs::copy(&record.backbone_path, &sc_backbone).map_err(EngineError::io(&sc_backbone))?;
    info!(candidate = %record.id(), dir = %candidate_dir.display(), "Running self-consistency.");

    let (design, _) = read_pdb(&sc_backbone)?;
    let strategy = config
        .fixed_positions
        .resolve(record.name.lookup_keys().iter().map(String::as_str));
    let directive = (!record.motif.design_motif().is_empty())
        .then(|| strategy.directive(&record.motif.fixed));
    let ca_only = design.is_ca_only();
    if ca_only {
        info!(candidate = %record.id(), "Backbone is a CA-only trace.");
    }

    let sequences = designer.design(&DesignRequest {
        work_dir: &sc_dir,
        backbone_path: &sc_backbone,
        fixed_positions: directive.as_ref(),
        ca_only,
    })?;
    info!(candidate = %record.id(), count = sequences.len(), "Designed sequences.");

    let scorer = SampleScorer {
        record,
        design: &design,
        reference_backbone: &reference_backbone,
    };
    let mut tables: Vec<(FoldingMethod, Vec<SampleMetrics>)> = Vec::new();
    for predictor in predictors.iter_mut() {
        let method = predictor.method();
        if !config.prediction.uses(method) {
            continue;
        }
        let predictions = predictor.predict(&sc_dir, &sequences)?;
        let rows = predictions
            .iter()
            .map(|p| scorer.score(p, &sequences))
            .collect::<Result<Vec<_>, _>>()?;
        write_metrics_table(&sc_dir.join(method.table_name()), &rows)?;
        tables.push((method, rows));
    }

    if tables.len() > 1 {
        let joint: Vec<(FoldingMethod, &[SampleMetrics])> =
            tables.iter().map(|(m, rows)| (*m, rows.as_slice())).collect();
        write_joint_table(&sc_dir.join(JOINT_TABLE_NAME), &joint)?;
    }
    Ok(Outcome::Refolded)
}

/// Compares predictions of one candidate against its design and reference.
struct SampleScorer<'a> {
    record: &'a CandidateRecord,
    design: &'a Structure,
    reference_backbone: &'a CoordinateFrame,
}

impl SampleScorer<'_> {
    fn score(
        &self,
        prediction: &Prediction,
        sequences: &[DesignedSequence],
    ) -> Result<SampleMetrics, EngineError> {
        let designed = sequences
            .iter()
            .find(|s| s.sample_idx == prediction.sample_idx)
            .ok_or_else(|| {
                EngineError::Internal(format!(
                    "prediction for unknown sample {}",
                    prediction.sample_idx
                ))
            })?;
        let (predicted, _) = read_pdb(&prediction.structure_path)?;
        let predicted_source = prediction.structure_path.display().to_string();

        // Multi-chain designs separate chains with '/'.
        let sequence: String = designed.sequence.chars().filter(|c| *c != '/').collect();
        let design_ca = self.design.ca_positions();
        let predicted_ca = predicted.ca_positions();
        let global_rmsd = aligned_rmsd(&design_ca, &predicted_ca)?;
        let tm = similarity_score(&design_ca, &predicted_ca, &sequence, &sequence)?;

        let motif = &self.record.motif;
        let predicted_motif = extract_from(
            motif.design_motif(),
            &predicted,
            AtomPart::Backbone,
            &predicted_source,
        )?;
        let motif_rmsd_value = motif_rmsd(self.reference_backbone, &predicted_motif)?;

        let refold_motif_rmsd = if motif.design_motif().is_empty() {
            None
        } else {
            let mask = &motif.layout.motif_mask;
            let design_frame = whole_structure(self.design, AtomPart::Representative, "design").masked(mask);
            let predicted_frame =
                whole_structure(&predicted, AtomPart::Representative, &predicted_source).masked(mask);
            Some(rmsd(&design_frame, &predicted_frame)?)
        };

        Ok(SampleMetrics {
            sample_idx: prediction.sample_idx,
            header: designed.header.clone(),
            sequence: designed.sequence.clone(),
            mpnn_score: designed.score,
            rmsd: global_rmsd,
            motif_rmsd: motif_rmsd_value,
            backbone_motif_rmsd: self.record.backbone_motif_rmsd,
            refold_motif_rmsd,
            pae: prediction.pae,
            ptm: prediction.ptm,
            plddt: prediction.mean_plddt,
            length: sequence.chars().count(),
            tm_score: tm.score,
            sample_path: prediction.structure_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::builder::StructureBuilder;
    use crate::engine::config::{PredictionMethod, RefoldConfigBuilder};
    use crate::engine::metrics::ResultsTable;
    use crate::engine::tools::ToolError;
    use nalgebra::Point3;
    use std::sync::Mutex;

    const LENGTH: isize = 12;

    fn helix_structure(chain: char, first: isize, count: isize) -> Structure {
        let mut builder = StructureBuilder::new();
        let mut serial = 1;
        for i in 0..count {
            let t = (i as f64) * 100f64.to_radians();
            let base = Point3::new(2.3 * t.cos(), 2.3 * t.sin(), 1.5 * i as f64);
            for (k, name) in ["N", "CA", "C", "O"].iter().enumerate() {
                let offset = 0.4 * k as f64;
                let p = Point3::new(base.x + offset, base.y - offset, base.z + 0.2 * offset);
                builder.push_atom(chain, first + i, None, "ALA", Atom::new(serial, name, p));
                serial += 1;
            }
        }
        builder.build()
    }

    fn write_pdb(path: &Path, structure: &Structure, contig: Option<&str>) {
        let mut metadata = PdbMetadata::default();
        if let Some(contig) = contig {
            metadata.set_annotation("CONTIG", contig);
        }
        PdbFile::write_to_path(structure, &metadata, path).unwrap();
    }

    struct StubDesigner {
        calls: Mutex<Vec<PathBuf>>,
    }

    impl SequenceDesigner for StubDesigner {
        fn design(&self, request: &DesignRequest<'_>) -> Result<Vec<DesignedSequence>, ToolError> {
            self.calls.lock().unwrap().push(request.backbone_path.to_path_buf());
            Ok((1..=2)
                .map(|i| DesignedSequence {
                    sample_idx: i,
                    header: format!("T=0.1, sample={i}, score=1.0, global_score={i}.5"),
                    sequence: "A".repeat(LENGTH as usize),
                    score: i as f64 + 0.5,
                })
                .collect())
        }
    }

    /// Predicts the design itself, so every deviation is zero.
    struct EchoPredictor {
        design: PathBuf,
        method: FoldingMethod,
    }

    impl StructurePredictor for EchoPredictor {
        fn method(&self) -> FoldingMethod {
            self.method
        }

        fn predict(
            &mut self,
            work_dir: &Path,
            sequences: &[DesignedSequence],
        ) -> Result<Vec<Prediction>, ToolError> {
            let dir = work_dir.join(self.method.output_subdir());
            fs::create_dir_all(&dir).unwrap();
            Ok(sequences
                .iter()
                .map(|s| {
                    let path = dir.join(format!("sample_{}.pdb", s.sample_idx));
                    fs::copy(&self.design, &path).unwrap();
                    Prediction {
                        sample_idx: s.sample_idx,
                        structure_path: path,
                        mean_plddt: 90.0,
                        ptm: 0.8,
                        pae: 3.0,
                    }
                })
                .collect())
        }
    }

    struct FailingPredictor;

    impl StructurePredictor for FailingPredictor {
        fn method(&self) -> FoldingMethod {
            FoldingMethod::EsmFold
        }

        fn predict(&mut self, _: &Path, _: &[DesignedSequence]) -> Result<Vec<Prediction>, ToolError> {
            Err(ToolError::Exhausted {
                tool: "ESMFold".into(),
                attempts: 3,
                last_failure: "out of memory".into(),
            })
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        backbones: PathBuf,
        output: PathBuf,
        reference: PathBuf,
        design_copy: PathBuf,
    }

    /// Two backbones with a 4-residue motif; the reference numbers it 20-23.
    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let backbones = root.path().join("backbones");
        let output = root.path().join("out");
        fs::create_dir_all(&backbones).unwrap();

        let design = helix_structure('A', 1, LENGTH);
        for name in ["01_1ABC_0.pdb", "01_1ABC_1.pdb"] {
            write_pdb(&backbones.join(name), &design, Some("3-3/A20-23/5-5"));
        }
        let design_copy = root.path().join("design.pdb");
        write_pdb(&design_copy, &design, None);

        let reference = root.path().join("1ABC.pdb");
        write_pdb(&reference, &helix_structure('A', 17, LENGTH), None);
        Fixture {
            backbones,
            output,
            reference,
            design_copy,
            _root: root,
        }
    }

    fn config(f: &Fixture, prediction: PredictionMethod) -> RefoldConfig {
        RefoldConfigBuilder::new()
            .backbone_dir(f.backbones.clone())
            .output_dir(f.output.clone())
            .reference_pdb(f.reference.clone())
            .benchmark_names(vec!["1ABC".into()])
            .prediction(prediction)
            .build()
            .unwrap()
    }

    fn echo(f: &Fixture, method: FoldingMethod) -> Box<dyn StructurePredictor> {
        Box::new(EchoPredictor {
            design: f.design_copy.clone(),
            method,
        })
    }

    fn designer() -> StubDesigner {
        StubDesigner {
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn candidates_are_refolded_into_their_own_directories() {
        let f = fixture();
        let designer = designer();
        let mut predictors = vec![echo(&f, FoldingMethod::EsmFold)];
        let summary = run(
            &config(&f, PredictionMethod::EsmFold),
            &designer,
            &mut predictors,
            &ProgressReporter::new(),
        )
        .unwrap();

        let mut processed = summary.processed.clone();
        processed.sort();
        assert_eq!(processed, vec!["01_1ABC_0", "01_1ABC_1"]);
        assert!(f.output.join("01_1ABC_0/01_1ABC_0.pdb").exists());

        let sc = f.output.join("01_1ABC_1").join(SELF_CONSISTENCY_DIR);
        assert!(sc.join("01_1ABC_1.pdb").exists());
        let table = ResultsTable::read_path(&sc.join("esm_eval_results.csv")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "sample_idx"), Some("1"));
        assert_eq!(table.cell(0, "rmsd"), Some("0.000"));
        assert_eq!(table.cell(0, "motif_rmsd"), Some("0.000"));
        assert_eq!(table.cell(0, "backbone_motif_rmsd"), Some("0.000"));
        assert_eq!(table.cell(0, "refold_motif_rmsd"), Some("0.000"));
        assert_eq!(table.cell(0, "tm_score"), Some("1.000"));
        assert_eq!(table.cell(1, "mpnn_score"), Some("2.500"));
        assert_eq!(table.cell(1, "length"), Some("12"));

        let info = fs::read_to_string(&summary.motif_info_path).unwrap();
        assert!(info.contains("\"01_1ABC_0\""));
        assert!(info.contains("\"motif_idx\": [\n            4,"));
    }

    #[test]
    fn second_run_processes_nothing_twice() {
        let f = fixture();
        let config = config(&f, PredictionMethod::EsmFold);
        let designer = designer();
        let mut predictors = vec![echo(&f, FoldingMethod::EsmFold)];
        run(&config, &designer, &mut predictors, &ProgressReporter::new()).unwrap();
        let table_path = f.output.join("01_1ABC_0/self_consistency/esm_eval_results.csv");
        let before = fs::read_to_string(&table_path).unwrap();

        let again = run(&config, &designer, &mut predictors, &ProgressReporter::new()).unwrap();
        assert!(again.processed.is_empty());
        assert_eq!(again.existing.len(), 2);
        assert_eq!(designer.calls.lock().unwrap().len(), 2);
        assert_eq!(fs::read_to_string(&table_path).unwrap(), before);
    }

    #[test]
    fn max_backbones_skips_later_samples() {
        let f = fixture();
        let mut config = config(&f, PredictionMethod::EsmFold);
        config.max_backbones = Some(1);
        let mut predictors = vec![echo(&f, FoldingMethod::EsmFold)];
        let summary = run(&config, &designer(), &mut predictors, &ProgressReporter::new()).unwrap();
        assert_eq!(summary.processed, vec!["01_1ABC_0"]);
        assert_eq!(summary.skipped.len(), 1);
        assert!(!f.output.join("01_1ABC_1").exists());
    }

    #[test]
    fn both_methods_write_a_joint_table() {
        let f = fixture();
        let mut predictors = vec![
            echo(&f, FoldingMethod::EsmFold),
            echo(&f, FoldingMethod::AlphaFold2),
        ];
        run(
            &config(&f, PredictionMethod::Both),
            &designer(),
            &mut predictors,
            &ProgressReporter::new(),
        )
        .unwrap();
        let sc = f.output.join("01_1ABC_0/self_consistency");
        assert!(sc.join("af2_eval_results.csv").exists());
        let joint = ResultsTable::read_path(&sc.join(JOINT_TABLE_NAME)).unwrap();
        assert_eq!(joint.len(), 4);
        assert_eq!(joint.cell(3, "folding_method"), Some("AlphaFold2"));
    }

    #[test]
    fn candidate_local_problems_skip_only_that_file() {
        let f = fixture();
        fs::write(f.backbones.join("mystery.pdb"), "not a structure\n").unwrap();
        write_pdb(
            &f.backbones.join("01_1ABC_5.pdb"),
            &helix_structure('A', 1, LENGTH),
            Some("3-3/A90-93/5-5"),
        );
        let mut predictors = vec![echo(&f, FoldingMethod::EsmFold)];
        let summary = run(
            &config(&f, PredictionMethod::EsmFold),
            &designer(),
            &mut predictors,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(summary.processed.len(), 2);
        assert_eq!(summary.skipped.len(), 2);
        assert!(f.backbones.join("mystery.pdb").exists());
    }

    #[test]
    fn exhausted_tools_abort_the_run() {
        let f = fixture();
        let mut predictors: Vec<Box<dyn StructurePredictor>> = vec![Box::new(FailingPredictor)];
        let err = run(
            &config(&f, PredictionMethod::EsmFold),
            &designer(),
            &mut predictors,
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Tool { .. }));
    }

    #[test]
    fn missing_predictor_is_a_configuration_error() {
        let f = fixture();
        let mut predictors = vec![echo(&f, FoldingMethod::EsmFold)];
        let err = run(
            &config(&f, PredictionMethod::AlphaFold2),
            &designer(),
            &mut predictors,
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }
}
