//! ProteinMPNN adapter.
//!
//! Design runs in three steps: chains of the backbone are parsed into JSONL,
//! fixed positions are written as a second JSONL (only when a motif exists),
//! and the design script samples sequences into `seqs/<backbone>.fa`.
//!
//! Design headers are `key=value` pairs separated by `, `, e.g.
//! `T=0.1, sample=3, score=0.9871, global_score=1.0146, seq_recovery=0.4545`.
//! They are parsed once, here, into [`DesignHeader`].

use super::{
    DesignRequest, DesignedSequence, Invocation, RetryPolicy, SequenceDesigner, ToolError,
    require_output,
};
use crate::core::contig::MotifIndexSet;
use crate::core::io::fasta::{FastaRecord, read_fasta_path, write_fasta_path};
use crate::engine::config::{ConfigError, FixedPositionStrategy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const TOOL: &str = "ProteinMPNN";
const DESIGN_HEADER_PREFIX: &str = "T=";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderParseError {
    #[error("Header field '{0}' is not a key=value pair")]
    MalformedField(String),

    #[error("Header is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("Header key '{key}' has invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Typed view of a design record header.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignHeader {
    pub temperature: f64,
    pub sample: usize,
    pub global_score: f64,
    pub fields: BTreeMap<String, String>,
}

fn required<'a>(
    fields: &'a BTreeMap<String, String>,
    key: &'static str,
) -> Result<&'a str, HeaderParseError> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or(HeaderParseError::MissingKey(key))
}

fn number<T: std::str::FromStr>(
    fields: &BTreeMap<String, String>,
    key: &'static str,
) -> Result<T, HeaderParseError> {
    let raw = required(fields, key)?;
    raw.parse().map_err(|_| HeaderParseError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

impl DesignHeader {
    pub fn parse(header: &str) -> Result<Self, HeaderParseError> {
        let mut fields = BTreeMap::new();
        for field in header.split(", ").map(str::trim).filter(|f| !f.is_empty()) {
            let (key, value) = field
                .split_once('=')
                .ok_or_else(|| HeaderParseError::MalformedField(field.to_string()))?;
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(Self {
            temperature: number(&fields, "T")?,
            sample: number(&fields, "sample")?,
            global_score: number(&fields, "global_score")?,
            fields,
        })
    }
}

/// Turns the raw FASTA records into scored designs.
///
/// The native sequence (first record, no `T=` prefix) is dropped. Records with
/// malformed headers are skipped with a warning.
pub fn designed_sequences(records: &[FastaRecord]) -> Vec<DesignedSequence> {
    records
        .iter()
        .filter(|r| r.header.starts_with(DESIGN_HEADER_PREFIX))
        .filter_map(|r| match DesignHeader::parse(&r.header) {
            Ok(parsed) => Some(DesignedSequence {
                sample_idx: parsed.sample,
                header: r.header.clone(),
                sequence: r.sequence.clone(),
                score: parsed.global_score,
            }),
            Err(e) => {
                warn!(header = %r.header, error = %e, "Skipping design with malformed header.");
                None
            }
        })
        .collect()
}

/// The `n` best (lowest-scoring) designs, ties kept in input order.
pub fn top_by_score(sequences: &[DesignedSequence], n: usize) -> Vec<DesignedSequence> {
    let mut sorted = sequences.to_vec();
    sorted.sort_by(|a, b| a.score.total_cmp(&b.score));
    sorted.truncate(n);
    sorted
}

/// Per-chain fixed positions in the tool's own addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPositionDirective {
    pub chains: Vec<char>,
    /// One list per entry of `chains`.
    pub positions: Vec<Vec<isize>>,
}

impl FixedPositionDirective {
    /// Value for `--chain_list`, e.g. `A B`.
    pub fn chain_list(&self) -> String {
        self.chains
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value for `--position_list`, e.g. `1 2 3, 7 8`.
    pub fn position_list(&self) -> String {
        self.positions
            .iter()
            .map(|chain| {
                chain
                    .iter()
                    .map(isize::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FixedPositionStrategy {
    /// Builds the fixed-position directive for `fixed` (design frame).
    pub fn directive(&self, fixed: &MotifIndexSet) -> FixedPositionDirective {
        let by_chain = fixed.partition_by_chain();
        match self {
            FixedPositionStrategy::SingleChain { chain } => FixedPositionDirective {
                chains: vec![*chain],
                positions: vec![by_chain.get(chain).cloned().unwrap_or_default()],
            },
            FixedPositionStrategy::Complex {
                design_chain,
                partner_chain,
                partner_positions,
            } => {
                let design = by_chain
                    .get(design_chain)
                    .map(|numbers| {
                        numbers
                            .iter()
                            .copied()
                            .filter(|n| !partner_positions.contains(n))
                            .collect()
                    })
                    .unwrap_or_default();
                FixedPositionDirective {
                    chains: vec![*design_chain, *partner_chain],
                    positions: vec![design, partner_positions.clone()],
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MpnnConfig {
    /// ProteinMPNN checkout containing `protein_mpnn_run.py` and `helper_scripts/`.
    pub root_dir: PathBuf,
    pub python: PathBuf,
    pub seq_per_sample: usize,
    pub batch_size: usize,
    pub sampling_temp: f64,
    pub seed: u64,
    pub device: Option<String>,
    pub hide_accelerators: bool,
    pub sort_by_score: bool,
    pub retry: RetryPolicy,
}

impl Default for MpnnConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("ProteinMPNN"),
            python: PathBuf::from("python"),
            seq_per_sample: 8,
            batch_size: 1,
            sampling_temp: 0.1,
            seed: 33,
            device: None,
            hide_accelerators: true,
            sort_by_score: false,
            retry: RetryPolicy::new(5),
        }
    }
}

impl MpnnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "mpnn_batch_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.seq_per_sample < self.batch_size {
            return Err(ConfigError::InvalidValue {
                parameter: "seq_per_sample",
                reason: format!(
                    "{} sequences per sample is fewer than the batch size {}",
                    self.seq_per_sample, self.batch_size
                ),
            });
        }
        Ok(())
    }
}

pub struct ProteinMpnn {
    config: MpnnConfig,
}

impl ProteinMpnn {
    pub fn new(config: MpnnConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn helper(&self, script: &str) -> Invocation {
        Invocation::new(&self.config.python)
            .arg(self.config.root_dir.join("helper_scripts").join(script))
    }

    fn design_invocation(
        &self,
        work_dir: &Path,
        parsed: &Path,
        fixed: Option<(&Path, &Path)>,
        ca_only: bool,
    ) -> Invocation {
        let c = &self.config;
        let mut inv = Invocation::new(&c.python)
            .arg(c.root_dir.join("protein_mpnn_run.py"))
            .arg("--out_folder")
            .arg(work_dir)
            .arg("--jsonl_path")
            .arg(parsed)
            .arg("--num_seq_per_target")
            .arg(c.seq_per_sample.to_string())
            .arg("--sampling_temp")
            .arg(c.sampling_temp.to_string())
            .arg("--seed")
            .arg(c.seed.to_string())
            .arg("--batch_size")
            .arg(c.batch_size.to_string())
            .log_to(work_dir.join("mpnn.log"));
        if let Some(device) = &c.device {
            inv = inv.arg("--device").arg(device);
        }
        if ca_only {
            inv = inv.arg("--ca_only");
        }
        if let Some((assigned, fixed)) = fixed {
            inv = inv
                .arg("--chain_id_jsonl")
                .arg(assigned)
                .arg("--fixed_positions_jsonl")
                .arg(fixed);
        }
        if c.hide_accelerators {
            inv = inv.hide_accelerators();
        }
        inv
    }
}

impl SequenceDesigner for ProteinMpnn {
    fn design(&self, request: &DesignRequest<'_>) -> Result<Vec<DesignedSequence>, ToolError> {
        let work_dir = request.work_dir;
        let once = RetryPolicy::once().with_timeout(self.config.retry.timeout);

        let parsed = work_dir.join("parsed_pdbs.jsonl");
        self.helper("parse_multiple_chains.py")
            .arg(format!("--input_path={}", work_dir.display()))
            .arg(format!("--output_path={}", parsed.display()))
            .run(TOOL, &once)?;
        require_output(TOOL, &parsed)?;

        let fixed_paths = match request.fixed_positions {
            Some(directive) => {
                let assigned = work_dir.join("assigned_pdbs.jsonl");
                let fixed = work_dir.join("fixed_pdbs.jsonl");
                self.helper("assign_fixed_chains.py")
                    .arg("--input_path")
                    .arg(&parsed)
                    .arg("--output_path")
                    .arg(&assigned)
                    .arg("--chain_list")
                    .arg(directive.chain_list())
                    .run(TOOL, &once)?;
                self.helper("make_fixed_positions_dict.py")
                    .arg("--input_path")
                    .arg(&parsed)
                    .arg("--output_path")
                    .arg(&fixed)
                    .arg("--chain_list")
                    .arg(directive.chain_list())
                    .arg("--position_list")
                    .arg(directive.position_list())
                    .run(TOOL, &once)?;
                require_output(TOOL, &fixed)?;
                Some((assigned, fixed))
            }
            None => None,
        };

        if request.ca_only {
            info!(backbone = %request.backbone_path.display(), "Running the CA-only model.");
        }
        self.design_invocation(
            work_dir,
            &parsed,
            fixed_paths
                .as_ref()
                .map(|(a, f)| (a.as_path(), f.as_path())),
            request.ca_only,
        )
        .run(TOOL, &self.config.retry)?;

        let stem = request
            .backbone_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fasta_path = work_dir.join("seqs").join(format!("{stem}.fa"));
        require_output(TOOL, &fasta_path)?;

        let invalid = |path: &Path, reason: String| ToolError::InvalidOutput {
            tool: TOOL.to_string(),
            path: path.to_path_buf(),
            reason,
        };
        let records =
            read_fasta_path(&fasta_path).map_err(|e| invalid(&fasta_path, e.to_string()))?;
        let designs = designed_sequences(&records);

        let (selected, output) = if self.config.sort_by_score {
            let top = top_by_score(&designs, self.config.seq_per_sample);
            let path = work_dir.join("seqs").join(format!("top_score_{stem}.fa"));
            (top, path)
        } else {
            (designs, fasta_path.clone())
        };
        let out_records: Vec<_> = selected
            .iter()
            .map(|d| FastaRecord::new(d.header.clone(), d.sequence.clone()))
            .collect();
        write_fasta_path(&out_records, &output).map_err(|e| invalid(&output, e.to_string()))?;
        info!(count = selected.len(), fasta = %output.display(), "Designed sequences ready for refolding.");

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contig::ResidueRef;

    const NATIVE: &str = "1bcf, score=1.6, global_score=1.7, fixed_chains=[], designed_chains=['A'], model_name=v_48_020, git_hash=abc, seed=33";

    fn record(header: &str, seq: &str) -> FastaRecord {
        FastaRecord::new(header, seq)
    }

    #[test]
    fn header_fields_are_parsed_by_key() {
        let h = DesignHeader::parse(
            "T=0.1, sample=3, score=0.9871, global_score=1.0146, seq_recovery=0.4545",
        )
        .unwrap();
        assert_eq!(h.sample, 3);
        assert_eq!(h.temperature, 0.1);
        assert_eq!(h.global_score, 1.0146);
        assert_eq!(h.fields["seq_recovery"], "0.4545");
    }

    #[test]
    fn malformed_headers_are_errors_not_panics() {
        assert_eq!(
            DesignHeader::parse("T=0.1, sample=2"),
            Err(HeaderParseError::MissingKey("global_score"))
        );
        assert_eq!(
            DesignHeader::parse("T=0.1, sample=two, global_score=1.0"),
            Err(HeaderParseError::InvalidValue {
                key: "sample",
                value: "two".into()
            })
        );
        assert!(matches!(
            DesignHeader::parse("T=0.1, oops"),
            Err(HeaderParseError::MalformedField(_))
        ));
    }

    #[test]
    fn native_and_malformed_records_are_dropped() {
        let records = vec![
            record(NATIVE, "MKV"),
            record(
                "T=0.1, sample=1, score=1.0, global_score=1.2, seq_recovery=0.3",
                "AAA",
            ),
            record("T=0.1, sample=2, score=1.0", "CCC"),
            record(
                "T=0.1, sample=3, score=0.8, global_score=0.9, seq_recovery=0.3",
                "DDD",
            ),
        ];
        let designs = designed_sequences(&records);
        assert_eq!(designs.len(), 2);
        assert_eq!(designs[0].sample_idx, 1);
        assert_eq!(designs[1].sequence, "DDD");
        assert_eq!(designs[1].score, 0.9);
    }

    #[test]
    fn top_by_score_keeps_lowest_scores() {
        let mk = |idx, score| DesignedSequence {
            sample_idx: idx,
            header: String::new(),
            sequence: String::new(),
            score,
        };
        let top = top_by_score(&[mk(1, 1.5), mk(2, 0.7), mk(3, 1.1), mk(4, 0.9)], 2);
        let ids: Vec<_> = top.iter().map(|d| d.sample_idx).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn single_chain_directive_lists_fixed_positions() {
        let fixed = MotifIndexSet::on_chain('A', &[32, 33, 34, 54, 56]);
        let directive = FixedPositionStrategy::SingleChain { chain: 'A' }.directive(&fixed);
        assert_eq!(directive.chain_list(), "A");
        assert_eq!(directive.position_list(), "32 33 34 54 56");
    }

    #[test]
    fn complex_directive_splits_partner_positions() {
        let fixed = MotifIndexSet::new(vec![
            ResidueRef::new('A', 10),
            ResidueRef::new('A', 11),
            ResidueRef::new('A', 12),
        ]);
        let strategy = FixedPositionStrategy::Complex {
            design_chain: 'A',
            partner_chain: 'B',
            partner_positions: vec![11, 40],
        };
        let directive = strategy.directive(&fixed);
        assert_eq!(directive.chain_list(), "A B");
        assert_eq!(directive.position_list(), "10 12, 11 40");
    }

    #[test]
    fn batch_size_larger_than_samples_is_rejected() {
        let config = MpnnConfig {
            seq_per_sample: 2,
            batch_size: 4,
            ..MpnnConfig::default()
        };
        assert!(ProteinMpnn::new(config).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn design_run_wires_scripts_and_sorts_by_score() {
        use std::fs;

        let root = tempfile::tempdir().unwrap();
        let helpers = root.path().join("helper_scripts");
        fs::create_dir_all(&helpers).unwrap();
        let touch_eq = r#"for a in "$@"; do case "$a" in --output_path=*) : > "${a#--output_path=}";; esac; done"#;
        let touch_next = r#"while [ $# -gt 0 ]; do if [ "$1" = --output_path ]; then : > "$2"; fi; shift; done"#;
        fs::write(helpers.join("parse_multiple_chains.py"), touch_eq).unwrap();
        fs::write(helpers.join("assign_fixed_chains.py"), touch_next).unwrap();
        fs::write(helpers.join("make_fixed_positions_dict.py"), touch_next).unwrap();
        let run = r#"
out=""; fixed=""
while [ $# -gt 0 ]; do
  case "$1" in
    --out_folder) out="$2";;
    --fixed_positions_jsonl) fixed="$2";;
  esac
  shift
done
[ -n "$fixed" ] || exit 1
[ -z "$CUDA_VISIBLE_DEVICES" ] || exit 1
mkdir -p "$out/seqs"
cat > "$out/seqs/backbone.fa" <<FASTA
>backbone, score=1.6, global_score=1.7, seed=33
MKVL
>T=0.1, sample=1, score=1.0, global_score=1.30, seq_recovery=0.3
AAAA
>T=0.1, sample=2, score=1.0, global_score=0.80, seq_recovery=0.3
CCCC
>T=0.1, sample=3, score=1.0, global_score=1.10, seq_recovery=0.3
DDDD
FASTA
"#;
        fs::write(root.path().join("protein_mpnn_run.py"), run).unwrap();

        let work = tempfile::tempdir().unwrap();
        let backbone = work.path().join("backbone.pdb");
        fs::write(&backbone, "END\n").unwrap();

        let mpnn = ProteinMpnn::new(MpnnConfig {
            root_dir: root.path().to_path_buf(),
            python: "sh".into(),
            seq_per_sample: 2,
            sort_by_score: true,
            ..MpnnConfig::default()
        })
        .unwrap();
        let fixed = MotifIndexSet::on_chain('A', &[1, 2]);
        let directive = FixedPositionStrategy::default().directive(&fixed);
        let designs = mpnn
            .design(&DesignRequest {
                work_dir: work.path(),
                backbone_path: &backbone,
                fixed_positions: Some(&directive),
                ca_only: false,
            })
            .unwrap();

        let ids: Vec<_> = designs.iter().map(|d| d.sample_idx).collect();
        assert_eq!(ids, vec![2, 3]);
        let top = read_fasta_path(work.path().join("seqs/top_score_backbone.fa")).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].sequence, "CCCC");
    }
}
