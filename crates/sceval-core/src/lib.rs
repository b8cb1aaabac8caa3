//! # sceval Core Library
//!
//! A self-consistency evaluation engine for motif-scaffolding protein designs: every
//! designed backbone is resequenced by a design tool, refolded by a structure predictor,
//! and compared back to itself and to the motif it was meant to carry.
//!
//! ## Architectural Philosophy
//!
//! The library keeps a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data and algorithms: the contig language,
//!   the structure model and file formats, coordinate selection, and structural
//!   comparison (Kabsch RMSD, TM-score).
//!
//! - **[`engine`]: The Machinery.** Configuration, the error taxonomy, progress reporting,
//!   and the adapters that drive external tools under a bounded retry policy.
//!
//! - **[`workflows`]: The Public API.** [`workflows::refold`] runs the sampling loop over a
//!   directory of backbones; [`workflows::evaluate`] aggregates the per-sample tables into
//!   designability, diversity and novelty summaries.

pub mod core;
pub mod engine;
pub mod workflows;
