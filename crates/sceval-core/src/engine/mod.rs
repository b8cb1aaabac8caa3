//! # Engine Module
//!
//! This module holds the stateful machinery behind the two evaluation workflows:
//! configuration, external tool adapters, motif metadata resolution and the
//! per-sample metric tables.
//!
//! ## Overview
//!
//! Everything in [`crate::core`] is pure. The engine is where files are renamed,
//! working directories created and external programs spawned. It is organized so
//! that the workflows only wire these pieces together.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed run settings, success thresholds and the
//!   per-case fixed-position strategy table
//! - **Error Handling** ([`error`]) - The engine error taxonomy and its per-candidate
//!   versus fatal classification
//! - **Naming** ([`naming`]) - Backbone filename conventions and the benchmark name set
//! - **Motif Metadata** ([`motif`]) - Contig, motif index and redesign resolution for
//!   one candidate, plus the run-level `motif_info.json`
//! - **Metrics** ([`metrics`]) - Per-sample result rows and CSV tables
//! - **External Tools** ([`tools`]) - Sequence design, structure prediction,
//!   clustering and database search behind traits, with a bounded retry combinator
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//!
//! ## Key Capabilities
//!
//! - **Explicit retry semantics** separating retryable from fatal tool failures
//! - **Accelerator masking** for CPU-bound tools without touching the parent environment
//! - **Idempotent candidate directories** for at-most-once processing per run
//! - **Declarative per-case policies** instead of inline name checks

pub mod config;
pub mod error;
pub mod metrics;
pub mod motif;
pub mod naming;
pub mod progress;
pub mod tools;
