//! # Workflows Module
//!
//! High-level, end-to-end procedures built on the [`crate::engine`] machinery.
//!
//! ## Overview
//!
//! Each workflow takes a validated configuration, the tool collaborators it drives,
//! and a [`crate::engine::progress::ProgressReporter`], and returns a summary of
//! what it did. Workflows never read command-line or file configuration themselves.
//!
//! ## Architecture
//!
//! - **Refold** ([`refold`]) - Resequences and refolds every backbone in a directory,
//!   scoring each predicted sample against its design and reference motif.
//! - **Evaluate** ([`evaluate`]) - Merges the per-candidate tables and derives
//!   designability, diversity and novelty for the whole run.

pub mod evaluate;
pub mod refold;
