//! # sp-pipeline
//!
//! The export side of splitforge: turning a timeline's segments into
//! delivered output files.
//!
//! This crate provides:
//!
//! - **[`ExportPipeline`]** -- runs `export_all` / `export_single` through
//!   the `Preparing -> Encoding -> Delivering` state machine, one segment at
//!   a time, with an exclusivity guard and all-or-nothing delivery.
//! - **[`ExportContext`]** -- per-run source, cancellation and progress.
//! - **[`ExportJob`]** -- the transient job record and its progress.
//! - **[`OutputSink`]** -- where finished files are handed off.
//! - **[`naming`]** -- output file names and size estimates.

pub mod context;
pub mod executor;
pub mod job;
pub mod naming;
pub mod sink;

// Re-export key types at the crate root.
pub use context::{ExportContext, ProgressSender};
pub use executor::{DeliveredOutput, ExportPipeline, ExportReport, PlannedOutput};
pub use job::{ExportJob, ExportStatus};
pub use naming::{estimate_size_mb, output_file_name};
pub use sink::{CollectingSink, DirectorySink, OutputFile, OutputSink};
