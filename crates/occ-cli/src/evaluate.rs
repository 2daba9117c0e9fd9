//! # Evaluate Subcommand
//!
//! Reads an occupancy record exported as JSON and prints its step
//! evaluation, permitted actions, and any broken invariant.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use occ_state::{evaluate, permitted_actions, Action, Evaluation, OccupancyRecord, StageKind};

/// Arguments for `occ evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Path to the record JSON.
    pub record: PathBuf,
}

/// Evaluator output for one record.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateReport {
    pub space_id: String,
    pub status: String,
    pub stage: Option<StageKind>,
    pub evaluation: Evaluation,
    pub next_actions: Vec<Action>,
    /// The first broken invariant, if any.
    pub invariant_violation: Option<String>,
}

/// Execute `occ evaluate`.
pub fn run_evaluate(args: &EvaluateArgs) -> Result<u8> {
    let report = evaluate_file(&args.record)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.invariant_violation.is_some() { 1 } else { 0 })
}

/// Load and evaluate the record at `path`.
pub fn evaluate_file(path: &Path) -> Result<EvaluateReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading record {}", path.display()))?;
    let record: OccupancyRecord = serde_json::from_str(&raw)
        .with_context(|| format!("parsing record {}", path.display()))?;
    Ok(report_for(&record))
}

pub fn report_for(record: &OccupancyRecord) -> EvaluateReport {
    let invariant_violation = record.check_invariants().err().map(|e| e.to_string());
    if let Some(violation) = &invariant_violation {
        tracing::warn!(space = %record.space_id, %violation, "record breaks an invariant");
    }
    EvaluateReport {
        space_id: record.space_id.to_string(),
        status: record.status.to_string(),
        stage: record.stage(),
        evaluation: evaluate(record),
        next_actions: permitted_actions(record),
        invariant_violation,
    }
}
