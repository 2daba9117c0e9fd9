//! # Replay Subcommand
//!
//! Runs a YAML script of lifecycle actions for one space against a fresh
//! in-memory backend. Stage ids are never written in scripts; each action
//! targets whatever stage record is currently open.
//!
//! ```yaml
//! space: A-101
//! clock: 2024-06-01T09:00:00Z
//! users:
//!   insp-1: Priya Nair
//! steps:
//!   - action: move_in
//!     occupant_type: tenant
//!     occupant_name: Sam Rao
//!     move_in_date: 2023-06-01
//!   - action: request_move_out
//!     move_out_date: 2024-06-01
//!   - action: complete_handover
//!     handover_date: 2024-06-01
//!     handover_to_person: Facility desk
//!   - action: request_inspection
//!     scheduled_date: 2024-06-02
//!     inspector: insp-1
//!   - action: complete_inspection
//!     damage_found: false
//!   - action: complete_settlement
//!     damage_charges: 0
//!     pending_dues: 500
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::{Deserialize, Serialize};

use occ_core::{LifecycleError, SpaceId, Timestamp, UserId};
use occ_lifecycle::{
    Advance, AuditEntry, FixedClock, InMemoryPersistence, LifecycleConfig, LifecycleOrchestrator,
    StaticDirectory,
};
use occ_state::{
    ClosedCycle, ExitWorkflow, HandoverFields, InspectionReport, MoveIn, MoveOutRequest,
    SequencedEvent, SettlementInput,
};

/// Arguments for `occ replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the YAML script.
    pub script: PathBuf,

    /// Log failed steps and continue instead of stopping at the first.
    #[arg(long)]
    pub keep_going: bool,
}

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub space: SpaceId,
    /// Starting time of the replay clock; the wall clock when absent.
    #[serde(default)]
    pub clock: Option<Timestamp>,
    /// Directory entries, user id to display name.
    #[serde(default)]
    pub users: BTreeMap<UserId, String>,
    pub steps: Vec<ScriptStep>,
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    MoveIn(MoveIn),
    RequestMoveOut(MoveOutRequest),
    CancelMoveOut {
        #[serde(default)]
        notes: Option<String>,
    },
    SaveHandoverDraft(HandoverFields),
    CompleteHandover(HandoverFields),
    RequestInspection {
        scheduled_date: NaiveDate,
        inspector: UserId,
    },
    RescheduleInspection {
        scheduled_date: NaiveDate,
        inspector: UserId,
    },
    CompleteInspection(InspectionReport),
    CompleteMaintenance {
        #[serde(default)]
        completed_at: Option<Timestamp>,
    },
    CompleteSettlement(SettlementInput),
    AddNote {
        text: String,
    },
    /// Move the replay clock.
    SetClock {
        at: Timestamp,
    },
}

impl ScriptStep {
    fn name(&self) -> &'static str {
        match self {
            Self::MoveIn(_) => "move_in",
            Self::RequestMoveOut(_) => "request_move_out",
            Self::CancelMoveOut { .. } => "cancel_move_out",
            Self::SaveHandoverDraft(_) => "save_handover_draft",
            Self::CompleteHandover(_) => "complete_handover",
            Self::RequestInspection { .. } => "request_inspection",
            Self::RescheduleInspection { .. } => "reschedule_inspection",
            Self::CompleteInspection(_) => "complete_inspection",
            Self::CompleteMaintenance { .. } => "complete_maintenance",
            Self::CompleteSettlement(_) => "complete_settlement",
            Self::AddNote { .. } => "add_note",
            Self::SetClock { .. } => "set_clock",
        }
    }
}

/// A step that did not commit.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    /// Zero-based step index.
    pub step: usize,
    pub action: &'static str,
    pub error: String,
}

/// What a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub space: SpaceId,
    pub current: Advance,
    pub timeline: Vec<SequencedEvent>,
    pub history: Vec<ClosedCycle>,
    pub audit: Vec<AuditEntry>,
    pub failures: Vec<StepFailure>,
}

/// Execute `occ replay`.
pub fn run_replay(args: &ReplayArgs, config: LifecycleConfig) -> Result<u8> {
    let script = load_script(&args.script)?;
    let report = replay(&script, config, args.keep_going)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.failures.is_empty() { 0 } else { 2 })
}

/// Parse a script file.
pub fn load_script(path: &Path) -> Result<Script> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing script {}", path.display()))
}

/// Run `script` to completion.
///
/// With `keep_going` unset the first failed step aborts the replay with its
/// error; otherwise failures are collected into the report.
pub fn replay(script: &Script, config: LifecycleConfig, keep_going: bool) -> Result<ReplayReport> {
    let clock = Arc::new(FixedClock::new(script.clock.unwrap_or_else(Timestamp::now)));
    let directory: StaticDirectory = script
        .users
        .iter()
        .map(|(id, name)| (id.clone(), name.clone()))
        .collect();
    let orch = LifecycleOrchestrator::new(Arc::new(InMemoryPersistence::new()))
        .with_clock(clock.clone())
        .with_directory(Arc::new(directory))
        .with_config(config);
    let space = &script.space;

    let mut failures = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        if let ScriptStep::SetClock { at } = step {
            clock.set(*at);
            continue;
        }
        match apply(&orch, space, step.clone()) {
            Ok(advance) => tracing::info!(
                step = index,
                action = step.name(),
                status = %advance.record.status,
                "step applied"
            ),
            Err(e) if keep_going => {
                tracing::warn!(step = index, action = step.name(), error = %e, "step failed");
                failures.push(StepFailure {
                    step: index,
                    action: step.name(),
                    error: e.to_string(),
                });
            }
            Err(e) => {
                return Err(e).with_context(|| format!("step {index} ({})", step.name()));
            }
        }
    }

    Ok(ReplayReport {
        space: space.clone(),
        current: orch.current(space)?,
        timeline: orch.timeline(space)?,
        history: orch.history(space)?,
        audit: orch.audit(space)?,
        failures,
    })
}

fn apply(
    orch: &LifecycleOrchestrator,
    space: &SpaceId,
    step: ScriptStep,
) -> Result<Advance, LifecycleError> {
    match step {
        ScriptStep::MoveIn(req) => orch.move_in(space, req),
        ScriptStep::RequestMoveOut(req) => orch.request_move_out(space, req),
        ScriptStep::CancelMoveOut { notes } => orch.cancel_move_out(space, notes),
        ScriptStep::SaveHandoverDraft(fields) => {
            let id = open_exit(orch, space, "save handover draft")?.handover.id;
            orch.save_handover_draft(space, id, fields)
        }
        ScriptStep::CompleteHandover(fields) => {
            let id = open_exit(orch, space, "complete handover")?.handover.id;
            orch.complete_handover(space, id, fields)
        }
        ScriptStep::RequestInspection {
            scheduled_date,
            inspector,
        } => {
            let id = open_exit(orch, space, "request inspection")?.handover.id;
            orch.request_inspection(space, id, scheduled_date, inspector)
        }
        ScriptStep::RescheduleInspection {
            scheduled_date,
            inspector,
        } => {
            let exit = open_exit(orch, space, "reschedule inspection")?;
            let id = exit
                .inspection
                .map(|i| i.id)
                .ok_or_else(|| missing(orch, space, "reschedule inspection", "no inspection"))?;
            orch.reschedule_inspection(space, id, scheduled_date, inspector)
        }
        ScriptStep::CompleteInspection(report) => {
            let exit = open_exit(orch, space, "complete inspection")?;
            let id = exit
                .inspection
                .map(|i| i.id)
                .ok_or_else(|| missing(orch, space, "complete inspection", "no inspection"))?;
            orch.complete_inspection(space, id, report)
        }
        ScriptStep::CompleteMaintenance { completed_at } => {
            let exit = open_exit(orch, space, "complete maintenance")?;
            let id = exit.maintenance.record().map(|m| m.id).ok_or_else(|| {
                missing(orch, space, "complete maintenance", "no maintenance job")
            })?;
            orch.complete_maintenance(space, id, completed_at)
        }
        ScriptStep::CompleteSettlement(input) => {
            let exit = open_exit(orch, space, "complete settlement")?;
            let id = exit.settlement.map(|s| s.id).ok_or_else(|| {
                missing(orch, space, "complete settlement", "no open settlement")
            })?;
            orch.complete_settlement(space, id, input)
        }
        ScriptStep::AddNote { text } => orch.add_note(space, &text),
        ScriptStep::SetClock { .. } => orch.current(space),
    }
}

fn open_exit(
    orch: &LifecycleOrchestrator,
    space: &SpaceId,
    operation: &str,
) -> Result<ExitWorkflow, LifecycleError> {
    let record = orch.current(space)?.record;
    let status = record.status;
    record
        .exit
        .ok_or_else(|| occ_core::StateError::new(operation, status, "no move-out is in progress").into())
}

fn missing(
    orch: &LifecycleOrchestrator,
    space: &SpaceId,
    operation: &str,
    reason: &str,
) -> LifecycleError {
    match orch.current(space) {
        Ok(current) => occ_core::StateError::new(operation, current.record.status, reason).into(),
        Err(e) => e,
    }
}
