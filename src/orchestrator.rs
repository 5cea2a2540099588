//! Sequences one migration attempt and cleans up after it.
//!
//! An attempt walks `Idle -> Suspended -> Diffed -> Decided -> Applied -> Committed`,
//! or ends in `Aborted` as soon as a step fails. The origin case is suspended
//! before its position is sampled. Callers must not run two attempts against the
//! same case at once; nothing here locks.

use crate::case::RunningCase;
use crate::config::MigrationConfig;
use crate::diff::diff_with;
use crate::engine::{CaseRecord, ExecutionEngine, NodeMapping};
use crate::error::{EngineError, MigrationError};
use crate::graph::{GraphBuilder, WorkflowGraph, load_graph};
use crate::planner::{MigrationDecision, PlanWarning, Planner};
use crate::relocate::{EntryPoint, Relocator};
use serde::Serialize;
use std::fmt;
use tracing::{Span, debug, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationPhase {
    Idle,
    Suspended,
    Diffed,
    Decided,
    Applied,
    Committed,
    Aborted,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationPhase::Idle => "idle",
            MigrationPhase::Suspended => "suspended",
            MigrationPhase::Diffed => "diffed",
            MigrationPhase::Decided => "decided",
            MigrationPhase::Applied => "applied",
            MigrationPhase::Committed => "committed",
            MigrationPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Committed,
    Aborted,
}

/// What a migration attempt left behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub status: MigrationStatus,
    pub origin_case_id: String,
    /// The case that now carries the work: the migrated or replacement case on
    /// commit, the (suspended) origin case on abort. `None` if the case never existed.
    pub resulting_case_id: Option<String>,
    pub decision: Option<MigrationDecision>,
    /// Deployment created by this attempt, if any.
    pub deployment_id: Option<String>,
    pub deployment_rolled_back: bool,
    pub target_version_id: Option<String>,
    pub reason: Option<String>,
    #[serde(skip)]
    pub error: Option<MigrationError>,
    /// Last phase reached.
    pub phase: MigrationPhase,
    pub history: Vec<MigrationPhase>,
    pub warnings: Vec<PlanWarning>,
}

impl MigrationOutcome {
    pub fn is_committed(&self) -> bool {
        self.status == MigrationStatus::Committed
    }
}

struct Attempt {
    case_id: String,
    span: Span,
    history: Vec<MigrationPhase>,
    case_known: bool,
    /// Suspended by this attempt, as opposed to found suspended.
    suspended_here: bool,
    deployment_id: Option<String>,
    target_version_id: Option<String>,
    decision: Option<MigrationDecision>,
    warnings: Vec<PlanWarning>,
}

impl Attempt {
    fn new(case_id: &str, parent: &Span) -> Self {
        Self {
            case_id: case_id.to_string(),
            span: info_span!(parent: parent, "attempt", case_id = %case_id),
            history: vec![MigrationPhase::Idle],
            case_known: false,
            suspended_here: false,
            deployment_id: None,
            target_version_id: None,
            decision: None,
            warnings: Vec::new(),
        }
    }

    fn phase(&self) -> MigrationPhase {
        self.history
            .last()
            .copied()
            .unwrap_or(MigrationPhase::Idle)
    }

    fn advance(&mut self, phase: MigrationPhase) {
        debug!(parent: &self.span, from = %self.phase(), to = %phase, "Migration phase changed");
        self.history.push(phase);
    }
}

struct Applied {
    resulting_case_id: String,
    note: Option<String>,
}

/// Drives migration attempts against an execution engine.
pub struct MigrationOrchestrator<E> {
    engine: E,
    config: MigrationConfig,
    span: Span,
}

impl<E: ExecutionEngine> MigrationOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: MigrationConfig::default(),
            span: info_span!("migration"),
        }
    }

    pub fn with_config(mut self, config: MigrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Parent span of every event this orchestrator emits.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Deploys `resource` as a new definition version and moves the case onto it.
    ///
    /// Never returns a partial decision: the outcome is either committed, or
    /// aborted with the deployment of this attempt removed again.
    pub fn migrate_case(&mut self, case_id: &str, resource: &[u8]) -> MigrationOutcome {
        let mut attempt = Attempt::new(case_id, &self.span);
        info!(parent: &attempt.span, "Starting migration attempt");
        let result = self.run_migration(&mut attempt, resource);
        self.finish(attempt, result)
    }

    /// Moves a case onto an explicit task of an already deployed version.
    ///
    /// The case is restarted on the task's first incoming transition in the
    /// target graph, so it lands on the task itself. Non-task nodes and tasks
    /// without an incoming transition abort with `NoRelocationPoint`.
    pub fn relocate_to_node(
        &mut self,
        case_id: &str,
        target_version_id: &str,
        node_id: &str,
    ) -> MigrationOutcome {
        let mut attempt = Attempt::new(case_id, &self.span);
        attempt.target_version_id = Some(target_version_id.to_string());
        info!(parent: &attempt.span, target_version = target_version_id, node_id, "Starting directed relocation");
        let result = self.run_relocation(&mut attempt, target_version_id, node_id);
        self.finish(attempt, result)
    }

    fn run_migration(
        &mut self,
        attempt: &mut Attempt,
        resource: &[u8],
    ) -> Result<Applied, MigrationError> {
        let record = self.find_case(attempt)?;
        let origin = load_graph(&self.engine, &record.definition_version_id)?;

        let deployment = self.engine.deploy_definition(resource)?;
        attempt.deployment_id = Some(deployment.deployment_id.clone());
        attempt.target_version_id = Some(deployment.definition_version_id.clone());
        info!(
            parent: &attempt.span,
            deployment_id = %deployment.deployment_id,
            target_version = %deployment.definition_version_id,
            "Target definition deployed"
        );
        let target = GraphBuilder::new(deployment.definition).build()?;
        target.ensure_workable()?;

        self.suspend(attempt, &record)?;
        let case = RunningCase::snapshot(&self.engine, &record)?;

        let delta = diff_with(&origin, &target, self.config.identity);
        debug!(
            parent: &attempt.span,
            removed_or_changed = delta.removed_or_changed.len(),
            added_or_changed = delta.added_or_changed.len(),
            "Graphs compared"
        );
        attempt.advance(MigrationPhase::Diffed);

        let planned =
            Planner::new(self.config.planner_options()).evaluate(&origin, &target, &delta, &case);
        for warning in &planned.warnings {
            warn!(parent: &attempt.span, %warning, "Ambiguous relocation, first match applied");
        }
        attempt.warnings = planned.warnings;
        self.decide(attempt, planned.decision.clone());

        self.apply(attempt, origin.definition_version_id(), &target, &case, planned.decision)
    }

    fn run_relocation(
        &mut self,
        attempt: &mut Attempt,
        target_version_id: &str,
        node_id: &str,
    ) -> Result<Applied, MigrationError> {
        let record = self.find_case(attempt)?;
        let target = load_graph(&self.engine, target_version_id)?;
        let edge = target
            .node(node_id)
            .filter(|node| node.is_task())
            .and_then(|_| target.first_incoming_edge(node_id))
            .ok_or_else(|| MigrationError::NoRelocationPoint {
                node_id: node_id.to_string(),
            })?;
        let entry_point = EntryPoint::Transition {
            edge_id: edge.id.clone(),
        };

        self.suspend(attempt, &record)?;
        let case = RunningCase::snapshot(&self.engine, &record)?;

        let decision = MigrationDecision::Relocate {
            node_id: node_id.to_string(),
            entry_point,
        };
        self.decide(attempt, decision.clone());

        self.apply(attempt, &record.definition_version_id, &target, &case, decision)
    }

    fn find_case(&self, attempt: &mut Attempt) -> Result<CaseRecord, MigrationError> {
        match self.engine.find_case(&attempt.case_id) {
            Ok(Some(record)) => {
                attempt.case_known = true;
                Ok(record)
            }
            Ok(None) | Err(EngineError::CaseNotFound(_)) => {
                Err(MigrationError::NoActiveCase(attempt.case_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn suspend(&mut self, attempt: &mut Attempt, record: &CaseRecord) -> Result<(), MigrationError> {
        self.engine.suspend_case(&attempt.case_id)?;
        attempt.suspended_here = !record.suspended;
        attempt.advance(MigrationPhase::Suspended);
        Ok(())
    }

    fn decide(&self, attempt: &mut Attempt, decision: MigrationDecision) {
        info!(parent: &attempt.span, %decision, "Migration decided");
        attempt.decision = Some(decision);
        attempt.advance(MigrationPhase::Decided);
    }

    fn apply(
        &mut self,
        attempt: &mut Attempt,
        origin_version_id: &str,
        target: &WorkflowGraph,
        case: &RunningCase,
        decision: MigrationDecision,
    ) -> Result<Applied, MigrationError> {
        let case_ids = [case.case_id.clone()];
        let target_version_id = target.definition_version_id();
        let in_place = decision.is_in_place();

        let resulting_case_id = match decision {
            MigrationDecision::DirectMigrate => {
                self.engine
                    .direct_migrate(origin_version_id, target_version_id, &case_ids)?;
                case.case_id.clone()
            }
            MigrationDecision::MappedMigrate {
                origin_node_id,
                target_node_id,
            } => {
                let mapping = [NodeMapping {
                    origin_node_id,
                    target_node_id,
                }];
                self.engine.mapped_migrate(
                    origin_version_id,
                    target_version_id,
                    &mapping,
                    &case_ids,
                )?;
                case.case_id.clone()
            }
            MigrationDecision::Relocate { entry_point, .. } => {
                Relocator::new(self.config.termination_reason.clone())
                    .in_span(attempt.span.clone())
                    .relocate(
                        &mut self.engine,
                        target,
                        &entry_point,
                        &case.variables,
                        &case.case_id,
                    )?
            }
            MigrationDecision::Abort { reason } => return Err(reason.into()),
        };
        attempt.advance(MigrationPhase::Applied);

        let mut note = None;
        if in_place && attempt.suspended_here && self.config.activate_after_migration {
            if let Err(e) = self.engine.activate_case(&resulting_case_id) {
                warn!(parent: &attempt.span, error = %e, "Migrated case could not be activated");
                note = Some(format!("case migrated but left suspended: {}", e));
            }
        }

        Ok(Applied {
            resulting_case_id,
            note,
        })
    }

    fn finish(
        &mut self,
        attempt: Attempt,
        result: Result<Applied, MigrationError>,
    ) -> MigrationOutcome {
        match result {
            Ok(applied) => self.commit(attempt, applied),
            Err(error) => self.abort(attempt, error),
        }
    }

    fn commit(&self, mut attempt: Attempt, applied: Applied) -> MigrationOutcome {
        attempt.advance(MigrationPhase::Committed);
        info!(
            parent: &attempt.span,
            resulting_case_id = %applied.resulting_case_id,
            "Migration committed"
        );
        MigrationOutcome {
            status: MigrationStatus::Committed,
            origin_case_id: attempt.case_id,
            resulting_case_id: Some(applied.resulting_case_id),
            decision: attempt.decision,
            deployment_id: attempt.deployment_id,
            deployment_rolled_back: false,
            target_version_id: attempt.target_version_id,
            reason: applied.note,
            error: None,
            phase: MigrationPhase::Committed,
            history: attempt.history,
            warnings: attempt.warnings,
        }
    }

    /// Rolls back what this attempt created. The origin case stays suspended
    /// unless `reactivate_on_abort` is set.
    fn abort(&mut self, mut attempt: Attempt, error: MigrationError) -> MigrationOutcome {
        warn!(parent: &attempt.span, %error, phase = %attempt.phase(), "Migration attempt aborted");
        let mut reason = error.to_string();
        let mut deployment_rolled_back = false;

        if let Some(deployment_id) = attempt.deployment_id.as_deref() {
            if matches!(error, MigrationError::RelocationWindowOpen { .. }) {
                error!(parent: &attempt.span, deployment_id, "Keeping deployment, a replacement case still runs on it");
            } else {
                match self.engine.delete_deployment(deployment_id) {
                    Ok(()) => {
                        info!(parent: &attempt.span, deployment_id, "Deployment rolled back");
                        deployment_rolled_back = true;
                    }
                    Err(e) => {
                        error!(parent: &attempt.span, deployment_id, error = %e, "Deployment could not be rolled back");
                        reason.push_str(&format!(
                            "; deployment '{}' could not be deleted: {}",
                            deployment_id, e
                        ));
                    }
                }
            }
        }

        if attempt.suspended_here && self.config.reactivate_on_abort {
            match self.engine.activate_case(&attempt.case_id) {
                Ok(()) => info!(parent: &attempt.span, "Origin case reactivated"),
                Err(e) => {
                    error!(parent: &attempt.span, error = %e, "Origin case could not be reactivated");
                    reason.push_str(&format!("; case could not be reactivated: {}", e));
                }
            }
        }

        attempt.history.push(MigrationPhase::Aborted);
        let resulting_case_id = attempt.case_known.then(|| attempt.case_id.clone());
        MigrationOutcome {
            status: MigrationStatus::Aborted,
            origin_case_id: attempt.case_id,
            resulting_case_id,
            decision: attempt.decision,
            deployment_id: attempt.deployment_id,
            deployment_rolled_back,
            target_version_id: attempt.target_version_id,
            reason: Some(reason),
            error: Some(error),
            phase: MigrationPhase::Aborted,
            history: attempt.history,
            warnings: attempt.warnings,
        }
    }
}
