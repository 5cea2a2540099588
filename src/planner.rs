//! Decides how a running case moves from its origin version to a target version.
//!
//! Planning is a pure function of two graphs, their delta and a case snapshot.
//! It never touches the engine and never fails for well-formed input: every
//! situation maps onto exactly one `MigrationDecision`.

use crate::case::RunningCase;
use crate::diff::{NodeDelta, NodeIdentity};
use crate::error::MigrationError;
use crate::graph::{GraphNode, WorkflowGraph};
use crate::relocate::{EntryPoint, Relocator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with one running case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum MigrationDecision {
    /// No active node changed; the engine's equal-id mapping is safe.
    DirectMigrate,
    /// The active node kept its id and kind; only its name changed.
    #[serde(rename_all = "camelCase")]
    MappedMigrate {
        origin_node_id: String,
        target_node_id: String,
    },
    /// The active node was removed or changed kind; the case has to be replaced.
    /// `node_id` is the node the entry point was computed for.
    #[serde(rename_all = "camelCase")]
    Relocate {
        node_id: String,
        entry_point: EntryPoint,
    },
    Abort { reason: AbortReason },
}

impl MigrationDecision {
    pub fn is_in_place(&self) -> bool {
        matches!(
            self,
            MigrationDecision::DirectMigrate | MigrationDecision::MappedMigrate { .. }
        )
    }
}

impl fmt::Display for MigrationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDecision::DirectMigrate => write!(f, "direct migration"),
            MigrationDecision::MappedMigrate {
                origin_node_id,
                target_node_id,
            } => write!(
                f,
                "mapped migration '{}' -> '{}'",
                origin_node_id, target_node_id
            ),
            MigrationDecision::Relocate {
                node_id,
                entry_point,
            } => write!(f, "relocation of '{}' {}", node_id, entry_point),
            MigrationDecision::Abort { reason } => write!(f, "abort: {}", reason),
        }
    }
}

/// Why the planner refused to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AbortReason {
    /// The active changed node has no predecessor to restart from.
    #[serde(rename_all = "camelCase")]
    NoRelocationPoint { node_id: String },
    /// Several active nodes changed and the tie-break policy forbids choosing.
    AmbiguousRelocation { candidates: Vec<String> },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoRelocationPoint { node_id } => {
                write!(f, "no relocation point (node '{}')", node_id)
            }
            AbortReason::AmbiguousRelocation { candidates } => {
                write!(f, "ambiguous relocation between [{}]", candidates.join(", "))
            }
        }
    }
}

impl From<AbortReason> for MigrationError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::NoRelocationPoint { node_id } => {
                MigrationError::NoRelocationPoint { node_id }
            }
            AbortReason::AmbiguousRelocation { candidates } => {
                MigrationError::AmbiguousRelocation { candidates }
            }
        }
    }
}

/// How to proceed when more than one active node changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreakPolicy {
    /// Take the first candidate in origin graph order and warn.
    #[default]
    FirstMatch,
    /// Abort the attempt.
    Reject,
}

/// Non-fatal findings of a planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "camelCase")]
pub enum PlanWarning {
    AmbiguousRelocation {
        candidates: Vec<String>,
        chosen: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::AmbiguousRelocation { candidates, chosen } => write!(
                f,
                "{} active nodes changed ([{}]), planning for '{}'",
                candidates.len(),
                candidates.join(", "),
                chosen
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerOptions {
    pub tie_break: TieBreakPolicy,
    /// Under `ElementType` a mapped counterpart must keep the element name too.
    pub identity: NodeIdentity,
}

/// A decision together with the warnings raised while reaching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub decision: MigrationDecision,
    pub warnings: Vec<PlanWarning>,
}

impl PlanOutcome {
    fn decided(decision: MigrationDecision) -> Self {
        Self {
            decision,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: PlannerOptions,
}

impl Planner {
    pub fn new(options: PlannerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> PlannerOptions {
        self.options
    }

    /// Runs the decision table for one case.
    ///
    /// 1. Nothing removed or changed: direct migration.
    /// 2. No changed node is active: direct migration.
    /// 3. The active changed node survives with the same id and kind (and element
    ///    name, under `NodeIdentity::ElementType`): mapped migration.
    /// 4. Otherwise relocate, restarting from the node's predecessor.
    /// 5. No usable predecessor: abort.
    pub fn evaluate(
        &self,
        origin: &WorkflowGraph,
        target: &WorkflowGraph,
        delta: &NodeDelta,
        case: &RunningCase,
    ) -> PlanOutcome {
        if delta.removed_or_changed.is_empty() {
            return PlanOutcome::decided(MigrationDecision::DirectMigrate);
        }

        let active_changed: Vec<&GraphNode> = delta
            .removed_or_changed
            .iter()
            .filter(|node| case.is_active(&node.id))
            .collect();

        let Some(chosen) = active_changed.first() else {
            return PlanOutcome::decided(MigrationDecision::DirectMigrate);
        };

        let mut warnings = Vec::new();
        if active_changed.len() > 1 {
            let candidates: Vec<String> = active_changed.iter().map(|n| n.id.clone()).collect();
            match self.options.tie_break {
                TieBreakPolicy::Reject => {
                    return PlanOutcome::decided(MigrationDecision::Abort {
                        reason: AbortReason::AmbiguousRelocation { candidates },
                    });
                }
                TieBreakPolicy::FirstMatch => warnings.push(PlanWarning::AmbiguousRelocation {
                    candidates,
                    chosen: chosen.id.clone(),
                }),
            }
        }

        let counterpart = delta
            .added_or_changed
            .iter()
            .find(|node| node.id == chosen.id && self.keeps_type(chosen, node));

        let decision = match counterpart {
            Some(target_node) => MigrationDecision::MappedMigrate {
                origin_node_id: chosen.id.clone(),
                target_node_id: target_node.id.clone(),
            },
            None => match Relocator::resolve(origin, target, &chosen.id) {
                Ok(entry_point) => MigrationDecision::Relocate {
                    node_id: chosen.id.clone(),
                    entry_point,
                },
                Err(_) => MigrationDecision::Abort {
                    reason: AbortReason::NoRelocationPoint {
                        node_id: chosen.id.clone(),
                    },
                },
            },
        };

        PlanOutcome { decision, warnings }
    }

    fn keeps_type(&self, origin: &GraphNode, target: &GraphNode) -> bool {
        origin.kind == target.kind
            && match self.options.identity {
                NodeIdentity::Kind => true,
                NodeIdentity::ElementType => origin.element_type == target.element_type,
            }
    }
}

/// Plans with the default first-match tie-break.
pub fn plan(
    origin: &WorkflowGraph,
    target: &WorkflowGraph,
    delta: &NodeDelta,
    case: &RunningCase,
) -> MigrationDecision {
    Planner::default()
        .evaluate(origin, target, delta, case)
        .decision
}
