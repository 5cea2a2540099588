//! Moving a case onto a computed entry point of the target version.
//!
//! Relocation replaces the running case: a fresh case is started on the target
//! graph with the old variables, and only then is the old case deleted.

use crate::case::Variables;
use crate::engine::{ExecutionEngine, StartPosition};
use crate::error::MigrationError;
use crate::graph::{NodeKind, WorkflowGraph};
use serde::Serialize;
use std::fmt;
use tracing::{Span, debug, error, info, warn};

/// Reason recorded on a replacement case that had to be discarded again.
const COMPENSATION_REASON: &str = "relocation rolled back";

/// Where the replacement case starts. Always refers to an element of the target graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntryPoint {
    /// Start before the node, so it is evaluated again.
    #[serde(rename_all = "camelCase")]
    BeforeNode { node_id: String },
    /// Start after the node; it counts as already passed.
    #[serde(rename_all = "camelCase")]
    AfterNode { node_id: String },
    /// Start on the transition itself. Edge conditions are skipped.
    #[serde(rename_all = "camelCase")]
    Transition { edge_id: String },
}

impl EntryPoint {
    /// Id of the node or edge the entry point refers to.
    pub fn element_id(&self) -> &str {
        match self {
            EntryPoint::BeforeNode { node_id } | EntryPoint::AfterNode { node_id } => node_id,
            EntryPoint::Transition { edge_id } => edge_id,
        }
    }

    pub fn exists_in(&self, graph: &WorkflowGraph) -> bool {
        match self {
            EntryPoint::BeforeNode { node_id } | EntryPoint::AfterNode { node_id } => {
                graph.contains_node(node_id)
            }
            EntryPoint::Transition { edge_id } => graph.contains_edge(edge_id),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::BeforeNode { node_id } => write!(f, "before node '{}'", node_id),
            EntryPoint::AfterNode { node_id } => write!(f, "after node '{}'", node_id),
            EntryPoint::Transition { edge_id } => write!(f, "on transition '{}'", edge_id),
        }
    }
}

/// Resolves entry points and carries out relocations against an engine.
pub struct Relocator {
    termination_reason: String,
    span: Span,
}

impl Default for Relocator {
    fn default() -> Self {
        Self::new("migrated")
    }
}

impl Relocator {
    pub fn new(termination_reason: impl Into<String>) -> Self {
        Self {
            termination_reason: termination_reason.into(),
            span: Span::none(),
        }
    }

    /// Emits all events under the given span.
    pub fn in_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Computes where a case standing on `from_node_id` re-enters the target graph.
    ///
    /// The node and its first incoming edge are looked up in `source`. A gateway
    /// predecessor is re-entered after the gateway when it joins several flows
    /// in `target`, before it otherwise. Any other predecessor is re-entered on
    /// the incoming transition, which must exist in `target` under the same id.
    ///
    /// Nodes with several incoming edges are not disambiguated: the first one wins.
    pub fn resolve(
        source: &WorkflowGraph,
        target: &WorkflowGraph,
        from_node_id: &str,
    ) -> Result<EntryPoint, MigrationError> {
        let no_point = || MigrationError::NoRelocationPoint {
            node_id: from_node_id.to_string(),
        };

        let edge = source.first_incoming_edge(from_node_id).ok_or_else(no_point)?;
        let predecessor = source.node(&edge.source_node_id).ok_or_else(no_point)?;

        let entry = if predecessor.kind == NodeKind::Gateway {
            let gateway = target.node(&predecessor.id).ok_or_else(no_point)?;
            if gateway.incoming_edges.len() > 1 {
                EntryPoint::AfterNode {
                    node_id: gateway.id.clone(),
                }
            } else {
                EntryPoint::BeforeNode {
                    node_id: gateway.id.clone(),
                }
            }
        } else {
            EntryPoint::Transition {
                edge_id: edge.id.clone(),
            }
        };

        if !entry.exists_in(target) {
            return Err(no_point());
        }
        Ok(entry)
    }

    /// Resolves the entry point for `from_node_id` and relocates the case there.
    pub fn relocate_from<E: ExecutionEngine + ?Sized>(
        &self,
        engine: &mut E,
        source: &WorkflowGraph,
        target: &WorkflowGraph,
        from_node_id: &str,
        variables: &Variables,
        case_id: &str,
    ) -> Result<String, MigrationError> {
        let entry = Self::resolve(source, target, from_node_id)?;
        self.relocate(engine, target, &entry, variables, case_id)
    }

    /// Starts the replacement case at `entry`, then deletes the original one.
    ///
    /// A failed start leaves the original untouched. A failed delete discards the
    /// replacement again, so at most one copy stays live.
    pub fn relocate<E: ExecutionEngine + ?Sized>(
        &self,
        engine: &mut E,
        target: &WorkflowGraph,
        entry: &EntryPoint,
        variables: &Variables,
        case_id: &str,
    ) -> Result<String, MigrationError> {
        if !entry.exists_in(target) {
            return Err(MigrationError::NoRelocationPoint {
                node_id: entry.element_id().to_string(),
            });
        }

        let version = target.definition_version_id();
        debug!(parent: &self.span, case_id, %entry, version, "Starting replacement case");
        let new_case_id = match entry {
            EntryPoint::BeforeNode { node_id } => {
                engine.start_case_at_node(version, node_id, variables, StartPosition::Before)?
            }
            EntryPoint::AfterNode { node_id } => {
                engine.start_case_at_node(version, node_id, variables, StartPosition::After)?
            }
            EntryPoint::Transition { edge_id } => {
                engine.start_case_at_edge(version, edge_id, variables)?
            }
        };

        if let Err(delete_error) = engine.delete_case(case_id, &self.termination_reason) {
            warn!(
                parent: &self.span,
                case_id,
                new_case_id = %new_case_id,
                error = %delete_error,
                "Could not delete original case, discarding replacement"
            );
            return match engine.delete_case(&new_case_id, COMPENSATION_REASON) {
                Ok(()) => Err(MigrationError::Engine(delete_error)),
                Err(compensation_error) => {
                    error!(
                        parent: &self.span,
                        case_id,
                        new_case_id = %new_case_id,
                        error = %compensation_error,
                        "Replacement case could not be discarded"
                    );
                    Err(MigrationError::RelocationWindowOpen {
                        origin_case_id: case_id.to_string(),
                        new_case_id,
                    })
                }
            };
        }

        info!(parent: &self.span, case_id, new_case_id = %new_case_id, %entry, "Case relocated");
        Ok(new_case_id)
    }
}
