//! Prelude module for convenient imports
//!
//! Re-exports the types needed to plan and run a migration, so that
//! `use utsuri::prelude::*;` is enough for most callers.

// Definitions and graphs
pub use crate::definition::{EdgeDefinition, IntoDefinition, NodeDefinition, WorkflowDefinition};
pub use crate::graph::{
    DefinitionSummary, Edge, GraphBuilder, GraphNode, GraphSnapshot, NodeKind, WorkflowGraph,
    load_graph,
};

// Diffing and planning
pub use crate::diff::{NodeDelta, NodeIdentity, diff, diff_with};
pub use crate::planner::{
    AbortReason, MigrationDecision, PlanOutcome, PlanWarning, Planner, PlannerOptions,
    TieBreakPolicy, plan,
};
pub use crate::relocate::{EntryPoint, Relocator};

// Running cases and the engine
pub use crate::case::{RunningCase, Variables};
pub use crate::engine::{ExecutionEngine, InMemoryEngine, NodeMapping, StartPosition};

// Orchestration
pub use crate::config::MigrationConfig;
pub use crate::orchestrator::{
    MigrationOrchestrator, MigrationOutcome, MigrationPhase, MigrationStatus,
};

// Error types
pub use crate::error::{EngineError, GraphError, MigrationError};

// Formatting
pub use crate::report::ReportFormatter;
