//! # Utsuri - Live Version Migration for Workflow Cases
//!
//! **Utsuri** decides how a long-running, stateful workflow case moves from the
//! definition version it was started on to a newly deployed revision, without
//! losing its variables or its position in the flow.
//!
//! ## Core Workflow
//!
//! The crate is engine-agnostic. The workflow engine that actually runs cases is
//! reached through the [`engine::ExecutionEngine`] trait. One migration attempt:
//!
//! 1.  **Load**: both definition versions are projected into typed [`graph::WorkflowGraph`]s.
//! 2.  **Suspend**: the running case is suspended before its position is sampled.
//! 3.  **Diff**: [`diff::diff`] finds the nodes that were removed, added or changed.
//! 4.  **Plan**: [`planner::Planner`] picks exactly one [`planner::MigrationDecision`]:
//!     migrate in place, migrate with an explicit node mapping, relocate, or abort.
//! 5.  **Apply**: the [`orchestrator::MigrationOrchestrator`] carries the decision out,
//!     using the [`relocate::Relocator`] when the case has to be restarted elsewhere,
//!     and rolls the attempt back on failure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use utsuri::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let origin = WorkflowDefinition::from_json(&std::fs::read_to_string("order-v1.json")?)?;
//!     let revision = std::fs::read("order-v2.json")?;
//!
//!     // Any `ExecutionEngine` works here; the in-memory one is handy for dry runs.
//!     let mut engine = InMemoryEngine::new();
//!     let version = engine.register_definition(origin);
//!     engine.insert_case(RunningCase::new("order-42", version).with_active(["review"]));
//!
//!     let mut orchestrator = MigrationOrchestrator::new(engine)
//!         .with_config(MigrationConfig::default());
//!     let outcome = orchestrator.migrate_case("order-42", &revision);
//!
//!     match outcome.status {
//!         MigrationStatus::Committed => println!(
//!             "-> Migrated, case now runs as {}",
//!             outcome.resulting_case_id.unwrap_or_default()
//!         ),
//!         MigrationStatus::Aborted => println!(
//!             "-> Aborted: {}",
//!             outcome.reason.unwrap_or_default()
//!         ),
//!     }
//!     Ok(())
//! }
//! ```

pub mod case;
pub mod config;
pub mod definition;
pub mod diff;
pub mod engine;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod planner;
pub mod prelude;
pub mod relocate;
pub mod report;
