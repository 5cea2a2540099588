//! The external execution engine, seen through the operations migration needs.
//!
//! Persistence, scheduling and transactions stay on the engine's side. Every
//! call is treated as a synchronous remote call that may fail.

use crate::case::Variables;
use crate::definition::WorkflowDefinition;
use crate::error::EngineError;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod memory;

pub use memory::{EngineCall, InMemoryEngine};

/// Names every engine operation, for failure reporting and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineOperation {
    FindCase,
    Definition,
    SuspendCase,
    ActivateCase,
    DeleteCase,
    ActiveNodeIds,
    Variables,
    StartCaseAtNode,
    StartCaseAtEdge,
    DirectMigrate,
    MappedMigrate,
    DeployDefinition,
    DeleteDeployment,
}

impl fmt::Display for EngineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineOperation::FindCase => "find-case",
            EngineOperation::Definition => "definition",
            EngineOperation::SuspendCase => "suspend-case",
            EngineOperation::ActivateCase => "activate-case",
            EngineOperation::DeleteCase => "delete-case",
            EngineOperation::ActiveNodeIds => "active-node-ids",
            EngineOperation::Variables => "variables",
            EngineOperation::StartCaseAtNode => "start-case-at-node",
            EngineOperation::StartCaseAtEdge => "start-case-at-edge",
            EngineOperation::DirectMigrate => "direct-migrate",
            EngineOperation::MappedMigrate => "mapped-migrate",
            EngineOperation::DeployDefinition => "deploy-definition",
            EngineOperation::DeleteDeployment => "delete-deployment",
        };
        f.write_str(name)
    }
}

/// Where a case started on a node begins executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// The node itself executes first.
    Before,
    /// The node counts as completed; its outgoing flow is taken.
    After,
}

/// One explicit origin -> target node assignment for a mapped migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMapping {
    pub origin_node_id: String,
    pub target_node_id: String,
}

/// Identity of a case as the engine knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub case_id: String,
    pub definition_version_id: String,
    pub suspended: bool,
}

/// Result of deploying a new definition resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub deployment_id: String,
    pub definition_version_id: String,
    pub definition: WorkflowDefinition,
}

/// Operations consumed from the workflow execution engine.
pub trait ExecutionEngine {
    /// Looks a case up. `Ok(None)` means the engine has no such case.
    fn find_case(&self, case_id: &str) -> Result<Option<CaseRecord>, EngineError>;

    /// The stored definition of a deployed version.
    fn definition(
        &self,
        definition_version_id: &str,
    ) -> Result<Option<WorkflowDefinition>, EngineError>;

    fn suspend_case(&mut self, case_id: &str) -> Result<(), EngineError>;

    fn activate_case(&mut self, case_id: &str) -> Result<(), EngineError>;

    fn delete_case(&mut self, case_id: &str, reason: &str) -> Result<(), EngineError>;

    fn active_node_ids(&self, case_id: &str) -> Result<AHashSet<String>, EngineError>;

    fn variables(&self, case_id: &str) -> Result<Variables, EngineError>;

    /// Starts a new case of a version positioned before or after a node.
    fn start_case_at_node(
        &mut self,
        definition_version_id: &str,
        node_id: &str,
        variables: &Variables,
        position: StartPosition,
    ) -> Result<String, EngineError>;

    /// Starts a new case on a transition. Conditions on that edge are not evaluated.
    fn start_case_at_edge(
        &mut self,
        definition_version_id: &str,
        edge_id: &str,
        variables: &Variables,
    ) -> Result<String, EngineError>;

    /// Moves cases onto the target version, mapping equal node ids onto each other.
    fn direct_migrate(
        &mut self,
        origin_version_id: &str,
        target_version_id: &str,
        case_ids: &[String],
    ) -> Result<(), EngineError>;

    /// Like `direct_migrate`, with explicit mappings applied on top of the equal-id mapping.
    fn mapped_migrate(
        &mut self,
        origin_version_id: &str,
        target_version_id: &str,
        mapping: &[NodeMapping],
        case_ids: &[String],
    ) -> Result<(), EngineError>;

    fn deploy_definition(&mut self, resource: &[u8]) -> Result<Deployment, EngineError>;

    fn delete_deployment(&mut self, deployment_id: &str) -> Result<(), EngineError>;
}
