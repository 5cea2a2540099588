use super::{
    CaseRecord, Deployment, EngineOperation, ExecutionEngine, NodeMapping, StartPosition,
};
use crate::case::{RunningCase, Variables};
use crate::definition::WorkflowDefinition;
use crate::error::EngineError;
use ahash::{AHashMap, AHashSet};
use std::cell::RefCell;

/// A recorded call against the in-memory engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    pub operation: EngineOperation,
    pub subject: String,
}

#[derive(Debug, Clone)]
struct StoredCase {
    definition_version_id: String,
    active_node_ids: AHashSet<String>,
    variables: Variables,
    suspended: bool,
}

/// A deterministic engine that keeps everything in memory.
///
/// Deployment resources are JSON encoded `WorkflowDefinition`s. Started cases
/// are placed on the node they are started at; nothing ever advances on its
/// own. Any operation can be made to fail with `fail_on` or `fail_next`.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    definitions: AHashMap<String, WorkflowDefinition>,
    deployments: AHashMap<String, Vec<String>>,
    cases: AHashMap<String, StoredCase>,
    deleted_cases: Vec<(String, String)>,
    versions_per_name: AHashMap<String, u32>,
    failures: AHashSet<EngineOperation>,
    one_shot_failures: RefCell<AHashSet<EngineOperation>>,
    calls: RefCell<Vec<EngineCall>>,
    next_case: u64,
    next_deployment: u64,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, definition: WorkflowDefinition) -> Self {
        self.register_definition(definition);
        self
    }

    pub fn with_case(mut self, case: RunningCase) -> Self {
        self.insert_case(case);
        self
    }

    /// Stores a definition as if it had been deployed earlier. Returns its version id.
    pub fn register_definition(&mut self, mut definition: WorkflowDefinition) -> String {
        if definition.definition_version_id.is_empty() {
            definition.definition_version_id = self.next_version_id(&definition.name);
        }
        let version_id = definition.definition_version_id.clone();
        let deployment_id = self.next_deployment_id();
        self.deployments
            .insert(deployment_id, vec![version_id.clone()]);
        self.definitions.insert(version_id.clone(), definition);
        version_id
    }

    /// Places a running case into the engine, as observed at some point of its execution.
    pub fn insert_case(&mut self, case: RunningCase) {
        self.cases.insert(
            case.case_id,
            StoredCase {
                definition_version_id: case.definition_version_id,
                active_node_ids: case.active_node_ids,
                variables: case.variables,
                suspended: false,
            },
        );
    }

    /// Makes every subsequent call of `operation` fail.
    pub fn fail_on(&mut self, operation: EngineOperation) {
        self.failures.insert(operation);
    }

    /// Makes only the next call of `operation` fail.
    pub fn fail_next(&mut self, operation: EngineOperation) {
        self.one_shot_failures.get_mut().insert(operation);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
        self.one_shot_failures.get_mut().clear();
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    pub fn operations(&self) -> Vec<EngineOperation> {
        self.calls.borrow().iter().map(|c| c.operation).collect()
    }

    pub fn is_live(&self, case_id: &str) -> bool {
        self.cases.contains_key(case_id)
    }

    pub fn is_suspended(&self, case_id: &str) -> bool {
        self.cases.get(case_id).is_some_and(|c| c.suspended)
    }

    /// Current state of a live case.
    pub fn case(&self, case_id: &str) -> Option<RunningCase> {
        self.cases.get(case_id).map(|stored| RunningCase {
            case_id: case_id.to_string(),
            definition_version_id: stored.definition_version_id.clone(),
            active_node_ids: stored.active_node_ids.clone(),
            variables: stored.variables.clone(),
        })
    }

    /// Deleted cases together with the reason given, in deletion order.
    pub fn deleted_cases(&self) -> &[(String, String)] {
        &self.deleted_cases
    }

    pub fn has_deployment(&self, deployment_id: &str) -> bool {
        self.deployments.contains_key(deployment_id)
    }

    pub fn deployment_count(&self) -> usize {
        self.deployments.len()
    }

    pub fn live_case_count(&self) -> usize {
        self.cases.len()
    }

    fn record(&self, operation: EngineOperation, subject: &str) -> Result<(), EngineError> {
        self.calls.borrow_mut().push(EngineCall {
            operation,
            subject: subject.to_string(),
        });
        if self.failures.contains(&operation)
            || self.one_shot_failures.borrow_mut().remove(&operation)
        {
            return Err(EngineError::operation(operation, "injected failure"));
        }
        Ok(())
    }

    fn next_version_id(&mut self, name: &str) -> String {
        let key = if name.is_empty() { "definition" } else { name };
        let counter = self.versions_per_name.entry(key.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}:{}", key, counter);
            // Skip ids taken by explicitly registered versions.
            if !self.definitions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn next_deployment_id(&mut self) -> String {
        self.next_deployment += 1;
        format!("deployment-{}", self.next_deployment)
    }

    fn next_case_id(&mut self) -> String {
        self.next_case += 1;
        format!("case-{}", self.next_case)
    }

    fn stored(&self, case_id: &str) -> Result<&StoredCase, EngineError> {
        self.cases
            .get(case_id)
            .ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))
    }

    fn stored_mut(&mut self, case_id: &str) -> Result<&mut StoredCase, EngineError> {
        self.cases
            .get_mut(case_id)
            .ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))
    }

    fn stored_definition(&self, version_id: &str) -> Result<&WorkflowDefinition, EngineError> {
        self.definitions
            .get(version_id)
            .ok_or_else(|| EngineError::DefinitionNotFound(version_id.to_string()))
    }

    fn spawn(&mut self, version_id: &str, active: AHashSet<String>, variables: &Variables) -> String {
        let case_id = self.next_case_id();
        self.cases.insert(
            case_id.clone(),
            StoredCase {
                definition_version_id: version_id.to_string(),
                active_node_ids: active,
                variables: variables.clone(),
                suspended: false,
            },
        );
        case_id
    }

    /// Moves cases to the target version, failing atomically if an active node
    /// would have no counterpart there.
    fn migrate(
        &mut self,
        operation: EngineOperation,
        origin_version_id: &str,
        target_version_id: &str,
        mapping: &[NodeMapping],
        case_ids: &[String],
    ) -> Result<(), EngineError> {
        let target = self.stored_definition(target_version_id)?;
        let target_nodes: AHashSet<&str> = target.nodes.iter().map(|n| n.id.as_str()).collect();

        let mut migrated = Vec::with_capacity(case_ids.len());
        for case_id in case_ids {
            let stored = self.stored(case_id)?;
            if stored.definition_version_id != origin_version_id {
                return Err(EngineError::operation(
                    operation,
                    format!(
                        "case '{}' runs on '{}', not on '{}'",
                        case_id, stored.definition_version_id, origin_version_id
                    ),
                ));
            }
            let mut active = AHashSet::with_capacity(stored.active_node_ids.len());
            for node_id in &stored.active_node_ids {
                let mapped = mapping
                    .iter()
                    .find(|m| &m.origin_node_id == node_id)
                    .map(|m| m.target_node_id.as_str())
                    .unwrap_or(node_id.as_str());
                if !target_nodes.contains(mapped) {
                    return Err(EngineError::operation(
                        operation,
                        format!(
                            "active node '{}' of case '{}' has no counterpart in '{}'",
                            node_id, case_id, target_version_id
                        ),
                    ));
                }
                active.insert(mapped.to_string());
            }
            migrated.push((case_id.clone(), active));
        }

        for (case_id, active) in migrated {
            let stored = self.stored_mut(&case_id)?;
            stored.definition_version_id = target_version_id.to_string();
            stored.active_node_ids = active;
        }
        Ok(())
    }
}

impl ExecutionEngine for InMemoryEngine {
    fn find_case(&self, case_id: &str) -> Result<Option<CaseRecord>, EngineError> {
        self.record(EngineOperation::FindCase, case_id)?;
        Ok(self.cases.get(case_id).map(|stored| CaseRecord {
            case_id: case_id.to_string(),
            definition_version_id: stored.definition_version_id.clone(),
            suspended: stored.suspended,
        }))
    }

    fn definition(
        &self,
        definition_version_id: &str,
    ) -> Result<Option<WorkflowDefinition>, EngineError> {
        self.record(EngineOperation::Definition, definition_version_id)?;
        Ok(self.definitions.get(definition_version_id).cloned())
    }

    fn suspend_case(&mut self, case_id: &str) -> Result<(), EngineError> {
        self.record(EngineOperation::SuspendCase, case_id)?;
        self.stored_mut(case_id)?.suspended = true;
        Ok(())
    }

    fn activate_case(&mut self, case_id: &str) -> Result<(), EngineError> {
        self.record(EngineOperation::ActivateCase, case_id)?;
        self.stored_mut(case_id)?.suspended = false;
        Ok(())
    }

    fn delete_case(&mut self, case_id: &str, reason: &str) -> Result<(), EngineError> {
        self.record(EngineOperation::DeleteCase, case_id)?;
        self.cases
            .remove(case_id)
            .ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))?;
        self.deleted_cases
            .push((case_id.to_string(), reason.to_string()));
        Ok(())
    }

    fn active_node_ids(&self, case_id: &str) -> Result<AHashSet<String>, EngineError> {
        self.record(EngineOperation::ActiveNodeIds, case_id)?;
        Ok(self.stored(case_id)?.active_node_ids.clone())
    }

    fn variables(&self, case_id: &str) -> Result<Variables, EngineError> {
        self.record(EngineOperation::Variables, case_id)?;
        Ok(self.stored(case_id)?.variables.clone())
    }

    fn start_case_at_node(
        &mut self,
        definition_version_id: &str,
        node_id: &str,
        variables: &Variables,
        position: StartPosition,
    ) -> Result<String, EngineError> {
        self.record(EngineOperation::StartCaseAtNode, node_id)?;
        let definition = self.stored_definition(definition_version_id)?;
        if !definition.nodes.iter().any(|n| n.id == node_id) {
            return Err(EngineError::operation(
                EngineOperation::StartCaseAtNode,
                format!("node '{}' not found in '{}'", node_id, definition_version_id),
            ));
        }
        let active: AHashSet<String> = match position {
            StartPosition::Before => [node_id.to_string()].into_iter().collect(),
            StartPosition::After => definition
                .edges
                .iter()
                .filter(|e| e.source == node_id)
                .map(|e| e.target.clone())
                .collect(),
        };
        Ok(self.spawn(definition_version_id, active, variables))
    }

    fn start_case_at_edge(
        &mut self,
        definition_version_id: &str,
        edge_id: &str,
        variables: &Variables,
    ) -> Result<String, EngineError> {
        self.record(EngineOperation::StartCaseAtEdge, edge_id)?;
        let definition = self.stored_definition(definition_version_id)?;
        let edge = definition
            .edges
            .iter()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| {
                EngineError::operation(
                    EngineOperation::StartCaseAtEdge,
                    format!("edge '{}' not found in '{}'", edge_id, definition_version_id),
                )
            })?;
        let active = [edge.target.clone()].into_iter().collect();
        Ok(self.spawn(definition_version_id, active, variables))
    }

    fn direct_migrate(
        &mut self,
        origin_version_id: &str,
        target_version_id: &str,
        case_ids: &[String],
    ) -> Result<(), EngineError> {
        self.record(EngineOperation::DirectMigrate, target_version_id)?;
        self.migrate(
            EngineOperation::DirectMigrate,
            origin_version_id,
            target_version_id,
            &[],
            case_ids,
        )
    }

    fn mapped_migrate(
        &mut self,
        origin_version_id: &str,
        target_version_id: &str,
        mapping: &[NodeMapping],
        case_ids: &[String],
    ) -> Result<(), EngineError> {
        self.record(EngineOperation::MappedMigrate, target_version_id)?;
        self.migrate(
            EngineOperation::MappedMigrate,
            origin_version_id,
            target_version_id,
            mapping,
            case_ids,
        )
    }

    fn deploy_definition(&mut self, resource: &[u8]) -> Result<Deployment, EngineError> {
        self.record(EngineOperation::DeployDefinition, "")?;
        let mut definition = WorkflowDefinition::from_slice(resource)
            .map_err(|e| EngineError::InvalidResource(e.to_string()))?;
        // Every deployment creates a fresh version, whatever the resource claims.
        definition.definition_version_id = self.next_version_id(&definition.name);
        let definition_version_id = definition.definition_version_id.clone();
        let deployment_id = self.next_deployment_id();

        self.deployments
            .insert(deployment_id.clone(), vec![definition_version_id.clone()]);
        self.definitions
            .insert(definition_version_id.clone(), definition.clone());

        Ok(Deployment {
            deployment_id,
            definition_version_id,
            definition,
        })
    }

    fn delete_deployment(&mut self, deployment_id: &str) -> Result<(), EngineError> {
        self.record(EngineOperation::DeleteDeployment, deployment_id)?;
        let versions = self
            .deployments
            .get(deployment_id)
            .ok_or_else(|| EngineError::DeploymentNotFound(deployment_id.to_string()))?;
        if let Some((case_id, _)) = self
            .cases
            .iter()
            .find(|(_, c)| versions.contains(&c.definition_version_id))
        {
            return Err(EngineError::operation(
                EngineOperation::DeleteDeployment,
                format!(
                    "deployment '{}' still has running case '{}'",
                    deployment_id, case_id
                ),
            ));
        }
        if let Some(versions) = self.deployments.remove(deployment_id) {
            for version in versions {
                self.definitions.remove(&version);
            }
        }
        Ok(())
    }
}
