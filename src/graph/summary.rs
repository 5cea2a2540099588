use super::WorkflowGraph;
use serde::{Deserialize, Serialize};

/// A task of a definition, as listed to operators choosing a relocation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub activity_id: String,
    pub activity_name: String,
}

/// Serializable extract of a definition version and its task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSummary {
    pub definition_version_id: String,
    pub definition_name: String,
    pub activities: Vec<ActivitySummary>,
}

impl From<&WorkflowGraph> for DefinitionSummary {
    fn from(graph: &WorkflowGraph) -> Self {
        Self {
            definition_version_id: graph.definition_version_id().to_string(),
            definition_name: graph.name().to_string(),
            activities: graph
                .tasks()
                .map(|task| ActivitySummary {
                    activity_id: task.id.clone(),
                    activity_name: task.display_name.clone(),
                })
                .collect(),
        }
    }
}
