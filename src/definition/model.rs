use crate::error::DefinitionConversionError;
use serde::{Deserialize, Serialize};

/// The canonical, format-agnostic description of one workflow definition version.
///
/// This is what the engine stores and what a deployment resource decodes into.
/// Graph construction and validation happen later, in `GraphBuilder`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Stable id of this revision. May be empty in a deployment resource, in
    /// which case the engine assigns one.
    #[serde(default, alias = "id")]
    pub definition_version_id: String,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default, alias = "flows")]
    pub edges: Vec<EdgeDefinition>,
}

/// A single flow node (task, gateway, event, ...) as declared by the modeller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Modeller element name, e.g. `userTask` or `exclusiveGateway`.
    #[serde(alias = "type")]
    pub element_type: String,
}

/// A directed transition between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub id: String,
    #[serde(alias = "sourceRef")]
    pub source: String,
    #[serde(alias = "targetRef")]
    pub target: String,
}

impl NodeDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        element_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element_type: element_type.into(),
        }
    }
}

impl EdgeDefinition {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

impl WorkflowDefinition {
    pub fn new(definition_version_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            definition_version_id: definition_version_id.into(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: EdgeDefinition) -> Self {
        self.edges.push(edge);
        self
    }

    /// Parses a definition from its JSON resource representation.
    pub fn from_json(json: &str) -> Result<Self, DefinitionConversionError> {
        serde_json::from_str(json)
            .map_err(|e| DefinitionConversionError::JsonParseError(e.to_string()))
    }

    /// Parses a definition from raw resource bytes, as uploaded for a deployment.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DefinitionConversionError> {
        serde_json::from_slice(bytes)
            .map_err(|e| DefinitionConversionError::JsonParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DefinitionConversionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DefinitionConversionError::ValidationError(e.to_string()))
    }
}
