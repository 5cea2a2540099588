use super::{Edge, GraphNode, KindRegistry, NodeKind, WorkflowGraph};
use crate::definition::WorkflowDefinition;
use crate::error::GraphError;
use ahash::AHashMap;

/// Builds a typed `WorkflowGraph` from a `WorkflowDefinition`.
pub struct GraphBuilder {
    definition: WorkflowDefinition,
    registry: KindRegistry,
}

impl GraphBuilder {
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self {
            definition,
            registry: KindRegistry::default(),
        }
    }

    pub fn with_type_mapping(mut self, element_type: &str, kind: NodeKind) -> Self {
        self.registry = self.registry.with_type_mapping(element_type, kind);
        self
    }

    pub fn with_registry(mut self, registry: KindRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<WorkflowGraph, GraphError> {
        let WorkflowDefinition {
            definition_version_id,
            name,
            nodes,
            edges,
        } = self.definition;

        // node id -> (incoming, outgoing), filled in edge declaration order
        let mut connections: AHashMap<&str, (Vec<String>, Vec<String>)> = AHashMap::new();
        for edge in &edges {
            connections
                .entry(edge.target.as_str())
                .or_default()
                .0
                .push(edge.id.clone());
            connections
                .entry(edge.source.as_str())
                .or_default()
                .1
                .push(edge.id.clone());
        }

        let graph_nodes = nodes
            .iter()
            .map(|node| {
                let (incoming_edges, outgoing_edges) = connections
                    .remove(node.id.as_str())
                    .unwrap_or_default();
                GraphNode {
                    id: node.id.clone(),
                    display_name: node.name.clone(),
                    kind: self.registry.classify(&node.element_type),
                    element_type: node.element_type.clone(),
                    incoming_edges,
                    outgoing_edges,
                }
            })
            .collect();

        let graph_edges = edges
            .iter()
            .map(|edge| Edge {
                id: edge.id.clone(),
                source_node_id: edge.source.clone(),
                target_node_id: edge.target.clone(),
            })
            .collect();

        WorkflowGraph::from_parts(definition_version_id, name, graph_nodes, graph_edges)
    }
}
