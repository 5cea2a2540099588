//! Read-only, typed projection of a workflow definition version.
//!
//! A `WorkflowGraph` is built once per definition version and never mutated
//! afterwards. During a migration the origin and target graphs coexist and are
//! only ever read.

use crate::definition::IntoDefinition;
use crate::engine::ExecutionEngine;
use crate::error::{EngineError, GraphError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

mod builder;
pub mod kind;
pub mod snapshot;
pub mod summary;

pub use builder::GraphBuilder;
pub use kind::{KindRegistry, NodeKind};
pub use snapshot::GraphSnapshot;
pub use summary::{ActivitySummary, DefinitionSummary};

/// A node of one graph version. Identity is its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub display_name: String,
    pub kind: NodeKind,
    /// The modeller element name the kind was derived from.
    pub element_type: String,
    /// Ids of incoming edges, in declaration order.
    pub incoming_edges: Vec<String>,
    /// Ids of outgoing edges, in declaration order.
    pub outgoing_edges: Vec<String>,
}

impl GraphNode {
    pub fn is_task(&self) -> bool {
        self.kind == NodeKind::Task
    }

    pub fn first_incoming_edge(&self) -> Option<&str> {
        self.incoming_edges.first().map(String::as_str)
    }
}

/// A directed transition, owned by the graph that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphParts {
    definition_version_id: String,
    name: String,
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
}

/// Ordered node set plus edge set of one definition version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphParts", into = "GraphParts")]
pub struct WorkflowGraph {
    definition_version_id: String,
    name: String,
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
    node_index: AHashMap<String, usize>,
    edge_index: AHashMap<String, usize>,
}

impl TryFrom<GraphParts> for WorkflowGraph {
    type Error = GraphError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        WorkflowGraph::from_parts(
            parts.definition_version_id,
            parts.name,
            parts.nodes,
            parts.edges,
        )
    }
}

impl From<WorkflowGraph> for GraphParts {
    fn from(graph: WorkflowGraph) -> Self {
        GraphParts {
            definition_version_id: graph.definition_version_id,
            name: graph.name,
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

impl WorkflowGraph {
    pub fn builder(definition: crate::definition::WorkflowDefinition) -> GraphBuilder {
        GraphBuilder::new(definition)
    }

    /// Converts any custom format and builds it with the default kind registry.
    pub fn from_source(source: impl IntoDefinition) -> Result<Self, GraphError> {
        GraphBuilder::new(source.into_definition()?).build()
    }

    /// Assembles a graph from already typed parts, indexing nodes and edges.
    ///
    /// Rejects duplicate ids and edges that point at unknown nodes.
    pub(crate) fn from_parts(
        definition_version_id: String,
        name: String,
        nodes: Vec<GraphNode>,
        edges: Vec<Edge>,
    ) -> Result<Self, GraphError> {
        let mut node_index = AHashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), position).is_some() {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let mut edge_index = AHashMap::with_capacity(edges.len());
        for (position, edge) in edges.iter().enumerate() {
            if edge_index.insert(edge.id.clone(), position).is_some() {
                return Err(GraphError::DuplicateEdge(edge.id.clone()));
            }
            for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                if !node_index.contains_key(endpoint) {
                    return Err(GraphError::NodeNotFound {
                        missing_node_id: endpoint.clone(),
                        edge_id: edge.id.clone(),
                    });
                }
            }
        }

        Ok(Self {
            definition_version_id,
            name,
            nodes,
            edges,
            node_index,
            edge_index,
        })
    }

    pub fn definition_version_id(&self) -> &str {
        &self.definition_version_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_index.contains_key(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.is_task())
    }

    /// The first incoming edge of a node, if the node exists and has one.
    pub fn first_incoming_edge(&self, node_id: &str) -> Option<&Edge> {
        self.node(node_id)
            .and_then(GraphNode::first_incoming_edge)
            .and_then(|edge_id| self.edge(edge_id))
    }

    /// Fails with `GraphEmpty` when the graph has no task node to migrate into or out of.
    pub fn ensure_workable(&self) -> Result<(), GraphError> {
        if self.tasks().next().is_none() {
            return Err(GraphError::GraphEmpty(self.definition_version_id.clone()));
        }
        Ok(())
    }
}

/// Loads the stored definition of a version from the engine and projects it into a graph.
///
/// Fails with `GraphError::GraphEmpty` if the version contains zero task nodes.
pub fn load_graph<E: ExecutionEngine + ?Sized>(
    engine: &E,
    definition_version_id: &str,
) -> Result<WorkflowGraph, GraphError> {
    let definition = engine
        .definition(definition_version_id)?
        .ok_or_else(|| EngineError::DefinitionNotFound(definition_version_id.to_string()))?;
    let graph = GraphBuilder::new(definition).build()?;
    graph.ensure_workable()?;
    Ok(graph)
}
