//! Structural node comparison between two versions of a workflow graph.
//!
//! Edges are never inspected here; only the relocator looks at them.

use crate::graph::{GraphNode, WorkflowGraph};
use serde::{Deserialize, Serialize};

/// Which attributes must be identical for two nodes to count as the same node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeIdentity {
    /// `id`, `display_name` and `kind`.
    #[default]
    Kind,
    /// As `Kind`, and the modeller element name must match too.
    ElementType,
}

impl NodeIdentity {
    pub fn matches(self, a: &GraphNode, b: &GraphNode) -> bool {
        let same = a.id == b.id && a.display_name == b.display_name && a.kind == b.kind;
        match self {
            NodeIdentity::Kind => same,
            NodeIdentity::ElementType => same && a.element_type == b.element_type,
        }
    }
}

/// Nodes without an equal counterpart on the other side.
///
/// Each side keeps the node order of the graph it was taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDelta {
    /// Origin nodes with no equal node in the target.
    pub removed_or_changed: Vec<GraphNode>,
    /// Target nodes with no equal node in the origin.
    pub added_or_changed: Vec<GraphNode>,
}

impl NodeDelta {
    /// Both graphs hold exactly the same nodes.
    pub fn is_empty(&self) -> bool {
        self.removed_or_changed.is_empty() && self.added_or_changed.is_empty()
    }

    /// Nothing from the origin changed; the target may only add nodes.
    pub fn is_additions_only(&self) -> bool {
        self.removed_or_changed.is_empty()
    }

    pub fn removed_or_changed_node(&self, id: &str) -> Option<&GraphNode> {
        self.removed_or_changed.iter().find(|n| n.id == id)
    }

    pub fn added_or_changed_node(&self, id: &str) -> Option<&GraphNode> {
        self.added_or_changed.iter().find(|n| n.id == id)
    }
}

/// Compares two graphs under the default identity rule.
pub fn diff(origin: &WorkflowGraph, target: &WorkflowGraph) -> NodeDelta {
    diff_with(origin, target, NodeIdentity::default())
}

/// Compares two graphs. O(|origin| * |target|), fine for human-authored diagrams.
pub fn diff_with(origin: &WorkflowGraph, target: &WorkflowGraph, identity: NodeIdentity) -> NodeDelta {
    NodeDelta {
        removed_or_changed: unmatched(origin, target, identity),
        added_or_changed: unmatched(target, origin, identity),
    }
}

fn unmatched(from: &WorkflowGraph, other: &WorkflowGraph, identity: NodeIdentity) -> Vec<GraphNode> {
    from.nodes()
        .iter()
        .filter(|node| !other.nodes().iter().any(|o| identity.matches(node, o)))
        .cloned()
        .collect()
}
