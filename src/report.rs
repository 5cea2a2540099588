use crate::diff::NodeDelta;
use crate::graph::GraphNode;
use crate::planner::{MigrationDecision, PlanWarning};
use itertools::Itertools;

/// Formats deltas and decisions into human-readable text.
pub struct ReportFormatter;

impl ReportFormatter {
    /// One line per side of the delta, e.g. `- review (task)`.
    pub fn format_delta(delta: &NodeDelta) -> String {
        if delta.is_empty() {
            return "No node changes".to_string();
        }
        let removed = delta
            .removed_or_changed
            .iter()
            .map(|n| format!("- {}", Self::format_node(n)));
        let added = delta
            .added_or_changed
            .iter()
            .map(|n| format!("+ {}", Self::format_node(n)));
        removed.chain(added).join("\n")
    }

    pub fn format_decision(decision: &MigrationDecision, warnings: &[PlanWarning]) -> String {
        let mut result = format!("Decision: {}", decision);
        for warning in warnings {
            result.push_str(&format!("\nWarning: {}", warning));
        }
        result
    }

    fn format_node(node: &GraphNode) -> String {
        if node.display_name.is_empty() {
            format!("{} ({})", node.id, node.kind)
        } else {
            format!("{} \"{}\" ({})", node.id, node.display_name, node.kind)
        }
    }
}
