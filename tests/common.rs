//! Common test utilities for building definitions, graphs and engines.
#![allow(dead_code)]
use utsuri::prelude::*;

pub const ORIGIN_VERSION: &str = "order:1";

pub fn node(id: &str, name: &str, element_type: &str) -> NodeDefinition {
    NodeDefinition::new(id, name, element_type)
}

pub fn flow(id: &str, source: &str, target: &str) -> EdgeDefinition {
    EdgeDefinition::new(id, source, target)
}

/// The baseline order process.
///
/// ```text
/// start -f1-> review -f2-> gw -f3-> ship   -f4-> end
///                            \-f5-> reject -f6-> end
/// ```
pub fn order_v1() -> WorkflowDefinition {
    WorkflowDefinition::new(ORIGIN_VERSION, "order")
        .with_node(node("start", "Order received", "startEvent"))
        .with_node(node("review", "Review order", "userTask"))
        .with_node(node("gw", "Approved?", "exclusiveGateway"))
        .with_node(node("ship", "Ship", "serviceTask"))
        .with_node(node("reject", "Reject", "userTask"))
        .with_node(node("end", "Done", "endEvent"))
        .with_edge(flow("f1", "start", "review"))
        .with_edge(flow("f2", "review", "gw"))
        .with_edge(flow("f3", "gw", "ship"))
        .with_edge(flow("f4", "ship", "end"))
        .with_edge(flow("f5", "gw", "reject"))
        .with_edge(flow("f6", "reject", "end"))
}

/// Baseline plus a notification task after shipping. Nothing existing changes.
pub fn order_v2_with_notification() -> WorkflowDefinition {
    let mut definition = order_v1();
    definition.definition_version_id = "order:2".to_string();
    definition.nodes.push(node("notify", "Notify customer", "sendTask"));
    definition.edges.retain(|e| e.id != "f4");
    definition.edges.push(flow("f4", "ship", "notify"));
    definition.edges.push(flow("f7", "notify", "end"));
    definition
}

/// Baseline with one node renamed.
pub fn order_v2_renamed(node_id: &str, new_name: &str) -> WorkflowDefinition {
    let mut definition = order_v1();
    definition.definition_version_id = "order:2".to_string();
    for n in definition.nodes.iter_mut().filter(|n| n.id == node_id) {
        n.name = new_name.to_string();
    }
    definition
}

/// Baseline with `ship` replaced by a new `dispatch` task on the same edges.
pub fn order_v2_ship_replaced() -> WorkflowDefinition {
    replace_node(order_v1(), "ship", node("dispatch", "Dispatch", "serviceTask"))
}

/// As `order_v2_ship_replaced`, plus a `rework` loop that joins into `gw`.
pub fn order_v2_ship_replaced_with_join() -> WorkflowDefinition {
    order_v2_ship_replaced()
        .with_node(node("rework", "Rework order", "userTask"))
        .with_edge(flow("f8", "rework", "gw"))
}

/// Baseline with `review` replaced by a new `check` task on the same edges.
pub fn order_v2_review_replaced() -> WorkflowDefinition {
    replace_node(order_v1(), "review", node("check", "Check order", "userTask"))
}

/// A revision that has no task nodes left.
pub fn order_v2_empty() -> WorkflowDefinition {
    WorkflowDefinition::new("order:2", "order")
        .with_node(node("start", "Order received", "startEvent"))
        .with_node(node("end", "Done", "endEvent"))
        .with_edge(flow("f1", "start", "end"))
}

fn replace_node(
    mut definition: WorkflowDefinition,
    old_id: &str,
    replacement: NodeDefinition,
) -> WorkflowDefinition {
    definition.definition_version_id = "order:2".to_string();
    for n in definition.nodes.iter_mut().filter(|n| n.id == old_id) {
        *n = replacement.clone();
    }
    for e in definition.edges.iter_mut() {
        if e.source == old_id {
            e.source = replacement.id.clone();
        }
        if e.target == old_id {
            e.target = replacement.id.clone();
        }
    }
    definition
}

pub fn graph(definition: WorkflowDefinition) -> WorkflowGraph {
    GraphBuilder::new(definition)
        .build()
        .expect("Failed to build graph")
}

pub fn case_on(active: &[&str]) -> RunningCase {
    RunningCase::new("c1", ORIGIN_VERSION).with_active(active.iter().copied())
}

/// Plans a migration of a case standing on `active` from the baseline to `target`.
pub fn plan_against(target: WorkflowDefinition, active: &[&str]) -> MigrationDecision {
    let origin = graph(order_v1());
    let target = graph(target);
    let delta = diff(&origin, &target);
    plan(&origin, &target, &delta, &case_on(active))
}

/// An engine holding the baseline and one case `c1` with a single variable.
pub fn engine_with_case(active: &[&str]) -> InMemoryEngine {
    InMemoryEngine::new()
        .with_definition(order_v1())
        .with_case(case_on(active).with_variable("amount", serde_json::json!(120)))
}

/// Serializes a definition the way it is handed to a deployment.
pub fn resource(definition: &WorkflowDefinition) -> Vec<u8> {
    serde_json::to_vec(definition).expect("Failed to serialize definition")
}
