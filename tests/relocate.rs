//! Tests for entry point resolution and case relocation.
mod common;
use common::*;
use utsuri::engine::EngineOperation;
use utsuri::prelude::*;

/// Baseline engine plus a deployed `target`, returning the engine and the target graph.
fn engine_with_target(target: WorkflowDefinition, active: &[&str]) -> (InMemoryEngine, WorkflowGraph) {
    let mut engine = engine_with_case(active);
    engine.register_definition(target.clone());
    (engine, graph(target))
}

fn variables_of(engine: &InMemoryEngine, case_id: &str) -> Variables {
    engine
        .case(case_id)
        .map(|c| c.variables)
        .expect("case should be live")
}

#[test]
fn test_resolve_rules() {
    let origin = graph(order_v1());

    let before = Relocator::resolve(&origin, &graph(order_v2_ship_replaced()), "ship").unwrap();
    assert_eq!(before, EntryPoint::BeforeNode { node_id: "gw".to_string() });

    let after =
        Relocator::resolve(&origin, &graph(order_v2_ship_replaced_with_join()), "ship").unwrap();
    assert_eq!(after, EntryPoint::AfterNode { node_id: "gw".to_string() });

    let transition =
        Relocator::resolve(&origin, &graph(order_v2_review_replaced()), "review").unwrap();
    assert_eq!(transition, EntryPoint::Transition { edge_id: "f1".to_string() });
}

#[test]
fn test_resolve_fails_for_node_without_incoming_edge() {
    let origin = graph(order_v1());
    let result = Relocator::resolve(&origin, &origin, "start");
    assert_eq!(
        result,
        Err(MigrationError::NoRelocationPoint {
            node_id: "start".to_string()
        })
    );
}

#[test]
fn test_relocate_before_gateway() {
    let (mut engine, target) = engine_with_target(order_v2_ship_replaced(), &["ship"]);
    let variables = variables_of(&engine, "c1");
    let entry = EntryPoint::BeforeNode { node_id: "gw".to_string() };

    let new_case_id = Relocator::default()
        .relocate(&mut engine, &target, &entry, &variables, "c1")
        .unwrap();

    let relocated = engine.case(&new_case_id).expect("replacement should be live");
    assert_eq!(relocated.definition_version_id, "order:2");
    assert!(relocated.is_active("gw"));
    assert_eq!(relocated.variables.get("amount"), Some(&serde_json::json!(120)));
    assert!(!engine.is_live("c1"));
    assert_eq!(
        engine.deleted_cases(),
        &[("c1".to_string(), "migrated".to_string())]
    );
}

#[test]
fn test_relocate_after_joining_gateway_takes_outgoing_flows() {
    let (mut engine, target) = engine_with_target(order_v2_ship_replaced_with_join(), &["ship"]);
    let variables = variables_of(&engine, "c1");
    let entry = EntryPoint::AfterNode { node_id: "gw".to_string() };

    let new_case_id = Relocator::default()
        .relocate(&mut engine, &target, &entry, &variables, "c1")
        .unwrap();

    let relocated = engine.case(&new_case_id).unwrap();
    assert!(relocated.is_active("dispatch"));
    assert!(relocated.is_active("reject"));
    assert!(!relocated.is_active("gw"));
}

#[test]
fn test_relocate_from_uses_incoming_transition() {
    let (mut engine, target) = engine_with_target(order_v2_review_replaced(), &["review"]);
    let origin = graph(order_v1());
    let variables = variables_of(&engine, "c1");

    let new_case_id = Relocator::new("Process Migrated")
        .relocate_from(&mut engine, &origin, &target, "review", &variables, "c1")
        .unwrap();

    assert!(engine.case(&new_case_id).unwrap().is_active("check"));
    assert_eq!(
        engine.deleted_cases(),
        &[("c1".to_string(), "Process Migrated".to_string())]
    );
    assert_eq!(
        engine.operations(),
        vec![EngineOperation::StartCaseAtEdge, EngineOperation::DeleteCase]
    );
}

#[test]
fn test_failed_start_leaves_original_untouched() {
    let (mut engine, target) = engine_with_target(order_v2_ship_replaced(), &["ship"]);
    engine.fail_on(EngineOperation::StartCaseAtNode);
    let variables = variables_of(&engine, "c1");
    let entry = EntryPoint::BeforeNode { node_id: "gw".to_string() };

    let result = Relocator::default().relocate(&mut engine, &target, &entry, &variables, "c1");

    assert!(matches!(result, Err(MigrationError::Engine(_))));
    assert!(engine.is_live("c1"));
    assert_eq!(engine.live_case_count(), 1);
    assert!(!engine.operations().contains(&EngineOperation::DeleteCase));
}

#[test]
fn test_failed_delete_discards_replacement() {
    let (mut engine, target) = engine_with_target(order_v2_ship_replaced(), &["ship"]);
    engine.fail_next(EngineOperation::DeleteCase);
    let variables = variables_of(&engine, "c1");
    let entry = EntryPoint::BeforeNode { node_id: "gw".to_string() };

    let result = Relocator::default().relocate(&mut engine, &target, &entry, &variables, "c1");

    assert!(matches!(
        result,
        Err(MigrationError::Engine(EngineError::Operation {
            operation: EngineOperation::DeleteCase,
            ..
        }))
    ));
    assert!(engine.is_live("c1"));
    assert_eq!(engine.live_case_count(), 1);
    assert_eq!(
        engine.deleted_cases(),
        &[("case-1".to_string(), "relocation rolled back".to_string())]
    );
}

#[test]
fn test_failed_compensation_reports_open_window() {
    let (mut engine, target) = engine_with_target(order_v2_ship_replaced(), &["ship"]);
    engine.fail_on(EngineOperation::DeleteCase);
    let variables = variables_of(&engine, "c1");
    let entry = EntryPoint::BeforeNode { node_id: "gw".to_string() };

    let result = Relocator::default().relocate(&mut engine, &target, &entry, &variables, "c1");

    assert_eq!(
        result,
        Err(MigrationError::RelocationWindowOpen {
            origin_case_id: "c1".to_string(),
            new_case_id: "case-1".to_string(),
        })
    );
    assert_eq!(engine.live_case_count(), 2);
}

#[test]
fn test_entry_point_outside_target_is_rejected_without_engine_calls() {
    let (mut engine, target) = engine_with_target(order_v2_ship_replaced(), &["ship"]);
    let variables = variables_of(&engine, "c1");
    let entry = EntryPoint::Transition { edge_id: "f99".to_string() };

    let result = Relocator::default().relocate(&mut engine, &target, &entry, &variables, "c1");

    assert_eq!(
        result,
        Err(MigrationError::NoRelocationPoint {
            node_id: "f99".to_string()
        })
    );
    assert!(engine.operations().is_empty());
}
