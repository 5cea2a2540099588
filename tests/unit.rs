//! Unit tests for definitions, graphs, configuration and formatting.
mod common;
use common::*;
use utsuri::error::{ConfigError, DefinitionConversionError};
use utsuri::graph::{ActivitySummary, KindRegistry};
use utsuri::prelude::*;

#[test]
fn test_definition_json_accepts_modeller_aliases() {
    let json = r#"{
        "id": "loan:3",
        "name": "loan",
        "nodes": [
            { "id": "apply", "name": "Apply", "type": "userTask" },
            { "id": "decide", "type": "exclusiveGateway" }
        ],
        "flows": [
            { "id": "f1", "sourceRef": "apply", "targetRef": "decide" }
        ]
    }"#;

    let definition = WorkflowDefinition::from_json(json).unwrap();
    assert_eq!(definition.definition_version_id, "loan:3");
    assert_eq!(definition.nodes[1].name, "");
    assert_eq!(definition.edges[0], EdgeDefinition::new("f1", "apply", "decide"));
}

#[test]
fn test_definition_json_error() {
    let result = WorkflowDefinition::from_json("{ nodes: ");
    assert!(matches!(
        result,
        Err(DefinitionConversionError::JsonParseError(_))
    ));
}

#[test]
fn test_builder_links_edges_in_declaration_order() {
    let g = graph(order_v1());
    let gw = g.node("gw").unwrap();
    assert_eq!(gw.kind, NodeKind::Gateway);
    assert_eq!(gw.incoming_edges, vec!["f2"]);
    assert_eq!(gw.outgoing_edges, vec!["f3", "f5"]);
    assert_eq!(g.first_incoming_edge("ship").map(|e| e.id.as_str()), Some("f3"));
    assert_eq!(g.first_incoming_edge("start"), None);
    assert_eq!(g.tasks().count(), 3);
}

#[test]
fn test_builder_rejects_duplicate_nodes() {
    let definition = order_v1().with_node(node("ship", "Ship again", "serviceTask"));
    let result = GraphBuilder::new(definition).build();
    assert_eq!(result.unwrap_err(), GraphError::DuplicateNode("ship".to_string()));
}

#[test]
fn test_builder_rejects_dangling_edges() {
    let definition = order_v1().with_edge(flow("f9", "ship", "archive"));
    let result = GraphBuilder::new(definition).build();
    assert_eq!(
        result.unwrap_err(),
        GraphError::NodeNotFound {
            missing_node_id: "archive".to_string(),
            edge_id: "f9".to_string(),
        }
    );
}

#[test]
fn test_empty_graph_is_not_workable() {
    let g = graph(order_v2_empty());
    assert_eq!(
        g.ensure_workable(),
        Err(GraphError::GraphEmpty("order:2".to_string()))
    );
}

#[test]
fn test_call_activities_alone_are_not_workable() {
    let definition = WorkflowDefinition::new("calls:1", "calls")
        .with_node(node("start", "Start", "startEvent"))
        .with_node(node("billing", "Billing", "callActivity"))
        .with_edge(flow("f1", "start", "billing"));
    let g = graph(definition);

    assert!(matches!(g.ensure_workable(), Err(GraphError::GraphEmpty(_))));
    assert!(DefinitionSummary::from(&g).activities.is_empty());
}

#[test]
fn test_load_graph_from_engine() {
    let engine = engine_with_case(&["review"]);
    let g = load_graph(&engine, ORIGIN_VERSION).unwrap();
    assert_eq!(g.nodes().len(), 6);

    let missing = load_graph(&engine, "order:9").unwrap_err();
    assert_eq!(
        missing,
        GraphError::Engine(EngineError::DefinitionNotFound("order:9".to_string()))
    );
}

#[test]
fn test_kind_registry() {
    let registry = KindRegistry::new().with_type_mapping("approval", NodeKind::Task);
    assert_eq!(registry.classify("userTask"), NodeKind::Task);
    assert_eq!(registry.classify("parallelGateway"), NodeKind::Gateway);
    assert_eq!(registry.classify("boundaryEvent"), NodeKind::Event);
    assert_eq!(registry.classify("approval"), NodeKind::Task);
    assert_eq!(registry.classify("escalationTask"), NodeKind::Task);
    assert_eq!(registry.classify("subProcess"), NodeKind::Other);
    assert_eq!(registry.classify("callActivity"), NodeKind::Other);
    assert_eq!(registry.classify("textAnnotation"), NodeKind::Other);
}

#[test]
fn test_custom_type_mapping_on_builder() {
    let definition = WorkflowDefinition::new("x:1", "x").with_node(node("a", "A", "approval"));
    let g = GraphBuilder::new(definition)
        .with_type_mapping("approval", NodeKind::Task)
        .build()
        .unwrap();
    assert!(g.node("a").unwrap().is_task());
}

struct Checklist {
    version: String,
    steps: Vec<(String, String)>,
}

impl IntoDefinition for Checklist {
    fn into_definition(self) -> Result<WorkflowDefinition, DefinitionConversionError> {
        if self.steps.is_empty() {
            return Err(DefinitionConversionError::ValidationError(
                "checklist has no steps".to_string(),
            ));
        }
        let mut definition = WorkflowDefinition::new(self.version, "checklist");
        let mut previous: Option<String> = None;
        for (index, (key, label)) in self.steps.into_iter().enumerate() {
            if let Some(previous) = previous.take() {
                definition
                    .edges
                    .push(flow(&format!("s{}", index), &previous, &key));
            }
            definition.nodes.push(NodeDefinition::new(key.clone(), label, "userTask"));
            previous = Some(key);
        }
        Ok(definition)
    }
}

#[test]
fn test_custom_format_via_into_definition() {
    let checklist = Checklist {
        version: "checklist:1".to_string(),
        steps: vec![
            ("pack".to_string(), "Pack".to_string()),
            ("label".to_string(), "Label".to_string()),
        ],
    };
    let g = WorkflowGraph::from_source(checklist).unwrap();
    assert_eq!(g.tasks().count(), 2);
    assert_eq!(g.first_incoming_edge("label").map(|e| e.id.as_str()), Some("s1"));

    let empty = Checklist {
        version: "checklist:2".to_string(),
        steps: Vec::new(),
    };
    assert!(matches!(
        WorkflowGraph::from_source(empty),
        Err(GraphError::Conversion(_))
    ));
}

#[test]
fn test_definition_summary_lists_tasks_only() {
    let summary = DefinitionSummary::from(&graph(order_v1()));
    assert_eq!(summary.definition_version_id, ORIGIN_VERSION);
    assert_eq!(summary.definition_name, "order");
    assert_eq!(
        summary.activities,
        vec![
            ActivitySummary {
                activity_id: "review".to_string(),
                activity_name: "Review order".to_string(),
            },
            ActivitySummary {
                activity_id: "ship".to_string(),
                activity_name: "Ship".to_string(),
            },
            ActivitySummary {
                activity_id: "reject".to_string(),
                activity_name: "Reject".to_string(),
            },
        ]
    );
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["activities"][0]["activityId"], "review");
}

#[test]
fn test_graph_snapshot_bytes() {
    let g = graph(order_v1());
    let bytes = GraphSnapshot::new(g.clone()).to_bytes().unwrap();
    let restored = GraphSnapshot::from_bytes(&bytes).unwrap().into_graph();
    assert_eq!(restored, g);
    assert!(restored.contains_edge("f5"));

    assert!(GraphSnapshot::from_bytes(&[0xff, 0x00]).is_err());
}

#[test]
fn test_graph_snapshot_file() {
    let path = std::env::temp_dir().join(format!("utsuri-snapshot-{}.graph", std::process::id()));
    let g = graph(order_v2_ship_replaced());
    GraphSnapshot::new(g.clone()).save(&path).unwrap();
    let restored = GraphSnapshot::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(restored.graph, g);
}

#[test]
fn test_config_defaults() {
    let config = MigrationConfig::from_toml_str("").unwrap();
    assert_eq!(config, MigrationConfig::default());
    assert_eq!(config.termination_reason, "migrated");
    assert!(config.activate_after_migration);
    assert!(!config.reactivate_on_abort);
    assert_eq!(config.planner_options().tie_break, TieBreakPolicy::FirstMatch);
}

#[test]
fn test_config_from_toml() {
    let config = MigrationConfig::from_toml_str(
        r#"
        tie-break = "reject"
        identity = "element-type"
        termination-reason = "Process Migrated"
        reactivate-on-abort = true
        "#,
    )
    .unwrap();
    assert_eq!(config.tie_break, TieBreakPolicy::Reject);
    assert_eq!(config.identity, NodeIdentity::ElementType);
    assert_eq!(config.termination_reason, "Process Migrated");
    assert!(config.reactivate_on_abort);
}

#[test]
fn test_config_errors() {
    assert!(matches!(
        MigrationConfig::from_toml_str(r#"tie-break = "coin-flip""#),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        MigrationConfig::from_file("/nonexistent/utsuri.toml"),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn test_error_display() {
    let err = MigrationError::AmbiguousRelocation {
        candidates: vec!["ship".to_string(), "reject".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "Relocation is ambiguous between active nodes [ship, reject]"
    );

    let err: MigrationError = GraphError::GraphEmpty("order:2".to_string()).into();
    assert_eq!(err, MigrationError::GraphEmpty("order:2".to_string()));

    let err: MigrationError = GraphError::DuplicateNode("a".to_string()).into();
    assert_eq!(
        err.to_string(),
        "Invalid workflow graph: Node 'a' is declared more than once"
    );
}

#[test]
fn test_entry_point_serialization() {
    let entry = EntryPoint::Transition {
        edge_id: "f1".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&entry).unwrap(),
        serde_json::json!({ "type": "transition", "edgeId": "f1" })
    );
}

#[test]
fn test_decision_report() {
    let decision = MigrationDecision::MappedMigrate {
        origin_node_id: "ship".to_string(),
        target_node_id: "ship".to_string(),
    };
    let warnings = [PlanWarning::AmbiguousRelocation {
        candidates: vec!["ship".to_string(), "reject".to_string()],
        chosen: "ship".to_string(),
    }];
    assert_eq!(
        ReportFormatter::format_decision(&decision, &warnings),
        "Decision: mapped migration 'ship' -> 'ship'\n\
         Warning: 2 active nodes changed ([ship, reject]), planning for 'ship'"
    );
}
