use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use utsuri::prelude::*;

/// Plans and simulates live migrations of workflow cases between definition versions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML migration config
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the task summary of a definition
    Inspect {
        /// Definition JSON or compiled `.graph` snapshot
        definition: String,
    },
    /// Show which nodes were removed, added or changed between two versions
    Diff { origin: String, target: String },
    /// Decide how a case standing on the given nodes would be migrated
    Plan {
        origin: String,
        target: String,
        /// Ids of the nodes the case is currently active on
        #[arg(short, long = "active", required = true)]
        active: Vec<String>,
    },
    /// Run a full migration attempt against an in-memory engine
    Simulate {
        /// Origin definition JSON
        origin: String,
        /// Target definition JSON, deployed as-is
        target: String,
        /// Case snapshot JSON (`caseId`, `activeNodeIds`, `variables`)
        case: String,
    },
    /// Build a definition into a graph snapshot
    Compile {
        definition: String,
        /// Output path of the snapshot
        #[arg(short, long)]
        output: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MigrationConfig::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load config '{}': {}", path, e))
        }),
        None => MigrationConfig::default(),
    };

    match cli.command {
        Command::Inspect { definition } => run_inspect(&definition),
        Command::Diff { origin, target } => run_diff(&origin, &target, &config),
        Command::Plan {
            origin,
            target,
            active,
        } => run_plan(&origin, &target, active, &config),
        Command::Simulate {
            origin,
            target,
            case,
        } => run_simulate(&origin, &target, &case, config),
        Command::Compile { definition, output } => run_compile(&definition, &output),
    }
}

fn run_inspect(path: &str) {
    let graph = load_graph_file(path);
    let summary = DefinitionSummary::from(&graph);
    println!("{}", to_pretty_json(&summary));
}

fn run_diff(origin_path: &str, target_path: &str, config: &MigrationConfig) {
    let origin = load_graph_file(origin_path);
    let target = load_graph_file(target_path);
    let delta = diff_with(&origin, &target, config.identity);
    println!("{}", ReportFormatter::format_delta(&delta));
}

fn run_plan(origin_path: &str, target_path: &str, active: Vec<String>, config: &MigrationConfig) {
    let origin = load_graph_file(origin_path);
    let target = load_graph_file(target_path);
    let case = RunningCase::new("cli", origin.definition_version_id()).with_active(active);

    let delta = diff_with(&origin, &target, config.identity);
    let outcome = Planner::new(config.planner_options()).evaluate(&origin, &target, &delta, &case);

    println!("{}", ReportFormatter::format_delta(&delta));
    println!();
    println!(
        "{}",
        ReportFormatter::format_decision(&outcome.decision, &outcome.warnings)
    );
}

fn run_simulate(origin_path: &str, target_path: &str, case_path: &str, config: MigrationConfig) {
    let total_start = Instant::now();

    let origin = WorkflowDefinition::from_json(&read_file(origin_path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse '{}': {}", origin_path, e)));
    let resource = fs::read(target_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read target '{}': {}", target_path, e))
    });
    let mut case: RunningCase = serde_json::from_str(&read_file(case_path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse case JSON: {}", e)));

    let mut engine = InMemoryEngine::new();
    case.definition_version_id = engine.register_definition(origin);
    let case_id = case.case_id.clone();
    engine.insert_case(case);

    let mut orchestrator = MigrationOrchestrator::new(engine).with_config(config);
    let outcome = orchestrator.migrate_case(&case_id, &resource);

    println!("{}", to_pretty_json(&outcome));
    match (&outcome.status, &outcome.resulting_case_id) {
        (MigrationStatus::Committed, Some(resulting)) => {
            eprintln!("  -> Committed, case now runs as '{}'", resulting)
        }
        _ => eprintln!(
            "  -> Aborted: {}",
            outcome.reason.as_deref().unwrap_or("unknown reason")
        ),
    }
    eprintln!("Total Execution: {:?}", total_start.elapsed());
}

fn run_compile(path: &str, output: &str) {
    let start = Instant::now();
    let graph = load_graph_file(path);
    let tasks = graph.tasks().count();
    GraphSnapshot::new(graph)
        .save(output)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write snapshot: {}", e)));
    println!(
        "Compiled '{}' ({} tasks) into '{}' in {:?}",
        path,
        tasks,
        output,
        start.elapsed()
    );
}

/// Loads a graph from a definition JSON file, or from a `.graph` snapshot.
///
/// Graphs without task nodes are rejected, as they are during a migration.
fn load_graph_file(path: &str) -> WorkflowGraph {
    let graph = if Path::new(path).extension().is_some_and(|ext| ext == "graph") {
        GraphSnapshot::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load snapshot: {}", e)))
            .into_graph()
    } else {
        let definition = WorkflowDefinition::from_json(&read_file(path))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse '{}': {}", path, e)));
        GraphBuilder::new(definition)
            .build()
            .unwrap_or_else(|e| exit_with_error(&format!("Invalid definition '{}': {}", path, e)))
    };
    graph
        .ensure_workable()
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid definition '{}': {}", path, e)));
    graph
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read file '{}': {}", path, e)))
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize output: {}", e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
