use crate::engine::EngineOperation;
use thiserror::Error;

/// Errors raised by the execution engine collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Case '{0}' is not known to the engine")]
    CaseNotFound(String),

    #[error("Definition version '{0}' is not known to the engine")]
    DefinitionNotFound(String),

    #[error("Deployment '{0}' is not known to the engine")]
    DeploymentNotFound(String),

    #[error("Definition resource could not be deployed: {0}")]
    InvalidResource(String),

    #[error("Engine operation '{operation}' failed: {message}")]
    Operation {
        operation: EngineOperation,
        message: String,
    },
}

impl EngineError {
    pub fn operation(operation: EngineOperation, message: impl Into<String>) -> Self {
        EngineError::Operation {
            operation,
            message: message.into(),
        }
    }
}

/// Errors that can occur while projecting a definition into a `WorkflowGraph`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Definition '{0}' contains no task nodes and cannot be migrated")]
    GraphEmpty(String),

    #[error("Node '{0}' is declared more than once")]
    DuplicateNode(String),

    #[error("Edge '{0}' is declared more than once")]
    DuplicateEdge(String),

    #[error("Node '{missing_node_id}' not found, which is required by edge '{edge_id}'")]
    NodeNotFound {
        missing_node_id: String,
        edge_id: String,
    },

    #[error(transparent)]
    Conversion(#[from] DefinitionConversionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors that can occur when converting a custom format into a `WorkflowDefinition`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionConversionError {
    #[error("Failed to parse definition JSON: {0}")]
    JsonParseError(String),

    #[error("Invalid custom data: {0}")]
    ValidationError(String),
}

/// Fatal errors of a single migration attempt.
///
/// Every variant unwinds the orchestrator to `Aborted`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    #[error("Definition '{0}' has no workable task nodes")]
    GraphEmpty(String),

    #[error("No running case found with id '{0}'")]
    NoActiveCase(String),

    #[error("No relocation point could be found for node '{node_id}'")]
    NoRelocationPoint { node_id: String },

    #[error("Relocation is ambiguous between active nodes [{}]", .candidates.join(", "))]
    AmbiguousRelocation { candidates: Vec<String> },

    #[error("Engine operation failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid workflow graph: {0}")]
    Graph(GraphError),

    #[error(
        "Relocation left two live cases: origin '{origin_case_id}' and replacement '{new_case_id}'"
    )]
    RelocationWindowOpen {
        origin_case_id: String,
        new_case_id: String,
    },
}

impl From<GraphError> for MigrationError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::GraphEmpty(version) => MigrationError::GraphEmpty(version),
            GraphError::Engine(engine) => MigrationError::Engine(engine),
            other => MigrationError::Graph(other),
        }
    }
}

/// Errors raised while loading a `MigrationConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised while persisting or restoring a `GraphSnapshot`.
#[derive(Error, Debug, Clone)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(String),

    #[error("Snapshot encoding failed: {0}")]
    Encode(String),

    #[error("Snapshot decoding failed: {0}")]
    Decode(String),
}
