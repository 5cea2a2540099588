use super::model::WorkflowDefinition;
use crate::error::DefinitionConversionError;

/// A trait for custom definition formats that can be converted into a `WorkflowDefinition`.
///
/// This is the extension point that keeps utsuri independent of any modelling
/// notation. Implement it on your own parsed structs and hand the result to
/// `WorkflowGraph::from_source`.
///
/// # Example
///
/// ```rust,no_run
/// use utsuri::definition::{IntoDefinition, NodeDefinition, WorkflowDefinition};
/// use utsuri::error::DefinitionConversionError;
///
/// struct Step { key: String, label: String }
/// struct Checklist { version: String, steps: Vec<Step> }
///
/// impl IntoDefinition for Checklist {
///     fn into_definition(self) -> Result<WorkflowDefinition, DefinitionConversionError> {
///         let mut definition = WorkflowDefinition::new(self.version, "checklist");
///         for step in self.steps {
///             definition.nodes.push(NodeDefinition::new(step.key, step.label, "userTask"));
///         }
///         Ok(definition)
///     }
/// }
/// ```
pub trait IntoDefinition {
    /// Consumes the object and converts it into a canonical definition.
    fn into_definition(self) -> Result<WorkflowDefinition, DefinitionConversionError>;
}

impl IntoDefinition for WorkflowDefinition {
    fn into_definition(self) -> Result<WorkflowDefinition, DefinitionConversionError> {
        Ok(self)
    }
}
