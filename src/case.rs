use crate::engine::{CaseRecord, ExecutionEngine};
use crate::error::EngineError;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// In-flight variables of a case, copied verbatim on relocation.
pub type Variables = AHashMap<String, serde_json::Value>;

/// Snapshot of a running case, taken once per migration attempt.
///
/// The engine owns the live case; this value is never written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningCase {
    pub case_id: String,
    #[serde(default)]
    pub definition_version_id: String,
    #[serde(default)]
    pub active_node_ids: AHashSet<String>,
    #[serde(default)]
    pub variables: Variables,
}

impl RunningCase {
    pub fn new(case_id: impl Into<String>, definition_version_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            definition_version_id: definition_version_id.into(),
            active_node_ids: AHashSet::new(),
            variables: Variables::new(),
        }
    }

    pub fn with_active<I, S>(mut self, node_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_node_ids
            .extend(node_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn is_active(&self, node_id: &str) -> bool {
        self.active_node_ids.contains(node_id)
    }

    /// Samples position and variables of a case from the engine.
    ///
    /// Only meaningful once the case is suspended; a running case may move on
    /// between the two engine calls.
    pub fn snapshot<E: ExecutionEngine + ?Sized>(
        engine: &E,
        record: &CaseRecord,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            case_id: record.case_id.clone(),
            definition_version_id: record.definition_version_id.clone(),
            active_node_ids: engine.active_node_ids(&record.case_id)?,
            variables: engine.variables(&record.case_id)?,
        })
    }
}
