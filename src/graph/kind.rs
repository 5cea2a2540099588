use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural category of a node, used for compatibility checks between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Task,
    Gateway,
    Event,
    Other,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Task => write!(f, "task"),
            NodeKind::Gateway => write!(f, "gateway"),
            NodeKind::Event => write!(f, "event"),
            NodeKind::Other => write!(f, "other"),
        }
    }
}

/// Declares the element names every registry knows about, and their kind.
macro_rules! define_default_kinds {
    ( $( $kind:ident => [ $( $element:expr ),* $(,)? ] ),* $(,)? ) => {
        fn register_default_kinds(registry: &mut AHashMap<String, NodeKind>) {
            $( $( registry.insert($element.to_string(), NodeKind::$kind); )* )*
        }
    };
}

define_default_kinds! {
    Task => [
        "task", "userTask", "serviceTask", "scriptTask", "sendTask",
        "receiveTask", "manualTask", "businessRuleTask",
    ],
    Gateway => [
        "exclusiveGateway", "parallelGateway", "inclusiveGateway",
        "eventBasedGateway", "complexGateway",
    ],
    Event => [
        "startEvent", "endEvent", "intermediateCatchEvent",
        "intermediateThrowEvent", "boundaryEvent",
    ],
    Other => ["subProcess", "transaction", "callActivity"],
}

/// Maps modeller element names onto a `NodeKind`.
///
/// Unknown names fall back to a suffix rule (`...Task`, `...Gateway`, `...Event`),
/// and then to `NodeKind::Other`.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: AHashMap<String, NodeKind>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        let mut kinds = AHashMap::new();
        register_default_kinds(&mut kinds);
        Self { kinds }
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overrides) the kind of a custom element name.
    pub fn with_type_mapping(mut self, element_type: &str, kind: NodeKind) -> Self {
        self.kinds.insert(element_type.to_string(), kind);
        self
    }

    pub fn classify(&self, element_type: &str) -> NodeKind {
        if let Some(kind) = self.kinds.get(element_type) {
            return *kind;
        }
        let lowered = element_type.to_ascii_lowercase();
        if lowered.ends_with("task") {
            NodeKind::Task
        } else if lowered.ends_with("gateway") {
            NodeKind::Gateway
        } else if lowered.ends_with("event") {
            NodeKind::Event
        } else {
            NodeKind::Other
        }
    }
}
