use serde::{Deserialize, Serialize};

/// Event name emitted whenever cached records change.
pub const MODELS_CHANGED: &str = "models_changed";

/// Payload of [`MODELS_CHANGED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsChanged {
    pub type_tag: String,
    /// Number of records added, replaced or removed.
    pub count: usize,
}
