//! Configuration loading and representation.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROCESS_INSTANCE_INDEX: &str = "process_instance";
pub const DEFAULT_TASK_INDEX: &str = "task";
pub const DEFAULT_DOCUMENT_TYPE: &str = "_doc";

/// Where process-instance and task documents live in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexesConfig {
    pub process_instance_index: String,
    pub process_instance_document_type: String,
    pub task_index: String,
    pub task_document_type: String,
}

impl Default for IndexesConfig {
    fn default() -> Self {
        Self {
            process_instance_index: DEFAULT_PROCESS_INSTANCE_INDEX.to_string(),
            process_instance_document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            task_index: DEFAULT_TASK_INDEX.to_string(),
            task_document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        }
    }
}

impl IndexesConfig {
    /// Defaults overridden by `FLOWQUERY_*` environment variables.
    ///
    /// Unset or blank variables keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let defaults = Self::default();

        Self {
            process_instance_index: read(
                "FLOWQUERY_PROCESS_INSTANCE_INDEX",
                defaults.process_instance_index,
            ),
            process_instance_document_type: read(
                "FLOWQUERY_PROCESS_INSTANCE_DOCUMENT_TYPE",
                defaults.process_instance_document_type,
            ),
            task_index: read("FLOWQUERY_TASK_INDEX", defaults.task_index),
            task_document_type: read("FLOWQUERY_TASK_DOCUMENT_TYPE", defaults.task_document_type),
        }
    }
}
