//! Knowledge items produced by a domain load.

use serde::{Deserialize, Serialize};

/// One document read from a domain's subdirectory.
///
/// Items have no identity beyond `(topic, file)`: the same file name in two
/// domains yields two distinct items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// File name relative to the domain directory (e.g. `"layers.md"`).
    pub file: String,
    /// Name of the domain the item belongs to.
    pub topic: String,
    /// Raw document text, republished verbatim.
    pub content: String,
}

/// A file that was skipped during a domain load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDiagnostic {
    pub file: String,
    pub message: String,
}

/// Result of loading one domain: the readable items in file-name order plus
/// a diagnostic for every file that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLoad {
    pub items: Vec<KnowledgeItem>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl DomainLoad {
    /// Returns `true` if every matching file was read.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
