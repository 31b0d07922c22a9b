//! Trash lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Trash behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// When `true`, restoring a folder also clears the trashed flag on
    /// every descendant that was stamped by the same cascade. When `false`,
    /// restore clears only the selected node's own flag.
    #[serde(default)]
    pub cascade_on_restore: bool,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            cascade_on_restore: false,
        }
    }
}
