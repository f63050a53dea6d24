//! Cells that count as missing in the metric CSV

use serde::{Deserialize, Serialize};

const DEFAULT_PATTERNS: [&str; 6] = ["", "N/A", "NA", "null", "None", "undefined"];

/// Which metric cells are missing. A missing cell is left out of its row and
/// reads as no data, the same as the -1 sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Cell contents, after trimming, that mean "missing"
    pub patterns: Vec<String>,

    /// Match `patterns` exactly instead of ignoring ASCII case
    pub case_sensitive: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            case_sensitive: false,
        }
    }
}

impl NullConfig {
    pub fn is_null(&self, cell: &str) -> bool {
        let cell = cell.trim();
        self.patterns.iter().any(|pattern| {
            if self.case_sensitive {
                cell == pattern
            } else {
                cell.eq_ignore_ascii_case(pattern)
            }
        })
    }
}
