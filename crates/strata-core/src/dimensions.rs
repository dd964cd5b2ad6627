//! Data dimensions
//!
//! Every read against a storage adapter resolves records within a dimension
//! tuple: which workspace, which language, and optionally at which point in
//! time. Both workspace and language default to `"default"`.

use serde::{Deserialize, Serialize};

/// Default workspace and language name.
pub const DEFAULT_DIMENSION: &str = "default";

/// The (workspace, language, timeshift) tuple selecting which version of a
/// record to read.
///
/// # Example
/// ```
/// use strata_core::DataDimensions;
///
/// let live = DataDimensions::new();
/// assert_eq!(live.workspace(), "default");
///
/// let draft_de = DataDimensions::new()
///     .with_workspace("draft")
///     .with_language("de");
/// assert_eq!(draft_de.language(), "de");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataDimensions {
    workspace: String,
    language: String,
    /// As-of timestamp in microseconds since the epoch. `None` reads the
    /// latest revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    timeshift: Option<i64>,
}

impl Default for DataDimensions {
    fn default() -> Self {
        Self {
            workspace: DEFAULT_DIMENSION.to_string(),
            language: DEFAULT_DIMENSION.to_string(),
            timeshift: None,
        }
    }
}

impl DataDimensions {
    /// Dimensions selecting the default workspace and language, latest
    /// revision.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a workspace.
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Select a language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Read as of the given timestamp (microseconds since the epoch) instead
    /// of the latest revision.
    pub fn with_timeshift(mut self, timestamp: i64) -> Self {
        self.timeshift = Some(timestamp);
        self
    }

    /// Drop a previously set timeshift.
    pub fn without_timeshift(mut self) -> Self {
        self.timeshift = None;
        self
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn timeshift(&self) -> Option<i64> {
        self.timeshift
    }

    /// Whether this is a historical (time-travel) read.
    pub fn is_time_shifted(&self) -> bool {
        self.timeshift.is_some()
    }
}
