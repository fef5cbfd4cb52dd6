//! Registry configuration.

/// Default retention cap for channels that are not activated.
pub const DEFAULT_HISTORY_RETENTION: usize = 150;

/// Default page size for loading older history.
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 50;

/// Tunables for the channel registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum timeline length kept for a channel that is not activated.
    pub history_retention: usize,
    /// Number of entries requested per older-history page when the caller
    /// does not specify a limit.
    pub history_page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_retention: DEFAULT_HISTORY_RETENTION,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }
}
