//! Engine configuration.

use chansync_core::SyncConfig;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Registry tunables (retention cap, page size).
    pub sync: SyncConfig,
    /// Capacity of the command queue shared by all handles.
    pub command_buffer: usize,
    /// Capacity of the notification broadcast. Slow subscribers lag.
    pub notification_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { sync: SyncConfig::default(), command_buffer: 64, notification_buffer: 256 }
    }
}
