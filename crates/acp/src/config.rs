//! Connection-wide tunables, in the same "sane defaults, override via
//! builder" spirit as the teacher's `StdioServerConfig`.

/// Default maximum line length accepted by the framer: 16 MiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for a [`crate::connection::ConnectionCore`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum length, in bytes, of a single framed line before it is
    /// discarded with a framing error.
    pub max_line_bytes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { max_line_bytes: DEFAULT_MAX_LINE_BYTES }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }
}
