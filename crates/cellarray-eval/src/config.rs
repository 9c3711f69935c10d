/// Evaluation settings shared by a session and the arrays it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    /// Answer repeated comparisons from the inverted index when the watermark
    /// allows it, and record cells into it during linear scans.
    pub enable_inverted_index: bool,
    /// Memoized slices kept per array before the oldest key is evicted.
    pub max_slice_cache_entries: usize,
    /// Upper bound on indexed columns across the whole session.
    pub max_indexed_columns: Option<usize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            enable_inverted_index: true,
            max_slice_cache_entries: 64,
            max_indexed_columns: None,
        }
    }
}

impl EvalConfig {
    pub fn with_inverted_index(mut self, enabled: bool) -> Self {
        self.enable_inverted_index = enabled;
        self
    }

    pub fn with_max_indexed_columns(mut self, limit: usize) -> Self {
        self.max_indexed_columns = Some(limit);
        self
    }

    pub fn with_max_slice_cache_entries(mut self, entries: usize) -> Self {
        self.max_slice_cache_entries = entries;
        self
    }
}
