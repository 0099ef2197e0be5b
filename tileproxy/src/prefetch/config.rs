//! Prefetch configuration.

/// Default number of prefetch workers.
pub const DEFAULT_PREFETCH_WORKERS: usize = 16;

/// Capacity of the queue between the pyramid walk and the workers.
pub const PREFETCH_QUEUE_CAPACITY: usize = 1000;

/// Prefetch settings from the `[prefetch]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Concurrent prefetch workers
    pub workers: usize,
    /// URL fragments appended to the built-in prefetch blacklist
    pub blacklist: Vec<String>,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_PREFETCH_WORKERS,
            blacklist: Vec::new(),
        }
    }
}

/// Splits a provider list on spaces, commas and semicolons.
///
/// Empty items are dropped.
pub fn split_provider_list(list: &str) -> Vec<String> {
    list.split(|c: char| c == ' ' || c == ',' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
