//! Configuration management for the graph community analyzer

use crate::cluster::detection::CommunityOptions;

/// Default configuration for the analyses
#[derive(Debug, Clone)]
pub struct Config {
    /// Scale betweenness by 1/(N(N-1))
    pub normalize: bool,

    /// Keep a record of every community split
    pub record_splits: bool,

    /// Worker threads for the statistics (0 = all available cores)
    pub threads: usize,

    /// Width factor used when measuring dendrogram drawing depth
    pub dendrogram_width_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalize: false,
            record_splits: false,
            threads: 0,
            dendrogram_width_factor: 0.3,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(normalize: bool, record_splits: bool, threads: usize, dendrogram_width_factor: f64) -> Self {
        Self {
            normalize,
            record_splits,
            threads,
            dendrogram_width_factor,
        }
    }

    /// Thread count with 0 resolved to the number of cores
    pub fn num_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            num_cpus::get()
        }
    }

    pub fn community_options(&self) -> CommunityOptions {
        CommunityOptions {
            record_splits: self.record_splits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_count_resolution() {
        assert_eq!(Config::new(false, false, 3, 0.3).num_threads(), 3);
        assert!(Config::default().num_threads() >= 1);
    }

    #[test]
    fn test_community_options() {
        let config = Config::new(false, true, 0, 0.3);
        assert!(config.community_options().record_splits);
        assert!(!Config::default().community_options().record_splits);
    }
}
