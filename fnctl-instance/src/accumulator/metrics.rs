use std::collections::HashMap;

use fnctl_pb::{DataDigest, MetricsData};
use tracing::warn;

/// Named digests reported by user code.
#[derive(Debug, Default, Clone)]
pub struct MetricsRegistry {
    digests: HashMap<String, DataDigest>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `value` into the digest for `name`. Non-finite samples are
    /// dropped and reported as `false`.
    pub fn observe(&mut self, name: &str, value: f64) -> bool {
        if !value.is_finite() {
            warn!("drop non-finite sample {} for metric '{}'", value, name);
            return false;
        }
        match self.digests.get_mut(name) {
            Some(digest) => digest.observe(value),
            None => {
                let mut digest = DataDigest::empty();
                digest.observe(value);
                self.digests.insert(name.to_string(), digest);
            }
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&DataDigest> {
        self.digests.get(name)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn snapshot(&self) -> MetricsData {
        MetricsData {
            metrics: self.digests.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.digests.clear();
    }

    /// Hand over every digest and leave the registry empty.
    pub fn take(&mut self) -> MetricsData {
        MetricsData {
            metrics: std::mem::take(&mut self.digests),
        }
    }
}
