use crate::{
    DataDigest, ExceptionInformation, FunctionStatus, FunctionStatusList,
    MetricsData,
};

impl DataDigest {
    /// Digest with no observations. `max`/`min` start at the identity of
    /// their fold so the first sample sets both.
    pub fn empty() -> Self {
        Self {
            count: 0.0,
            sum: 0.0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.count += 1.0;
        self.sum += value;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.sum / self.count)
        }
    }
}

impl ExceptionInformation {
    pub fn new(message: impl Into<String>, ms_since_epoch: i64) -> Self {
        Self {
            exception_string: message.into(),
            ms_since_epoch,
        }
    }
}

impl MetricsData {
    pub fn digest(&self, name: &str) -> Option<&DataDigest> {
        self.metrics.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl FunctionStatus {
    /// An instance that stopped running and left a failure message behind.
    pub fn is_failed(&self) -> bool {
        !self.running && !self.failure_exception.is_empty()
    }
}

impl FromIterator<FunctionStatus> for FunctionStatusList {
    fn from_iter<T: IntoIterator<Item = FunctionStatus>>(iter: T) -> Self {
        Self {
            function_status_list: iter.into_iter().collect(),
        }
    }
}
