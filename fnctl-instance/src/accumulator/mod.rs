//! Single-owner status record. [`crate::InstanceState`] wraps it in a lock;
//! nothing in here synchronizes on its own.

mod exceptions;
mod metrics;

use std::collections::HashMap;

use fnctl_pb::{ExceptionInformation, FunctionStatus, MetricsData};

pub use exceptions::ExceptionLog;
pub use metrics::MetricsRegistry;

/// Entries kept per exception history.
pub const MAX_EXCEPTIONS: usize = 10;

/// Origin of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Raised by the function body.
    User,
    /// Raised by the instance runtime around it.
    System,
}

#[derive(Debug, Default, Clone, Copy)]
struct LatencyMean {
    total_ms: f64,
    samples: u64,
}

impl LatencyMean {
    fn add(&mut self, sample_ms: f64) {
        self.total_ms += sample_ms;
        self.samples += 1;
    }

    fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_ms / self.samples as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct Accumulator {
    instance_id: String,
    running: bool,
    failure_message: String,
    num_restarts: i64,
    num_processed: i64,
    num_successfully_processed: i64,
    num_user_exceptions: i64,
    num_system_exceptions: i64,
    latest_user_exceptions: ExceptionLog,
    latest_system_exceptions: ExceptionLog,
    deserialization_exceptions: HashMap<String, i64>,
    serialization_exceptions: i64,
    latency: LatencyMean,
    last_invocation_time: i64,
    metrics: MetricsRegistry,
}

impl Accumulator {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            running: false,
            failure_message: String::new(),
            num_restarts: 0,
            num_processed: 0,
            num_successfully_processed: 0,
            num_user_exceptions: 0,
            num_system_exceptions: 0,
            latest_user_exceptions: ExceptionLog::with_capacity(
                MAX_EXCEPTIONS,
            ),
            latest_system_exceptions: ExceptionLog::with_capacity(
                MAX_EXCEPTIONS,
            ),
            deserialization_exceptions: HashMap::new(),
            serialization_exceptions: 0,
            latency: LatencyMean::default(),
            last_invocation_time: 0,
            metrics: MetricsRegistry::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.num_processed += 1;
        self.num_successfully_processed += 1;
    }

    pub fn record_failure(
        &mut self,
        kind: ExceptionKind,
        message: String,
        now_ms: i64,
    ) {
        self.num_processed += 1;
        let record = ExceptionInformation::new(message, now_ms);
        match kind {
            ExceptionKind::User => {
                self.num_user_exceptions += 1;
                self.latest_user_exceptions.push(record);
            }
            ExceptionKind::System => {
                self.num_system_exceptions += 1;
                self.latest_system_exceptions.push(record);
            }
        }
    }

    pub fn record_deserialization_failure(&mut self, key: &str) {
        match self.deserialization_exceptions.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.deserialization_exceptions.insert(key.to_string(), 1);
            }
        }
    }

    pub fn record_serialization_failure(&mut self) {
        self.serialization_exceptions += 1;
    }

    pub fn update_latency(&mut self, sample_ms: f64, now_ms: i64) {
        if sample_ms.is_finite() && sample_ms >= 0.0 {
            self.latency.add(sample_ms);
        }
        self.last_invocation_time = now_ms;
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn mark_failed(&mut self, message: String) {
        self.running = false;
        self.failure_message = message;
    }

    pub fn record_restart(&mut self) {
        self.num_restarts += 1;
        self.failure_message.clear();
        self.running = true;
    }

    pub fn observe(&mut self, name: &str, value: f64) -> bool {
        self.metrics.observe(name, value)
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricsRegistry {
        &mut self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsData {
        self.metrics.snapshot()
    }

    pub fn average_latency(&self) -> f64 {
        self.latency.mean()
    }

    pub fn to_status(&self) -> FunctionStatus {
        FunctionStatus {
            running: self.running,
            failure_exception: self.failure_message.clone(),
            num_restarts: self.num_restarts,
            num_processed: self.num_processed,
            num_successfully_processed: self.num_successfully_processed,
            num_user_exceptions: self.num_user_exceptions,
            latest_user_exceptions: self.latest_user_exceptions.to_vec(),
            num_system_exceptions: self.num_system_exceptions,
            latest_system_exceptions: self.latest_system_exceptions.to_vec(),
            deserialization_exceptions: self
                .deserialization_exceptions
                .clone(),
            serialization_exceptions: self.serialization_exceptions,
            average_latency: self.latency.mean(),
            last_invocation_time: self.last_invocation_time,
            instance_id: self.instance_id.clone(),
            metrics: if self.metrics.is_empty() {
                None
            } else {
                Some(self.metrics.snapshot())
            },
        }
    }
}
