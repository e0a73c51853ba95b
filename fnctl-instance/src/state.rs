use std::time::{Duration, Instant};

use fnctl_pb::{FunctionStatus, MetricsData};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{
    Config,
    accumulator::{Accumulator, ExceptionKind},
    error::InstanceError,
};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Shared status accumulator of one function instance.
///
/// Execution threads record facts through the `record_*` methods, which
/// block on the lock but never fail. The control service reads through
/// the `try_*` methods, which give up after `lock_timeout` instead of
/// waiting behind a stalled writer.
pub struct InstanceState {
    inner: Mutex<Accumulator>,
    instance_id: String,
    lock_timeout: Duration,
}

impl InstanceState {
    pub fn new(instance_id: impl Into<String>, lock_timeout: Duration) -> Self {
        let instance_id = instance_id.into();
        Self {
            inner: Mutex::new(Accumulator::new(instance_id.clone())),
            instance_id,
            lock_timeout,
        }
    }

    pub fn from_config(conf: &Config) -> Self {
        Self::new(conf.instance_id.clone(), conf.lock_timeout())
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Start timing an invocation. The outcome is recorded when the
    /// returned timer is consumed.
    pub fn start_invocation(&self) -> InvocationTimer<'_> {
        InvocationTimer {
            state: self,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn record_success(&self) {
        self.inner.lock().record_success();
    }

    pub fn record_failure(
        &self,
        kind: ExceptionKind,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let now = now_millis();
        self.inner.lock().record_failure(kind, message, now);
    }

    pub fn record_deserialization_failure(&self, key: &str) {
        self.inner.lock().record_deserialization_failure(key);
    }

    pub fn record_serialization_failure(&self) {
        self.inner.lock().record_serialization_failure();
    }

    pub fn update_latency(&self, sample_ms: f64) {
        let now = now_millis();
        self.inner.lock().update_latency(sample_ms, now);
    }

    /// Fold a sample into the user metric `name`.
    pub fn observe(&self, name: &str, value: f64) {
        self.inner.lock().observe(name, value);
    }

    pub fn set_running(&self, running: bool) {
        self.inner.lock().set_running(running);
    }

    pub fn mark_failed(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(
            "instance {} failed permanently: {}",
            self.instance_id,
            message
        );
        self.inner.lock().mark_failed(message);
    }

    pub fn record_restart(&self) {
        self.inner.lock().record_restart();
    }

    pub fn snapshot(&self) -> FunctionStatus {
        self.inner.lock().to_status()
    }

    pub fn metrics(&self) -> MetricsData {
        self.inner.lock().metrics_snapshot()
    }

    pub fn try_status(&self) -> Result<FunctionStatus, InstanceError> {
        Ok(self.lock_bounded()?.to_status())
    }

    pub fn try_metrics(&self) -> Result<MetricsData, InstanceError> {
        Ok(self.lock_bounded()?.metrics_snapshot())
    }

    pub fn try_get_and_reset_metrics(
        &self,
    ) -> Result<MetricsData, InstanceError> {
        Ok(self.lock_bounded()?.metrics_mut().take())
    }

    pub fn try_reset_metrics(&self) -> Result<(), InstanceError> {
        self.lock_bounded()?.metrics_mut().reset();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> MutexGuard<'_, Accumulator> {
        self.inner.lock()
    }

    fn lock_bounded(
        &self,
    ) -> Result<MutexGuard<'_, Accumulator>, InstanceError> {
        match self.inner.try_lock_for(self.lock_timeout) {
            Some(guard) => Ok(guard),
            None => {
                debug!(
                    "accumulator lock not acquired within {:?}",
                    self.lock_timeout
                );
                Err(InstanceError::LockTimeout(self.lock_timeout))
            }
        }
    }
}

/// Message recorded for an invocation whose timer was dropped unfinished.
pub const ABANDONED_INVOCATION: &str = "invocation abandoned";

/// Elapsed-time handle for one invocation.
///
/// Dropping the timer without calling `success` or `failure`, through a
/// panic or an early return, counts the invocation as a system exception.
#[must_use = "an invocation is only counted once the timer is consumed"]
pub struct InvocationTimer<'a> {
    state: &'a InstanceState,
    started: Instant,
    finished: bool,
}

impl InvocationTimer<'_> {
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    pub fn success(mut self) {
        self.finished = true;
        let elapsed = self.elapsed_ms();
        let now = now_millis();
        let mut acc = self.state.inner.lock();
        acc.record_success();
        acc.update_latency(elapsed, now);
    }

    pub fn failure(mut self, kind: ExceptionKind, message: impl Into<String>) {
        self.finished = true;
        self.finish_failed(kind, message.into());
    }

    fn finish_failed(&self, kind: ExceptionKind, message: String) {
        let elapsed = self.elapsed_ms();
        let now = now_millis();
        let mut acc = self.state.inner.lock();
        acc.record_failure(kind, message, now);
        acc.update_latency(elapsed, now);
    }
}

impl Drop for InvocationTimer<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "instance {}: invocation dropped after {:.1}ms without an outcome",
            self.state.instance_id,
            self.elapsed_ms()
        );
        self.finish_failed(ExceptionKind::System, ABANDONED_INVOCATION.into());
    }
}
