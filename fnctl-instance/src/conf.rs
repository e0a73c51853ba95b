use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "INSTANCE_GRPC_PORT", default = "9093")]
    pub grpc_port: u16,
    #[envconfig(from = "INSTANCE_ID", default = "0")]
    pub instance_id: String,
    /// Upper bound a control call waits on the accumulator lock.
    #[envconfig(from = "INSTANCE_LOCK_TIMEOUT_MS", default = "100")]
    pub lock_timeout_ms: u64,
    /// Synthetic invocations per second; unset disables the dev workload.
    #[envconfig(from = "INSTANCE_DEV_LOAD_RATE")]
    pub dev_load_rate: Option<u32>,
    #[envconfig(from = "INSTANCE_DEV_FAILURE_RATIO", default = "0.05")]
    pub dev_failure_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grpc_port: 9093,
            instance_id: "0".into(),
            lock_timeout_ms: 100,
            dev_load_rate: None,
            dev_failure_ratio: 0.05,
        }
    }
}

impl Config {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
