//! Synthetic invocation loop, used when no function runtime drives the
//! instance (local runs and demos).

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{ExceptionKind, InstanceState};

pub const DEV_INPUT_KEY: &str = "dev-input";
pub const DEV_PAYLOAD_METRIC: &str = "dev_payload_bytes";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Success,
    Failure(ExceptionKind),
    BadInput,
    BadOutput,
}

fn pick_outcome(failure_ratio: f64) -> Outcome {
    if rand::random_bool(0.01) {
        return Outcome::BadInput;
    }
    if rand::random_bool(failure_ratio) {
        if rand::random_bool(0.7) {
            Outcome::Failure(ExceptionKind::User)
        } else {
            Outcome::Failure(ExceptionKind::System)
        }
    } else if rand::random_bool(0.005) {
        Outcome::BadOutput
    } else {
        Outcome::Success
    }
}

/// Run `rate` fake invocations per second against `state` until the
/// returned handle is aborted.
pub fn spawn_workload(
    state: Arc<InstanceState>,
    rate: u32,
    failure_ratio: f64,
) -> JoinHandle<()> {
    let rate = rate.clamp(1, 10_000);
    let failure_ratio = if failure_ratio.is_nan() {
        0.0
    } else {
        failure_ratio.clamp(0.0, 1.0)
    };
    info!(
        "start dev workload: {} invocations/s, failure ratio {}",
        rate, failure_ratio
    );
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(1) / rate);
        let mut seq: u64 = 0;
        loop {
            ticker.tick().await;
            seq += 1;
            let outcome = pick_outcome(failure_ratio);
            let work = Duration::from_millis(rand::random_range(1..20));
            if outcome == Outcome::BadInput {
                state.record_deserialization_failure(DEV_INPUT_KEY);
                continue;
            }
            let timer = state.start_invocation();
            tokio::time::sleep(work).await;
            state.observe(
                DEV_PAYLOAD_METRIC,
                rand::random_range(64..4096) as f64,
            );
            debug!("invocation {} finished as {:?}", seq, outcome);
            match outcome {
                Outcome::Failure(kind) => {
                    timer.failure(kind, format!("dev invocation {seq} failed"))
                }
                Outcome::BadOutput => {
                    state.record_serialization_failure();
                    timer.failure(
                        ExceptionKind::System,
                        format!("dev invocation {seq}: cannot encode output"),
                    )
                }
                _ => timer.success(),
            }
        }
    })
}
