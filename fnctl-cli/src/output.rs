use fnctl_pb::{FunctionStatus, MetricsData};
use http::Uri;
use serde::Serialize;

pub fn render_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => format!("{{\"error\": \"{}\"}}", e),
    }
}

/// One line per instance per poll round.
pub fn summary_line(
    url: &Uri,
    status: &FunctionStatus,
    metrics: &MetricsData,
) -> String {
    let mut names: Vec<_> = metrics.metrics.keys().collect();
    names.sort();
    let digests: Vec<String> = names
        .into_iter()
        .filter_map(|name| {
            let digest = metrics.metrics.get(name)?;
            Some(match digest.mean() {
                Some(mean) => format!(
                    "{}[n={} avg={:.2} min={} max={}]",
                    name, digest.count, mean, digest.min, digest.max
                ),
                None => format!("{}[n=0]", name),
            })
        })
        .collect();
    let mut line = format!(
        "{} instance={} running={} processed={} success={} user_exc={} sys_exc={} avg_latency_ms={:.2}",
        url,
        status.instance_id,
        status.running,
        status.num_processed,
        status.num_successfully_processed,
        status.num_user_exceptions,
        status.num_system_exceptions,
        status.average_latency,
    );
    if !status.failure_exception.is_empty() {
        line.push_str(&format!(" failure={:?}", status.failure_exception));
    }
    if !digests.is_empty() {
        line.push(' ');
        line.push_str(&digests.join(" "));
    }
    line
}
