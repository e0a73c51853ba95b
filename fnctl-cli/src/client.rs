use std::time::Duration;

use anyhow::Context;
use fnctl_pb::{
    FunctionStatus, HealthCheckResult, MetricsData,
    instance_control_client::InstanceControlClient,
};
use http::Uri;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

pub async fn connect(
    url: &Uri,
    timeout: Duration,
) -> anyhow::Result<InstanceControlClient<Channel>> {
    debug!("connect to {}", url);
    let channel = Endpoint::from(url.clone())
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect()
        .await
        .with_context(|| format!("cannot connect to {}", url))?;
    Ok(InstanceControlClient::new(channel))
}

pub async fn query_status(
    url: &Uri,
    timeout: Duration,
) -> anyhow::Result<FunctionStatus> {
    let mut client = connect(url, timeout).await?;
    let resp = client
        .get_function_status(())
        .await
        .context("GetFunctionStatus failed")?;
    Ok(resp.into_inner())
}

pub async fn query_metrics(
    url: &Uri,
    timeout: Duration,
    reset: bool,
) -> anyhow::Result<MetricsData> {
    let mut client = connect(url, timeout).await?;
    let resp = if reset {
        client
            .get_and_reset_metrics(())
            .await
            .context("GetAndResetMetrics failed")?
    } else {
        client.get_metrics(()).await.context("GetMetrics failed")?
    };
    Ok(resp.into_inner())
}

pub async fn reset_metrics(url: &Uri, timeout: Duration) -> anyhow::Result<()> {
    let mut client = connect(url, timeout).await?;
    client.reset_metrics(()).await.context("ResetMetrics failed")?;
    Ok(())
}

pub async fn query_health(
    url: &Uri,
    timeout: Duration,
) -> anyhow::Result<HealthCheckResult> {
    let mut client = connect(url, timeout).await?;
    let resp = client
        .health_check(())
        .await
        .context("HealthCheck failed")?;
    Ok(resp.into_inner())
}
