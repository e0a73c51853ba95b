use std::sync::Arc;

use fnctl_pb::{
    FunctionStatus, HealthCheckResult, MetricsData,
    instance_control_server::InstanceControl,
};
use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::{InstanceState, error::InstanceError};

/// `InstanceControl` over a shared [`InstanceState`]. Holds no state of
/// its own.
#[derive(Clone)]
pub struct InstanceControlService {
    state: Arc<InstanceState>,
}

impl InstanceControlService {
    pub fn new(state: Arc<InstanceState>) -> Self {
        Self { state }
    }

    /// Run a lock-bounded read on the blocking pool so a stalled writer
    /// never parks a runtime worker.
    async fn bounded_read<T, F>(&self, read: F) -> Result<T, Status>
    where
        T: Send + 'static,
        F: FnOnce(&InstanceState) -> Result<T, InstanceError> + Send + 'static,
    {
        let state = self.state.clone();
        let value = tokio::task::spawn_blocking(move || read(state.as_ref()))
            .await
            .map_err(InstanceError::from)??;
        Ok(value)
    }
}

#[tonic::async_trait]
impl InstanceControl for InstanceControlService {
    #[instrument(level = "debug", skip(self, _request))]
    async fn get_function_status(
        &self,
        _request: Request<()>,
    ) -> Result<Response<FunctionStatus>, Status> {
        let status = self.bounded_read(InstanceState::try_status).await?;
        Ok(Response::new(status))
    }

    #[instrument(level = "debug", skip(self, _request))]
    async fn get_and_reset_metrics(
        &self,
        _request: Request<()>,
    ) -> Result<Response<MetricsData>, Status> {
        let metrics = self
            .bounded_read(InstanceState::try_get_and_reset_metrics)
            .await?;
        Ok(Response::new(metrics))
    }

    #[instrument(level = "debug", skip(self, _request))]
    async fn reset_metrics(
        &self,
        _request: Request<()>,
    ) -> Result<Response<()>, Status> {
        self.bounded_read(InstanceState::try_reset_metrics).await?;
        Ok(Response::new(()))
    }

    #[instrument(level = "debug", skip(self, _request))]
    async fn get_metrics(
        &self,
        _request: Request<()>,
    ) -> Result<Response<MetricsData>, Status> {
        let metrics = self.bounded_read(InstanceState::try_metrics).await?;
        Ok(Response::new(metrics))
    }

    // answers for the serving task only; never waits on the accumulator
    async fn health_check(
        &self,
        _request: Request<()>,
    ) -> Result<Response<HealthCheckResult>, Status> {
        Ok(Response::new(HealthCheckResult { success: true }))
    }
}
