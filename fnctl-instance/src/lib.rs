mod accumulator;
mod conf;
pub mod dev;
mod error;
mod grpc_service;
mod state;

use std::{future::Future, sync::Arc};

use fnctl_pb::instance_control_server::InstanceControlServer;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::info;

pub use accumulator::{
    Accumulator, ExceptionKind, ExceptionLog, MAX_EXCEPTIONS, MetricsRegistry,
};
pub use conf::Config;
pub use envconfig::Envconfig;
pub use error::InstanceError;
pub use grpc_service::InstanceControlService;
pub use state::{ABANDONED_INVOCATION, InstanceState, InvocationTimer};

/// Serve `InstanceControl` (plus gRPC reflection) on `listener` until
/// `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<InstanceState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), InstanceError> {
    let addr = listener.local_addr()?;
    let reflection_server_v1a = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(fnctl_pb::FILE_DESCRIPTOR_SET)
        .build_v1alpha()?;

    let reflection_server_v1 = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(fnctl_pb::FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let control = InstanceControlServer::new(InstanceControlService::new(
        state.clone(),
    ));
    info!(
        "start instance control for '{}' on {}",
        state.instance_id(),
        addr
    );
    tonic::transport::Server::builder()
        .add_service(control)
        .add_service(reflection_server_v1a)
        .add_service(reflection_server_v1)
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            shutdown,
        )
        .await?;
    info!("instance control for '{}' stopped", state.instance_id());
    Ok(())
}
