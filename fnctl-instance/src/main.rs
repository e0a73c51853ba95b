use std::{
    error::Error,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use fnctl_instance::{Config, Envconfig, InstanceState};
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_log();
    let conf = Config::init_from_env()?;
    info!("use {:?}", conf);
    let state = Arc::new(InstanceState::from_config(&conf));
    state.set_running(true);
    let workload = conf.dev_load_rate.map(|rate| {
        fnctl_instance::dev::spawn_workload(
            state.clone(),
            rate,
            conf.dev_failure_ratio,
        )
    });

    let socket =
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), conf.grpc_port);
    let listener = TcpListener::bind(socket).await?;
    fnctl_instance::serve(listener, state.clone(), shutdown_signal()).await?;

    info!("starting a clean up for shutdown");
    if let Some(handle) = workload {
        handle.abort();
    }
    state.set_running(false);
    info!("done clean up");
    Ok(())
}

fn init_log() {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{
        EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("FNCTL_LOG")
                .from_env_lossy(),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        )
        .expect("failed to install signal handler")
        .recv()
        .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("signal received, starting graceful shutdown");
}
