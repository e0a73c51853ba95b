use std::process::ExitCode;

use clap::Parser;
use fnctl_cli::FnctlCli;

#[tokio::main]
async fn main() -> ExitCode {
    init_log();
    let cli = FnctlCli::parse();
    fnctl_cli::run(cli).await
}

fn init_log() {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{
        EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("FNCTL_LOG")
                .from_env_lossy(),
        )
        .init();
}
