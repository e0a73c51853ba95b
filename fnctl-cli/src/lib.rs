mod client;
mod output;

use std::{process::ExitCode, time::Duration};

use http::Uri;
use tracing::info;

pub use client::{
    connect, query_health, query_metrics, query_status, reset_metrics,
};
pub use output::{render_json, summary_line};

/// Exit code when the instance answered but reported a problem.
pub const EXIT_UNHEALTHY: u8 = 1;
/// Exit code when the control call itself failed.
pub const EXIT_UNREACHABLE: u8 = 2;

#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct FnctlCli {
    #[command(subcommand)]
    pub command: FnctlCommands,
    #[clap(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum FnctlCommands {
    /// Print the function status of each instance
    #[clap(aliases = &["s"])]
    Status,
    /// Print the custom metrics of each instance
    #[clap(aliases = &["m"])]
    Metrics {
        /// Clear the metrics in the same call
        #[arg(short, long)]
        reset: bool,
    },
    /// Clear the custom metrics of each instance
    ResetMetrics,
    /// Check that the control endpoint answers
    #[clap(aliases = &["h"])]
    Health,
    /// Periodically fetch-and-reset metrics and print a summary line
    #[clap(aliases = &["p"])]
    Poll {
        /// Seconds between polls
        #[arg(short, long, default_value = "10")]
        interval: u64,
        /// Stop after this many rounds
        #[arg(short, long)]
        count: Option<u64>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Control endpoint of an instance; repeat for several instances
    #[arg(
        short,
        long,
        global = true,
        default_value = "http://127.0.0.1:9093"
    )]
    pub grpc_url: Vec<Uri>,
    /// Per-call timeout in seconds
    #[arg(long, default_value = "5", global = true)]
    pub timeout: u64,
}

impl ConnectionArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

pub async fn run(cli: FnctlCli) -> ExitCode {
    let conn = &cli.conn;
    info!("use option {cli:?}");
    let code = match &cli.command {
        FnctlCommands::Status => handle_status(conn).await,
        FnctlCommands::Metrics { reset } => handle_metrics(conn, *reset).await,
        FnctlCommands::ResetMetrics => handle_reset(conn).await,
        FnctlCommands::Health => handle_health(conn).await,
        FnctlCommands::Poll { interval, count } => {
            handle_poll(conn, Duration::from_secs(*interval), *count).await
        }
    };
    ExitCode::from(code)
}

fn report_unreachable(url: &Uri, err: &anyhow::Error) {
    eprintln!("{} unreachable: {:#}", url, err);
}

async fn handle_status(conn: &ConnectionArgs) -> u8 {
    let mut statuses = Vec::with_capacity(conn.grpc_url.len());
    let mut code = 0;
    for url in &conn.grpc_url {
        match query_status(url, conn.timeout()).await {
            Ok(status) => {
                if status.is_failed() {
                    code = code.max(EXIT_UNHEALTHY);
                }
                statuses.push(status);
            }
            Err(e) => {
                report_unreachable(url, &e);
                code = EXIT_UNREACHABLE;
            }
        }
    }
    let rendered = if conn.grpc_url.len() == 1 {
        statuses.pop().map(|s| render_json(&s))
    } else {
        let list: fnctl_pb::FunctionStatusList = statuses.into_iter().collect();
        Some(render_json(&list))
    };
    if let Some(out) = rendered {
        println!("{}", out);
    }
    code
}

async fn handle_metrics(conn: &ConnectionArgs, reset: bool) -> u8 {
    let mut code = 0;
    for url in &conn.grpc_url {
        match query_metrics(url, conn.timeout(), reset).await {
            Ok(metrics) => {
                if conn.grpc_url.len() > 1 {
                    println!("# {}", url);
                }
                println!("{}", render_json(&metrics));
            }
            Err(e) => {
                report_unreachable(url, &e);
                code = EXIT_UNREACHABLE;
            }
        }
    }
    code
}

async fn handle_reset(conn: &ConnectionArgs) -> u8 {
    let mut code = 0;
    for url in &conn.grpc_url {
        if let Err(e) = reset_metrics(url, conn.timeout()).await {
            report_unreachable(url, &e);
            code = EXIT_UNREACHABLE;
        }
    }
    code
}

async fn handle_health(conn: &ConnectionArgs) -> u8 {
    let mut code = 0;
    for url in &conn.grpc_url {
        let result = query_health(url, conn.timeout()).await;
        let this = health_exit_code(&result);
        match result {
            Ok(health) => println!("{} healthy={}", url, health.success),
            Err(e) => report_unreachable(url, &e),
        }
        code = code.max(this);
    }
    code
}

/// Unreachable outranks unhealthy, which outranks healthy.
pub fn health_exit_code(
    result: &anyhow::Result<fnctl_pb::HealthCheckResult>,
) -> u8 {
    match result {
        Ok(health) if health.success => 0,
        Ok(_) => EXIT_UNHEALTHY,
        Err(_) => EXIT_UNREACHABLE,
    }
}

async fn handle_poll(
    conn: &ConnectionArgs,
    interval: Duration,
    count: Option<u64>,
) -> u8 {
    let mut ticker =
        tokio::time::interval(interval.max(Duration::from_millis(100)));
    let mut round = 0u64;
    let mut code = 0;
    loop {
        ticker.tick().await;
        for url in &conn.grpc_url {
            let polled = async {
                let metrics = query_metrics(url, conn.timeout(), true).await?;
                let status = query_status(url, conn.timeout()).await?;
                anyhow::Ok((status, metrics))
            }
            .await;
            match polled {
                Ok((status, metrics)) => {
                    println!("{}", summary_line(url, &status, &metrics))
                }
                Err(e) => {
                    report_unreachable(url, &e);
                    code = EXIT_UNREACHABLE;
                }
            }
        }
        round += 1;
        if count.is_some_and(|c| round >= c) {
            return code;
        }
    }
}
