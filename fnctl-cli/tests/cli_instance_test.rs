use std::{sync::Arc, time::Duration};

use fnctl_cli::{
    EXIT_UNREACHABLE, health_exit_code, query_health, query_metrics,
    query_status, reset_metrics, summary_line,
};
use fnctl_instance::{ExceptionKind, InstanceState};
use http::Uri;
use tokio::{net::TcpListener, sync::oneshot};

const TIMEOUT: Duration = Duration::from_secs(2);

async fn spawn_instance(
    id: &str,
) -> (Uri, Arc<InstanceState>, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(InstanceState::new(id, Duration::from_millis(200)));
    let (tx, rx) = oneshot::channel::<()>();
    let served = state.clone();
    tokio::spawn(async move {
        let _ = fnctl_instance::serve(listener, served, async move {
            let _ = rx.await;
        })
        .await;
    });
    let url: Uri = format!("http://{}", addr).parse().unwrap();
    for _ in 0..50 {
        if query_health(&url, TIMEOUT).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    (url, state, tx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poller_reads_and_resets_instance() {
    let (url, state, stop) = spawn_instance("cli-1").await;
    state.set_running(true);
    state.start_invocation().success();
    state
        .start_invocation()
        .failure(ExceptionKind::System, "lost connection");
    state.observe("bytes", 10.0);
    state.observe("bytes", 30.0);

    let status = query_status(&url, TIMEOUT).await.unwrap();
    assert_eq!(status.instance_id, "cli-1");
    assert_eq!(status.num_processed, 2);

    let metrics = query_metrics(&url, TIMEOUT, true).await.unwrap();
    assert_eq!(metrics.digest("bytes").unwrap().sum, 40.0);
    let line = summary_line(&url, &status, &metrics);
    assert!(line.contains("sys_exc=1"));
    assert!(line.contains("bytes[n=2 avg=20.00 min=10 max=30]"));

    assert!(query_metrics(&url, TIMEOUT, false).await.unwrap().is_empty());

    state.observe("bytes", 1.0);
    reset_metrics(&url, TIMEOUT).await.unwrap();
    assert!(query_metrics(&url, TIMEOUT, false).await.unwrap().is_empty());

    let health = query_health(&url, TIMEOUT).await;
    assert_eq!(health_exit_code(&health), 0);

    let _ = stop.send(());
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url: Uri = format!("http://{}", addr).parse().unwrap();
    let health = query_health(&url, Duration::from_millis(500)).await;
    assert!(health.is_err());
    assert_eq!(health_exit_code(&health), EXIT_UNREACHABLE);
    assert!(query_status(&url, Duration::from_millis(500)).await.is_err());
}
