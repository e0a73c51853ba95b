use std::{net::SocketAddr, sync::Arc, time::Duration};

use fnctl_instance::{ExceptionKind, InstanceState, MAX_EXCEPTIONS};
use fnctl_pb::instance_control_client::InstanceControlClient;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tonic::transport::Channel;
use tracing_test::traced_test;

struct TestInstance {
    addr: SocketAddr,
    state: Arc<InstanceState>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestInstance {
    async fn start(instance_id: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(InstanceState::new(
            instance_id,
            Duration::from_millis(200),
        ));
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn({
            let state = state.clone();
            async move {
                fnctl_instance::serve(listener, state, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
            }
        });
        Self {
            addr,
            state,
            stop: Some(tx),
            handle,
        }
    }

    async fn client(&self) -> InstanceControlClient<Channel> {
        let url = format!("http://{}", self.addr);
        for _ in 0..50 {
            if let Ok(client) = InstanceControlClient::connect(url.clone()).await
            {
                return client;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("control server at {url} never came up");
    }

    async fn shutdown(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap();
    }
}

#[traced_test]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_reflects_recorded_work() {
    let instance = TestInstance::start("fn-7").await;
    let state = instance.state.clone();
    state.set_running(true);
    state.start_invocation().success();
    state.start_invocation().success();
    state
        .start_invocation()
        .failure(ExceptionKind::User, "null field");
    state.record_failure(ExceptionKind::System, "runtime hiccup");
    state.record_deserialization_failure("in-topic");
    state.record_serialization_failure();
    state.observe("rows", 3.0);

    let mut client = instance.client().await;
    let status = client.get_function_status(()).await.unwrap().into_inner();
    assert!(status.running);
    assert_eq!(status.instance_id, "fn-7");
    assert_eq!(status.num_processed, 4);
    assert_eq!(status.num_successfully_processed, 2);
    assert_eq!(status.num_user_exceptions, 1);
    assert_eq!(status.num_system_exceptions, 1);
    assert_eq!(
        status.latest_user_exceptions[0].exception_string,
        "null field"
    );
    assert_eq!(status.deserialization_exceptions["in-topic"], 1);
    assert_eq!(status.serialization_exceptions, 1);
    assert!(status.last_invocation_time > 0);
    assert_eq!(status.metrics.unwrap().digest("rows").unwrap().count, 1.0);

    drop(client);
    instance.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exception_history_is_capped_over_the_wire() {
    let instance = TestInstance::start("fn-cap").await;
    for i in 0..=MAX_EXCEPTIONS {
        instance
            .state
            .record_failure(ExceptionKind::System, format!("sys-{i}"));
    }
    let mut client = instance.client().await;
    let status = client.get_function_status(()).await.unwrap().into_inner();
    assert_eq!(status.latest_system_exceptions.len(), MAX_EXCEPTIONS);
    assert_eq!(status.latest_system_exceptions[0].exception_string, "sys-1");
    assert_eq!(status.num_system_exceptions, MAX_EXCEPTIONS as i64 + 1);
    drop(client);
    instance.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metrics_get_reset_and_clear() {
    let instance = TestInstance::start("fn-m").await;
    for v in [3.0, 1.0, 4.0, 1.0, 5.0] {
        instance.state.observe("x", v);
    }
    let mut client = instance.client().await;

    let before = client.get_metrics(()).await.unwrap().into_inner();
    let digest = before.digest("x").unwrap();
    assert_eq!(digest.count, 5.0);
    assert_eq!(digest.sum, 14.0);
    assert_eq!(digest.max, 5.0);
    assert_eq!(digest.min, 1.0);

    let taken = client.get_and_reset_metrics(()).await.unwrap().into_inner();
    assert_eq!(before, taken);
    let after = client.get_metrics(()).await.unwrap().into_inner();
    assert!(after.is_empty());

    instance.state.observe("y", 1.0);
    client.reset_metrics(()).await.unwrap();
    assert!(client.get_metrics(()).await.unwrap().into_inner().is_empty());

    drop(client);
    instance.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_check_ignores_business_state() {
    let instance = TestInstance::start("fn-h").await;
    instance.state.mark_failed("function crashed");
    let mut client = instance.client().await;

    let health = client.health_check(()).await.unwrap().into_inner();
    assert!(health.success);

    let status = client.get_function_status(()).await.unwrap().into_inner();
    assert!(!status.running);
    assert_eq!(status.failure_exception, "function crashed");

    drop(client);
    instance.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_instance_is_a_call_error() {
    let instance = TestInstance::start("fn-gone").await;
    let addr = instance.addr;
    instance.shutdown().await;
    let result =
        InstanceControlClient::connect(format!("http://{}", addr)).await;
    assert!(result.is_err());
}
