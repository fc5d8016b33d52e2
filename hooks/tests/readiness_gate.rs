//! Readiness gate against real loopback sockets.

use std::num::NonZeroU16;
use std::time::Duration;

use fwdeploy_common::{DeploymentTarget, PollOutcome, UploadProtocol};
use fwdeploy_hooks::{ProbeTiming, ReadinessGate, TcpProbe};
use tokio::net::TcpListener;

fn short_timing() -> ProbeTiming {
    ProbeTiming {
        grace: Duration::from_millis(20),
        connect_timeout: Duration::from_millis(200),
        deadline: Duration::from_millis(300),
        retry_interval: Duration::from_millis(50),
    }
}

fn loopback(protocol: &str, port: u16) -> DeploymentTarget {
    DeploymentTarget::new(
        UploadProtocol::parse(protocol),
        Some("127.0.0.1"),
        NonZeroU16::new(port).unwrap(),
    )
}

#[tokio::test]
async fn test_ready_when_listener_accepts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let gate = ReadinessGate::with_probe(TcpProbe, short_timing());

    let report = gate.wait(&loopback("espota", port)).await.unwrap();

    assert_eq!(report.outcome, PollOutcome::Ready);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.port, port);
}

#[tokio::test]
async fn test_ready_once_listener_comes_up() {
    // Reserve a port, release it, and bind it again after a delay.
    let port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().port()
    };
    let timing = ProbeTiming {
        deadline: Duration::from_secs(5),
        ..short_timing()
    };
    let gate = ReadinessGate::with_probe(TcpProbe, timing);

    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(listener);
    });

    let report = gate.wait(&loopback("ESPOTA", port)).await.unwrap();
    server.abort();

    assert_eq!(report.outcome, PollOutcome::Ready);
    assert!(report.attempts > 1);
}

#[tokio::test]
async fn test_times_out_on_closed_port() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let timing = short_timing();
    let gate = ReadinessGate::with_probe(TcpProbe, timing);

    let report = gate.wait(&loopback("espota", port)).await.unwrap();

    assert_eq!(report.outcome, PollOutcome::TimedOut);
    assert!(report.attempts >= 1);
    assert!(report.elapsed >= timing.grace + timing.deadline);
}

#[tokio::test]
async fn test_wired_protocol_returns_immediately() {
    let gate = ReadinessGate::new();
    let target = DeploymentTarget::with_readiness_port(UploadProtocol::parse("esptool"), None);

    let start = std::time::Instant::now();
    let report = gate.wait(&target).await;

    assert!(report.is_none());
    assert!(start.elapsed() < Duration::from_millis(100));
}
