//! Device readiness gate.
//!
//! After an OTA upload the device reboots, and the filesystem upload that
//! follows has nobody to talk to until the web server is back. The gate
//! polls the device with bare TCP connects until one succeeds or the
//! deadline passes. A timeout is reported, never fatal.

use std::time::Duration;

use async_trait::async_trait;
use fwdeploy_common::{DeploymentTarget, PollOutcome};
use serde::{Serialize, Serializer};
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};

use crate::error::ProbeError;

/// Delay before the first probe, so the device has started rebooting.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);
/// Timeout for a single connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Total polling window, measured from the end of the grace period.
pub const DEADLINE: Duration = Duration::from_secs(60);
/// Pause after each failed attempt.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Timing parameters of the probe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTiming {
    pub grace: Duration,
    pub connect_timeout: Duration,
    pub deadline: Duration,
    pub retry_interval: Duration,
}

impl Default for ProbeTiming {
    fn default() -> Self {
        Self {
            grace: GRACE_PERIOD,
            connect_timeout: CONNECT_TIMEOUT,
            deadline: DEADLINE,
            retry_interval: RETRY_INTERVAL,
        }
    }
}

/// A liveness check against `host:port`. Nothing is sent or read.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<(), ProbeError>;
}

/// Probe that opens (and immediately drops) a TCP connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<(), ProbeError> {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Connect(e)),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }
}

/// Record of one gate run that actually probed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub outcome: PollOutcome,
    pub host: String,
    pub port: u16,
    pub attempts: u32,
    /// Wall time from gate entry, grace period included.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Blocks a dependent step until the device answers, or the deadline passes.
pub struct ReadinessGate<P = TcpProbe> {
    probe: P,
    timing: ProbeTiming,
}

impl ReadinessGate<TcpProbe> {
    pub fn new() -> Self {
        Self::with_probe(TcpProbe, ProbeTiming::default())
    }
}

impl Default for ReadinessGate<TcpProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Probe> ReadinessGate<P> {
    pub fn with_probe(probe: P, timing: ProbeTiming) -> Self {
        Self { probe, timing }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn timing(&self) -> ProbeTiming {
        self.timing
    }

    /// Wait for the device behind `target`.
    ///
    /// Returns `None` without delay for wired protocols; the gate only
    /// applies after a network upload.
    pub async fn wait(&self, target: &DeploymentTarget) -> Option<GateReport> {
        if !target.protocol.is_network() {
            tracing::debug!(
                protocol = %target.protocol,
                "Upload protocol is not network OTA, skipping readiness wait"
            );
            return None;
        }

        let start = Instant::now();
        sleep(self.timing.grace).await;

        let deadline = Instant::now() + self.timing.deadline;
        let port = target.port.get();
        tracing::info!(host = %target.host, port, "Waiting for device HTTP {} ...", target.address());

        let mut attempts = 0u32;
        while Instant::now() < deadline {
            attempts += 1;
            match self
                .probe
                .probe(&target.host, port, self.timing.connect_timeout)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        host = %target.host,
                        port,
                        attempts,
                        "Device HTTP is up ({:?})",
                        start.elapsed()
                    );
                    return Some(self.report(PollOutcome::Ready, target, attempts, start));
                }
                Err(e) => {
                    tracing::debug!(attempt = attempts, error = %e, "Device not ready yet");
                    sleep(self.timing.retry_interval).await;
                }
            }
        }

        tracing::warn!(
            host = %target.host,
            port,
            attempts,
            "Device HTTP not up after {}s; continuing anyway",
            self.timing.deadline.as_secs()
        );
        Some(self.report(PollOutcome::TimedOut, target, attempts, start))
    }

    fn report(
        &self,
        outcome: PollOutcome,
        target: &DeploymentTarget,
        attempts: u32,
        start: Instant,
    ) -> GateReport {
        GateReport {
            outcome,
            host: target.host.clone(),
            port: target.port.get(),
            attempts,
            elapsed: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwdeploy_common::UploadProtocol;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::net::TcpListener;

    /// Fails until `succeed_on` attempts have been made. `stall` makes each
    /// failure take the full connect timeout, like an unroutable host.
    struct ScriptedProbe {
        calls: AtomicU32,
        succeed_on: Option<u32>,
        stall: bool,
    }

    impl ScriptedProbe {
        fn new(succeed_on: Option<u32>, stall: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_on,
                stall,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, _host: &str, _port: u16, timeout: Duration) -> Result<(), ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.succeed_on.is_some_and(|n| call >= n) {
                return Ok(());
            }
            if self.stall {
                sleep(timeout).await;
                return Err(ProbeError::Timeout(timeout));
            }
            Err(ProbeError::Connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        }
    }

    fn ota_target() -> DeploymentTarget {
        DeploymentTarget::with_readiness_port(UploadProtocol::Espota, Some("10.0.0.7"))
    }

    fn gate(probe: ScriptedProbe) -> ReadinessGate<ScriptedProbe> {
        ReadinessGate::with_probe(probe, ProbeTiming::default())
    }

    #[test]
    fn test_default_timing() {
        let timing = ProbeTiming::default();
        assert_eq!(timing.grace, Duration::from_secs(2));
        assert_eq!(timing.connect_timeout, Duration::from_secs(2));
        assert_eq!(timing.deadline, Duration::from_secs(60));
        assert_eq!(timing.retry_interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wired_protocol_skips_without_probing() {
        let gate = gate(ScriptedProbe::new(Some(1), false));
        let target = DeploymentTarget::with_readiness_port(UploadProtocol::parse("esptool"), None);

        let start = Instant::now();
        let report = gate.wait(&target).await;

        assert!(report.is_none());
        assert_eq!(gate.probe().calls(), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_attempt() {
        let gate = gate(ScriptedProbe::new(Some(1), false));

        let report = gate.wait(&ota_target()).await.unwrap();

        assert_eq!(report.outcome, PollOutcome::Ready);
        assert_eq!(report.attempts, 1);
        assert_eq!(gate.probe().calls(), 1);
        assert!(report.elapsed >= GRACE_PERIOD);
        assert!(report.elapsed <= GRACE_PERIOD + CONNECT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_refusals() {
        let gate = gate(ScriptedProbe::new(Some(4), false));

        let report = gate.wait(&ota_target()).await.unwrap();

        assert_eq!(report.outcome, PollOutcome::Ready);
        assert_eq!(report.attempts, 4);
        // Grace, then three failures each followed by one retry interval.
        assert_eq!(report.elapsed, GRACE_PERIOD + RETRY_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_refused() {
        let gate = gate(ScriptedProbe::new(None, false));

        let report = gate.wait(&ota_target()).await.unwrap();

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.attempts, 60);
        assert_eq!(report.elapsed, GRACE_PERIOD + DEADLINE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_stalled() {
        let gate = gate(ScriptedProbe::new(None, true));

        let report = gate.wait(&ota_target()).await.unwrap();

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.attempts, 20);
        let polled = report.elapsed - GRACE_PERIOD;
        assert!(polled >= DEADLINE);
        assert!(polled <= DEADLINE + CONNECT_TIMEOUT + RETRY_INTERVAL);
    }

    #[tokio::test]
    async fn test_tcp_probe_accepting_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = TcpProbe.probe("127.0.0.1", port, CONNECT_TIMEOUT).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpProbe.probe("127.0.0.1", port, CONNECT_TIMEOUT).await;
        assert!(matches!(result, Err(ProbeError::Connect(_))));
    }

    #[test]
    fn test_report_serializes_millis() {
        let report = GateReport {
            outcome: PollOutcome::Ready,
            host: "10.0.0.7".to_string(),
            port: 80,
            attempts: 1,
            elapsed: Duration::from_millis(2500),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "ready");
        assert_eq!(json["elapsed_ms"], 2500);
    }
}
