//! Walled-garden diagnostics monitor.
//!
//! Holds one [`DomainProbe`] per configured domain and re-probes them all,
//! concurrently, on a fixed interval or when asked. Results are published
//! through a watch channel so readers never block a cycle in progress.

use crate::client::http::HttpTransport;
use crate::clock::{Clock, SystemClock};
use crate::config::PortalConfig;
use crate::diagnostics::probe::{
    DomainProbe, HttpReachabilityProbe, ProbeStatus, ProbeTarget, ReachabilityProbe,
};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Periodic reachability monitor for the portal's dependencies.
pub struct DiagnosticsMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    state: watch::Sender<Vec<DomainProbe>>,
    wake: Notify,
}

impl DiagnosticsMonitor {
    /// Create a monitor; every entry starts as `Checking`.
    pub fn new(
        targets: &[ProbeTarget],
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
    ) -> Self {
        Self::with_clock(targets, probe, interval, Arc::new(SystemClock))
    }

    /// Create a monitor with a custom clock for `checked_at`.
    pub fn with_clock(
        targets: &[ProbeTarget],
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let initial = targets.iter().map(DomainProbe::checking).collect();
        let (state, _) = watch::channel(initial);
        Self {
            probe,
            clock,
            interval,
            state,
            wake: Notify::new(),
        }
    }

    /// Monitor the configured walled garden over HTTP.
    pub fn from_config(config: &PortalConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let probe = HttpReachabilityProbe::new(transport, config.probe_timeout());
        Self::new(
            &config.walled_garden,
            Arc::new(probe),
            config.diagnostics_interval(),
        )
    }

    /// Current statuses.
    pub fn snapshot(&self) -> Vec<DomainProbe> {
        self.state.borrow().clone()
    }

    /// Receiver that sees every completed cycle.
    pub fn subscribe(&self) -> watch::Receiver<Vec<DomainProbe>> {
        self.state.subscribe()
    }

    /// Entries whose latest probe failed.
    pub fn blocked(&self) -> Vec<DomainProbe> {
        self.state
            .borrow()
            .iter()
            .filter(|p| p.status == ProbeStatus::Blocked)
            .cloned()
            .collect()
    }

    /// Probe every entry concurrently and publish the new list.
    ///
    /// A failing probe only marks its own entry `Blocked`.
    pub async fn refresh(&self) -> Vec<DomainProbe> {
        let current = self.snapshot();
        let cycles = current.iter().map(|entry| async move {
            let status = self.probe.probe(&entry.domain).await;
            DomainProbe {
                status,
                checked_at: Some(self.clock.now_utc()),
                ..entry.clone()
            }
        });
        let updated: Vec<DomainProbe> = join_all(cycles).await;

        let blocked = updated
            .iter()
            .filter(|p| p.status == ProbeStatus::Blocked)
            .count();
        info!(
            domains = updated.len(),
            blocked, "diagnostics cycle complete"
        );

        self.state.send_replace(updated.clone());
        updated
    }

    /// Ask the running loop for an extra cycle without waiting for it.
    pub fn request_refresh(&self) {
        self.wake.notify_one();
    }

    /// Refresh immediately, then every interval and on each request.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
            }
            self.refresh().await;
        }
    }

    /// Start [`run`](Self::run) on the current runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockReply, MockTransport};
    use crate::clock::MockClock;

    fn targets() -> Vec<ProbeTarget> {
        vec![
            ProbeTarget::new("open.example", "Open"),
            ProbeTarget::new("denied.example", "Denied"),
            ProbeTarget::new("slow.example", "Slow"),
        ]
    }

    fn transport() -> Arc<MockTransport> {
        Arc::new(
            MockTransport::new()
                .on_prefix("https://open.example/", MockReply::json(403, ""))
                .on_prefix("https://denied.example/", MockReply::connect_error())
                .on_prefix("https://slow.example/", MockReply::Hang),
        )
    }

    fn monitor(transport: Arc<MockTransport>, interval: Duration) -> DiagnosticsMonitor {
        let probe = HttpReachabilityProbe::new(transport, Duration::from_millis(50));
        DiagnosticsMonitor::with_clock(
            &targets(),
            Arc::new(probe),
            interval,
            Arc::new(MockClock::from_rfc3339("2026-03-01T08:30:00Z")),
        )
    }

    #[test]
    fn starts_checking() {
        let m = monitor(transport(), Duration::from_secs(30));
        let snapshot = m.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.iter().all(|p| p.status == ProbeStatus::Checking));
    }

    #[tokio::test]
    async fn refresh_reports_each_domain_independently() {
        let m = monitor(transport(), Duration::from_secs(30));

        let updated = m.refresh().await;

        let status = |domain: &str| updated.iter().find(|p| p.domain == domain).unwrap().status;
        assert_eq!(status("open.example"), ProbeStatus::Reachable);
        assert_eq!(status("denied.example"), ProbeStatus::Blocked);
        assert_eq!(status("slow.example"), ProbeStatus::Blocked);
        assert!(updated.iter().all(|p| p.checked_at.is_some()));
        assert_eq!(m.snapshot(), updated);
        assert_eq!(m.blocked().len(), 2);
    }

    #[tokio::test]
    async fn entry_identity_is_stable() {
        let m = monitor(transport(), Duration::from_secs(30));
        m.refresh().await;
        let second = m.refresh().await;
        let domains: Vec<_> = second.iter().map(|p| p.domain.as_str()).collect();
        assert_eq!(domains, vec!["open.example", "denied.example", "slow.example"]);
        assert_eq!(second[0].label, "Open");
    }

    #[tokio::test]
    async fn running_loop_refreshes_on_request() {
        let transport = transport();
        let m = Arc::new(monitor(transport.clone(), Duration::from_secs(3600)));
        let mut rx = m.subscribe();
        let handle = m.spawn();

        // Immediate first cycle.
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let after_first = transport.call_count();

        m.request_refresh();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(transport.call_count(), after_first + 3);
        handle.abort();
    }
}
