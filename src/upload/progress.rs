use super::types::{ProgressMode, ProgressSnapshot, SessionId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Produces progress snapshots for the active session.
///
/// Time mode samples wall-clock time on a fixed period. Byte mode is fed by the
/// transport whenever it knows how much of the body has been handed over.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    tick_interval: Duration,
    assumed_max: Duration,
    sender: UnboundedSender<ProgressSnapshot>,
}

impl ProgressEstimator {
    pub fn new(
        tick_interval: Duration,
        assumed_max: Duration,
        sender: UnboundedSender<ProgressSnapshot>,
    ) -> Self {
        Self {
            tick_interval,
            assumed_max,
            sender,
        }
    }

    pub fn assumed_max(&self) -> Duration {
        self.assumed_max
    }

    /// Starts periodic time ticks for `session_id`. Must be called inside a tokio runtime.
    pub fn start(&self, session_id: SessionId, started_at: Instant) -> ProgressHandle {
        let inner = Arc::new(HandleInner {
            session_id,
            started_at,
            stopped: AtomicBool::new(false),
            sender: self.sender.clone(),
        });

        let ticker = Arc::clone(&inner);
        let period = self.tick_interval;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if ticker.emit_time().is_none() {
                    break;
                }
            }
        });

        tracing::debug!(session_id = %session_id, period_ms = period.as_millis() as u64, "progress estimator started");

        ProgressHandle {
            inner,
            task: Some(task),
        }
    }

    /// Cosmetic percentage for time mode, clamped to `0..=100`.
    pub fn time_percent(&self, elapsed: Duration) -> f32 {
        time_percent(elapsed, self.assumed_max)
    }
}

pub fn time_percent(elapsed: Duration, assumed_max: Duration) -> f32 {
    if assumed_max.is_zero() {
        return 100.0;
    }
    let pct = elapsed.as_secs_f64() / assumed_max.as_secs_f64() * 100.0;
    pct.clamp(0.0, 100.0) as f32
}

/// Exact percentage for byte mode.
pub fn byte_percent(loaded: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((loaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
}

#[derive(Debug)]
struct HandleInner {
    session_id: SessionId,
    started_at: Instant,
    stopped: AtomicBool,
    sender: UnboundedSender<ProgressSnapshot>,
}

impl HandleInner {
    fn emit(&self, mode: ProgressMode) -> Option<ProgressSnapshot> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let snapshot = ProgressSnapshot {
            session_id: self.session_id,
            mode,
        };
        self.sender.send(snapshot).ok()?;
        Some(snapshot)
    }

    fn emit_time(&self) -> Option<ProgressSnapshot> {
        self.emit(ProgressMode::Time {
            elapsed: self.started_at.elapsed(),
        })
    }
}

/// Running estimator for one session. Stops itself when dropped.
#[derive(Debug)]
pub struct ProgressHandle {
    inner: Arc<HandleInner>,
    task: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Emits a time snapshot now. Returns `None` once stopped.
    pub fn tick(&self) -> Option<ProgressSnapshot> {
        self.inner.emit_time()
    }

    /// Emits a byte snapshot. Returns `None` once stopped.
    pub fn report_bytes(&self, loaded: u64, total: u64) -> Option<ProgressSnapshot> {
        self.inner.emit(ProgressMode::Byte { loaded, total })
    }

    /// Shared counter for request body streams; all parts add to one total.
    pub fn byte_counter(&self, total: u64) -> ByteCounter {
        ByteCounter {
            inner: Arc::clone(&self.inner),
            loaded: Arc::new(AtomicU64::new(0)),
            total,
        }
    }

    /// Stops ticking. Returns `true` only for the call that actually stopped it.
    pub fn stop(&mut self) -> bool {
        let was_running = !self.inner.stopped.swap(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if was_running {
            tracing::debug!(session_id = %self.inner.session_id, "progress estimator stopped");
        }
        was_running
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Counts body bytes handed to the transport and reports them in byte mode.
#[derive(Debug, Clone)]
pub struct ByteCounter {
    inner: Arc<HandleInner>,
    loaded: Arc<AtomicU64>,
    total: u64,
}

impl ByteCounter {
    pub fn add(&self, n: u64) -> Option<ProgressSnapshot> {
        let loaded = self.loaded.fetch_add(n, Ordering::SeqCst) + n;
        self.inner.emit(ProgressMode::Byte {
            loaded: loaded.min(self.total),
            total: self.total,
        })
    }

    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn estimator(period_ms: u64) -> (ProgressEstimator, mpsc::UnboundedReceiver<ProgressSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ProgressEstimator::new(
                Duration::from_millis(period_ms),
                Duration::from_secs(10),
                tx,
            ),
            rx,
        )
    }

    #[test]
    fn time_percent_is_clamped() {
        let max = Duration::from_secs(10);
        assert_eq!(time_percent(Duration::ZERO, max), 0.0);
        assert_eq!(time_percent(Duration::from_secs(5), max), 50.0);
        assert_eq!(time_percent(Duration::from_secs(60), max), 100.0);
    }

    #[test]
    fn byte_percent_handles_zero_total() {
        assert_eq!(byte_percent(0, 0), 0.0);
        assert_eq!(byte_percent(250, 1000), 25.0);
        assert_eq!(byte_percent(1000, 1000), 100.0);
    }

    #[tokio::test]
    async fn ticks_are_tagged_with_session() {
        let (estimator, mut rx) = estimator(10);
        let id = SessionId::generate();
        let mut handle = estimator.start(id, Instant::now());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.session_id, id);
        assert!(matches!(first.mode, ProgressMode::Time { .. }));

        handle.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_silences_ticks() {
        let (estimator, mut rx) = estimator(1_000);
        let mut handle = estimator.start(SessionId::generate(), Instant::now());

        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(handle.is_stopped());

        while rx.try_recv().is_ok() {}
        assert!(handle.tick().is_none());
        assert!(handle.report_bytes(1, 2).is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn byte_counter_accumulates_across_parts() {
        let (estimator, mut rx) = estimator(60_000);
        let handle = estimator.start(SessionId::generate(), Instant::now());
        // drain the immediate first time tick
        let _ = rx.recv().await;

        let counter = handle.byte_counter(100);
        let other = counter.clone();
        counter.add(40);
        other.add(60);
        assert_eq!(counter.loaded(), 100);

        let _partial = rx.recv().await.unwrap();
        let last = rx.recv().await.unwrap();
        assert_eq!(
            last.mode,
            ProgressMode::Byte {
                loaded: 100,
                total: 100
            }
        );
    }

    #[tokio::test]
    async fn drop_stops_the_handle() {
        let (estimator, mut rx) = estimator(60_000);
        let handle = estimator.start(SessionId::generate(), Instant::now());
        let counter = handle.byte_counter(10);
        drop(handle);
        while rx.try_recv().is_ok() {}
        assert!(counter.add(5).is_none());
    }
}
