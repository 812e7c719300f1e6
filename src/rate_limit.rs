use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::error::ConfigError;
use crate::metrics::RATE_LIMIT_KEYS;

// At most `limit` admitted requests per key within any trailing `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    limit: NonZeroU32,
    window: Duration,
}

impl RateLimitConfig {
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        let limit = NonZeroU32::new(limit).ok_or(ConfigError::ZeroLimit)?;
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { limit, window })
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

// Admitted request instants for one client key, oldest first
#[derive(Debug, Default)]
pub struct RateWindow {
    timestamps: VecDeque<Instant>,
}

impl RateWindow {
    // a timestamp exactly `window` old is still inside
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    // check and append happen under the caller's lock, so two callers can't both take the last slot
    fn try_admit(&mut self, now: Instant, config: &RateLimitConfig) -> bool {
        self.prune(now, config.window);
        if self.len() >= config.limit() as usize {
            return false;
        }
        self.timestamps.push_back(now);
        true
    }

    fn last_seen(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

// key -> window, behind one lock for the whole map
struct Registry {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl Registry {
    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        if let Some(window) = windows.get_mut(key) {
            return window.try_admit(now, &self.config);
        }
        // first request from this key
        windows
            .entry(key.to_owned())
            .or_default()
            .try_admit(now, &self.config)
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let idle = self.config.window * 2;
        let mut windows = self.windows.lock();
        let before = windows.len();

        windows.retain(|_, window| {
            window
                .last_seen()
                .is_some_and(|last| now.saturating_duration_since(last) <= idle)
        });

        before - windows.len()
    }

    fn len(&self) -> usize {
        self.windows.lock().len()
    }
}

struct Sweeper {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Decides, per inbound request, whether a client may proceed. Dropping the
/// controller stops its sweeper.
pub struct AdmissionController {
    registry: Arc<Registry>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl AdmissionController {
    // no background sweeper; idle keys only go through sweep_at
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            registry: Arc::new(Registry {
                config,
                windows: Mutex::new(HashMap::new()),
            }),
            sweeper: Mutex::new(None),
        }
    }

    /// Spawns the sweeper on the current tokio runtime.
    pub fn start(config: RateLimitConfig, sweep_interval: Duration) -> Self {
        let controller = Self::new(config);
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(sweep_loop(
            Arc::clone(&controller.registry),
            sweep_interval.max(Duration::from_millis(1)),
            stop_rx,
        ));
        *controller.sweeper.lock() = Some(Sweeper { stop_tx, handle });
        controller
    }

    pub fn config(&self) -> RateLimitConfig {
        self.registry.config
    }

    pub fn allow(&self, key: &str) -> bool {
        self.registry.allow_at(key, Instant::now())
    }

    // instants passed for one key should not go backwards
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        self.registry.allow_at(key, now)
    }

    // evicts keys idle for more than twice the window, returns how many
    pub fn sweep_at(&self, now: Instant) -> usize {
        self.registry.sweep_at(now)
    }

    pub fn tracked_keys(&self) -> usize {
        self.registry.len()
    }

    // hint handed to rejected clients
    pub fn retry_after(&self) -> Duration {
        self.registry.config.window
    }

    /// Halts the sweeper. The handle resolves once the task has exited;
    /// later calls return `None`. `allow` keeps working afterwards.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let sweeper = self.sweeper.lock().take()?;
        let _ = sweeper.stop_tx.send(());
        Some(sweeper.handle)
    }
}

impl Drop for AdmissionController {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

async fn sweep_loop(
    registry: Arc<Registry>,
    every: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick fires immediately
    ticker.tick().await;

    tracing::info!(interval = ?every, "rate limit sweeper started");

    loop {
        tokio::select! {
            // an explicit stop or a dropped sender both end the loop
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let evicted = registry.sweep_at(Instant::now());
                let remaining = registry.len();
                RATE_LIMIT_KEYS.set(remaining as f64);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining, "evicted idle rate limit keys");
                }
            }
        }
    }

    tracing::info!("rate limit sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(limit: u32, window: Duration) -> AdmissionController {
        AdmissionController::new(RateLimitConfig::new(limit, window).unwrap())
    }

    #[test]
    fn config_rejects_zero_values() {
        assert_eq!(
            RateLimitConfig::new(0, Duration::from_secs(1)),
            Err(ConfigError::ZeroLimit)
        );
        assert_eq!(
            RateLimitConfig::new(3, Duration::ZERO),
            Err(ConfigError::ZeroWindow)
        );
    }

    #[test]
    fn fourth_call_in_window_is_rejected() {
        let limiter = controller(3, Duration::from_secs(1));
        let t0 = Instant::now();

        let results: Vec<bool> = (0..4)
            .map(|i| limiter.allow_at("clientA", t0 + Duration::from_millis(i)))
            .collect();
        assert_eq!(results, vec![true, true, true, false]);

        assert!(limiter.allow_at("clientA", t0 + Duration::from_millis(1100)));
    }

    #[test]
    fn rejection_is_not_recorded() {
        let limiter = controller(1, Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(limiter.allow_at("k", t0));
        for s in 1..10 {
            assert!(!limiter.allow_at("k", t0 + Duration::from_secs(s)));
        }
        // only the admitted request at t0 counts, so room opens right after it ages out
        assert!(limiter.allow_at("k", t0 + Duration::from_millis(10_001)));
    }

    #[test]
    fn window_lower_bound_is_inclusive() {
        let limiter = controller(1, Duration::from_secs(1));
        let t0 = Instant::now();

        assert!(limiter.allow_at("edge", t0));
        assert!(!limiter.allow_at("edge", t0 + Duration::from_secs(1)));
        assert!(limiter.allow_at("edge", t0 + Duration::from_secs(1) + Duration::from_nanos(1)));
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = controller(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.allow_at("clientA", t0));
        assert!(limiter.allow_at("clientB", t0));
        assert!(limiter.allow_at("clientA", t0));
        assert!(!limiter.allow_at("clientA", t0));
        assert!(limiter.allow_at("clientB", t0));
        assert!(!limiter.allow_at("clientB", t0));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn retained_timestamps_stay_inside_window() {
        let window = Duration::from_millis(500);
        let limiter = controller(100, window);
        let t0 = Instant::now();

        for i in 0..40 {
            let now = t0 + Duration::from_millis(i * 50);
            assert!(limiter.allow_at("k", now));

            let windows = limiter.registry.windows.lock();
            let log = &windows["k"];
            assert!(log.timestamps.iter().all(|&t| t + window >= now));
        }
    }

    #[test]
    fn sweep_evicts_only_keys_idle_for_two_windows() {
        let limiter = controller(5, Duration::from_secs(1));
        let t0 = Instant::now();

        limiter.allow_at("stale", t0);
        limiter.allow_at("fresh", t0 + Duration::from_millis(1500));

        let evicted = limiter.sweep_at(t0 + Duration::from_millis(2500));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.registry.windows.lock().contains_key("fresh"));
    }

    #[test]
    fn concurrent_callers_never_exceed_limit() {
        let limiter = controller(50, Duration::from_secs(60));

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    scope.spawn(|| (0..10).filter(|_| limiter.allow("shared")).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn admits_again_after_window_elapses() {
        let limiter = controller(3, Duration::from_secs(1));

        assert!(limiter.allow("clientA"));
        assert!(limiter.allow("clientA"));
        assert!(limiter.allow("clientA"));
        assert!(!limiter.allow("clientA"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.allow("clientA"));
    }

    #[tokio::test]
    async fn background_sweeper_evicts_idle_keys() {
        let config = RateLimitConfig::new(10, Duration::from_millis(50)).unwrap();
        let limiter = AdmissionController::start(config, Duration::from_millis(20));

        limiter.allow("one-off");
        assert_eq!(limiter.tracked_keys(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn stop_halts_sweeper_once() {
        let config = RateLimitConfig::new(10, Duration::from_millis(50)).unwrap();
        let limiter = AdmissionController::start(config, Duration::from_millis(20));

        let handle = limiter.stop().expect("sweeper should be running");
        handle.await.unwrap();
        assert!(limiter.stop().is_none());

        // nothing reclaims the key any more
        limiter.allow("lingering");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.allow("lingering"));
    }

    #[test]
    fn repeat_key_reuses_its_window() {
        let limiter = controller(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.allow_at("same", t0));
        assert!(limiter.allow_at("same", t0 + Duration::from_millis(1)));
        assert!(!limiter.allow_at("same", t0 + Duration::from_millis(2)));
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.registry.windows.lock()["same"].len(), 2);
    }
}
