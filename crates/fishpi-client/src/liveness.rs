//! Runtime liveness tracking: clocked wrapper around `LivenessState`, the
//! delayed progress report, and the periodic server sync.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;

use fishpi_core::liveness::{estimate, ActiveWindow, Bump, LivenessState};

use crate::api::FishPiApi;
use crate::obs::Sink;

pub const REPORT_DELAY: Duration = Duration::from_secs(30);
pub const SYNC_EVERY: Duration = Duration::from_secs(10 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Periodic sync hook. Returning a score replaces the local one.
#[async_trait]
pub trait ScoreSync: Send + Sync {
    async fn sync(&self, score: f64) -> Option<f64>;
}

/// Refreshes the score from `GET /user/liveness`.
pub struct ApiScoreSync(pub Arc<dyn FishPiApi>);

#[async_trait]
impl ScoreSync for ApiScoreSync {
    async fn sync(&self, score: f64) -> Option<f64> {
        match self.0.liveness().await {
            Ok(server) => {
                tracing::debug!(local = score, server, "liveness synced");
                Some(server)
            }
            Err(e) => {
                tracing::warn!(error = %e, "liveness sync failed");
                None
            }
        }
    }
}

pub struct LivenessTracker {
    state: Arc<Mutex<LivenessState>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn Sink>,
    report_delay: Duration,
    sync_every: Duration,
}

impl LivenessTracker {
    pub fn new(score: f64, window: Option<ActiveWindow>, sink: Arc<dyn Sink>) -> Self {
        Self::with_clock(score, window, sink, Arc::new(SystemClock))
    }

    pub fn with_clock(
        score: f64,
        window: Option<ActiveWindow>,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = LivenessState::new(score, clock.now(), window);
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
            sink,
            report_delay: REPORT_DELAY,
            sync_every: SYNC_EVERY,
        }
    }

    pub fn report_delay(mut self, d: Duration) -> Self {
        self.report_delay = d;
        self
    }

    pub fn sync_every(mut self, d: Duration) -> Self {
        self.sync_every = d;
        self
    }

    fn lock(&self) -> MutexGuard<'_, LivenessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn score(&self) -> f64 {
        self.lock().score()
    }

    /// Credit one qualifying action. An accepted bump schedules a progress
    /// line on the sink after the report delay.
    pub fn record_activity(&self) -> Bump {
        let bump = self.lock().record_activity(self.clock.now());
        match bump {
            Bump::Accepted(score) => {
                tracing::debug!(score, "liveness bumped");
                let state = self.state.clone();
                let sink = self.sink.clone();
                let delay = self.report_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let score = state.lock().unwrap_or_else(PoisonError::into_inner).score();
                    sink.show(&estimate(score).to_string());
                });
            }
            Bump::Complete => tracing::debug!("liveness already complete"),
            Bump::TooSoon | Bump::OutsideWindow => {}
        }
        bump
    }

    /// Every `sync_every`, roll the day and hand the score to `sync`. The
    /// loop ends once the score reaches the cap.
    pub fn spawn_sync(&self, sync: Arc<dyn ScoreSync>) -> JoinHandle<()> {
        let state = self.state.clone();
        let clock = self.clock.clone();
        let every = self.sync_every;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tick.tick().await;
            loop {
                tick.tick().await;
                let score = {
                    let mut s = state.lock().unwrap_or_else(PoisonError::into_inner);
                    if s.roll_day(clock.now()) {
                        tracing::info!("new day, liveness reset");
                    }
                    if s.is_complete() {
                        break;
                    }
                    s.score()
                };
                if let Some(server) = sync.sync(score).await {
                    state
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .set_score(server);
                }
            }
            tracing::info!("liveness complete, sync stopped");
        })
    }
}
