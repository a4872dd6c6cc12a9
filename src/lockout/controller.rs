use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::api::{LoginEvent, LoginEventFeed};

use super::LockState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Countdown re-armed from the newest login event. Owns at most one ticker.
#[derive(Clone)]
pub struct LockoutCountdown {
    state: Arc<Mutex<LockState>>,
    state_tx: Arc<watch::Sender<LockState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl LockoutCountdown {
    pub fn new(total_duration: u32) -> Self {
        let initial = LockState::new(total_duration);
        let (state_tx, _) = watch::channel(initial);
        Self {
            state: Arc::new(Mutex::new(initial)),
            state_tx: Arc::new(state_tx),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub async fn snapshot(&self) -> LockState {
        *self.state.lock().await
    }

    pub fn subscribe(&self) -> watch::Receiver<LockState> {
        self.state_tx.subscribe()
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Arms the lock when the newest event says `locked`, clears it otherwise.
    pub async fn ingest(&self, latest: Option<&LoginEvent>) -> LockState {
        let locked = latest.map(LoginEvent::is_locked).unwrap_or(false);

        let mut ticker = self.ticker.lock().await;
        if let Some(handle) = ticker.take() {
            handle.abort();
        }

        let (snapshot, epoch) = {
            let mut state = self.state.lock().await;
            let epoch = if locked { state.arm() } else { state.clear() };
            (*state, epoch)
        };
        self.state_tx.send_replace(snapshot);

        if snapshot.locked {
            log_info!(
                "login locked by server; counting down {}s",
                snapshot.remaining_seconds
            );
            *ticker = Some(self.spawn_ticker(epoch));
        }
        snapshot
    }

    pub async fn ingest_feed(&self, feed: &LoginEventFeed) -> LockState {
        self.ingest(feed.latest()).await
    }

    pub async fn teardown(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
        self.state.lock().await.epoch += 1;
        log_debug!("lockout countdown torn down");
    }

    fn spawn_ticker(&self, epoch: u64) -> JoinHandle<()> {
        let state = self.state.clone();
        let state_tx = self.state_tx.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            // First tick one period out; `interval` would fire immediately.
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;

                let snapshot = {
                    let mut guard = state.lock().await;
                    if guard.epoch != epoch {
                        break;
                    }
                    guard.tick();
                    *guard
                };
                state_tx.send_replace(snapshot);

                if !snapshot.locked {
                    log_info!("lockout expired");
                    break;
                }
            }
        })
    }
}
