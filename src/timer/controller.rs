use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::models::WateringRecord;
use crate::{log_debug, log_info, log_warn};

use super::{
    clock::Clock,
    state::{CooldownState, WaterOutcome, WateringSnapshot, COOLDOWN_MS, WATERING_REWARD_POINTS},
    store::{KeyValueStore, LAST_WATERED_KEY},
};

const ENABLE_LOGS: bool = true;

/// Upper bound on one expiry sleep. The wall clock is re-read after each
/// wake-up, so suspends and clock changes are picked up within this bound.
const MAX_EXPIRY_SLEEP_MS: i64 = 15 * 60 * 1000;

struct ExpiryTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cooldown-gated watering backed by one durable timestamp.
pub struct WateringController {
    state: Arc<Mutex<CooldownState>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    expiry: Mutex<Option<ExpiryTask>>,
    updates: Arc<watch::Sender<WateringSnapshot>>,
    /// Cancelled by `shutdown`; every expiry task runs on a child token.
    lifetime: CancellationToken,
}

impl WateringController {
    /// Reads the stored timestamp once. Unreadable or corrupted values are
    /// treated as "never watered".
    pub async fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let raw = match store.get(LAST_WATERED_KEY).await {
            Ok(raw) => raw,
            Err(err) => {
                log_warn!("Failed to read {LAST_WATERED_KEY}, treating plant as never watered: {err:#}");
                None
            }
        };

        let now = clock.now_ms();
        let mut record = WateringRecord::from_stored(raw.as_deref());
        if raw.is_some() && record.last_watered_at.is_none() {
            log_warn!("Ignoring corrupted {LAST_WATERED_KEY} value {:?}", raw);
        }
        if let Some(last) = record.last_watered_at {
            if last > now.saturating_add(COOLDOWN_MS) {
                log_warn!("Ignoring {LAST_WATERED_KEY} {last}ms: more than a cooldown window in the future");
                record = WateringRecord::never();
            }
        }

        let state = CooldownState::from_record(record, now);
        let (updates, _) = watch::channel(state.snapshot(now));
        log_info!(
            "Watering state loaded: {:?} (last watered {:?})",
            state.status,
            state.record.last_watered_at
        );

        let controller = Self {
            state: Arc::new(Mutex::new(state)),
            store,
            clock,
            expiry: Mutex::new(None),
            updates: Arc::new(updates),
            lifetime: CancellationToken::new(),
        };

        if let Some(last) = record.last_watered_at {
            if !controller.state.lock().await.can_water_at(now) {
                controller.arm_expiry(last).await;
            }
        }

        controller
    }

    pub async fn can_water_now(&self) -> bool {
        let mut state = self.state.lock().await;
        let now = self.clock.now_ms();
        if state.refresh(now) {
            self.updates.send_replace(state.snapshot(now));
        }
        state.can_water_at(now)
    }

    /// Grants at most one watering per cooldown window. A durable write
    /// failure is returned as an error and leaves the state untouched, and so
    /// does watering after `shutdown`.
    pub async fn water(&self) -> Result<WaterOutcome> {
        if self.is_shut_down() {
            bail!("watering controller has been shut down");
        }

        let mut state = self.state.lock().await;
        let now = self.clock.now_ms();
        state.refresh(now);

        if !state.can_water_at(now) {
            let outcome = WaterOutcome::Denied {
                next_eligible_at_ms: state.next_eligible_at().unwrap_or(now),
                remaining_ms: state.remaining_ms(now),
            };
            log_debug!("Watering denied, {}ms of cooldown left", state.remaining_ms(now));
            return Ok(outcome);
        }

        let stored = WateringRecord::at(now).to_stored().unwrap_or_default();
        self.store
            .set(LAST_WATERED_KEY, &stored)
            .await
            .context("failed to persist watering time")?;

        state.record_watering(now);
        self.updates.send_replace(state.snapshot(now));
        drop(state);

        self.arm_expiry(now).await;
        log_info!("Plant watered at {now}; next watering in {COOLDOWN_MS}ms");

        Ok(WaterOutcome::Granted {
            watered_at_ms: now,
            reward_points: WATERING_REWARD_POINTS,
        })
    }

    pub async fn snapshot(&self) -> WateringSnapshot {
        let mut state = self.state.lock().await;
        let now = self.clock.now_ms();
        state.refresh(now);
        state.snapshot(now)
    }

    pub async fn last_watered_at(&self) -> Option<i64> {
        self.state.lock().await.record.last_watered_at
    }

    /// Receives a fresh snapshot on every watering and every cooldown expiry.
    pub fn subscribe(&self) -> watch::Receiver<WateringSnapshot> {
        self.updates.subscribe()
    }

    /// Cancels the pending expiry check and waits for it to wind down. The
    /// controller stays readable but refuses further waterings.
    pub async fn shutdown(&self) {
        self.lifetime.cancel();
        if let Some(task) = self.expiry.lock().await.take() {
            task.cancel_token.cancel();
            let _ = task.handle.await;
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    pub async fn has_pending_expiry(&self) -> bool {
        self.expiry
            .lock()
            .await
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// Replaces any pending expiry check with one armed for `armed_for`.
    async fn arm_expiry(&self, armed_for: i64) {
        let mut guard = self.expiry.lock().await;
        if let Some(previous) = guard.take() {
            previous.cancel_token.cancel();
            previous.handle.abort();
        }
        if self.lifetime.is_cancelled() {
            return;
        }

        let cancel_token = self.lifetime.child_token();
        let handle = tokio::spawn(expiry_loop(
            self.state.clone(),
            self.clock.clone(),
            self.updates.clone(),
            armed_for,
            cancel_token.clone(),
        ));

        *guard = Some(ExpiryTask {
            cancel_token,
            handle,
        });
    }
}

impl Drop for WateringController {
    fn drop(&mut self) {
        self.lifetime.cancel();
        if let Some(task) = self.expiry.get_mut().take() {
            task.cancel_token.cancel();
            task.handle.abort();
        }
    }
}

async fn expiry_loop(
    state: Arc<Mutex<CooldownState>>,
    clock: Arc<dyn Clock>,
    updates: Arc<watch::Sender<WateringSnapshot>>,
    armed_for: i64,
    cancel_token: CancellationToken,
) {
    loop {
        let remaining = {
            let mut guard = state.lock().await;
            if cancel_token.is_cancelled() || guard.record.last_watered_at != Some(armed_for) {
                // Superseded by a newer watering.
                return;
            }

            let now = clock.now_ms();
            if guard.can_water_at(now) {
                if guard.refresh(now) {
                    updates.send_replace(guard.snapshot(now));
                    log_info!("Watering cooldown expired; plant can be watered again");
                }
                return;
            }
            guard.remaining_ms(now)
        };

        let sleep_ms = remaining.clamp(1, MAX_EXPIRY_SLEEP_MS) as u64;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
            _ = cancel_token.cancelled() => return,
        }
    }
}
