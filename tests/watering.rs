use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use plant_garden_lib::{
    db::Database,
    models::LifecycleState,
    timer::{
        Clock, CooldownStatus, KeyValueStore, ManualClock, MemoryStore, PlantSession,
        WaterOutcome, WateringController, COOLDOWN_MS, LAST_WATERED_KEY, WATERING_REWARD_POINTS,
    },
};
use serde_json::json;
use tempfile::tempdir;

const HOUR: i64 = 60 * 60 * 1000;
const T0: i64 = 1_750_000_000_000;

/// Wall clock driven by tokio's (pausable) time source.
struct TokioClock {
    origin: tokio::time::Instant,
    base_ms: i64,
}

impl TokioClock {
    fn starting_at(base_ms: i64) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            base_ms,
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.base_ms + self.origin.elapsed().as_millis() as i64
    }
}

/// Reads nothing back and refuses every write.
struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage is read-only"))
    }
}

async fn controller_with(store: &MemoryStore, clock: &ManualClock) -> WateringController {
    WateringController::load(Arc::new(store.clone()), Arc::new(clock.clone())).await
}

#[tokio::test]
async fn never_watered_plant_can_be_watered() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;

    assert!(controller.can_water_now().await);
    assert!(!controller.has_pending_expiry().await);

    let outcome = controller.water().await.unwrap();
    assert_eq!(
        outcome,
        WaterOutcome::Granted {
            watered_at_ms: T0,
            reward_points: WATERING_REWARD_POINTS,
        }
    );
    assert_eq!(store.peek(LAST_WATERED_KEY).as_deref(), Some("1750000000000"));
    assert!(!controller.can_water_now().await);
    assert!(controller.has_pending_expiry().await);
}

#[tokio::test]
async fn watering_after_a_day_is_granted() {
    let store = MemoryStore::with_slot(LAST_WATERED_KEY, &(T0 - 25 * HOUR).to_string());
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;

    assert!(controller.can_water_now().await);
    assert!(controller.water().await.unwrap().is_granted());
    assert_eq!(controller.last_watered_at().await, Some(T0));
}

#[tokio::test]
async fn watering_within_cooldown_is_denied_without_writing() {
    let stored = (T0 - HOUR).to_string();
    let store = MemoryStore::with_slot(LAST_WATERED_KEY, &stored);
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;

    assert!(!controller.can_water_now().await);
    assert!(controller.has_pending_expiry().await);

    let outcome = controller.water().await.unwrap();
    assert_eq!(
        outcome,
        WaterOutcome::Denied {
            next_eligible_at_ms: T0 + 23 * HOUR,
            remaining_ms: 23 * HOUR,
        }
    );
    assert_eq!(
        outcome.message(),
        "Your plant is still hydrated. Try again in 23h 0m."
    );
    assert_eq!(store.peek(LAST_WATERED_KEY), Some(stored));
}

#[tokio::test]
async fn exactly_one_window_later_is_eligible() {
    let store = MemoryStore::with_slot(LAST_WATERED_KEY, &(T0 - COOLDOWN_MS).to_string());
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;

    assert!(controller.can_water_now().await);
    assert!(!controller.has_pending_expiry().await);
}

#[tokio::test]
async fn second_watering_in_the_same_window_is_denied() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;

    assert!(controller.water().await.unwrap().is_granted());
    clock.advance(COOLDOWN_MS - 1);
    assert!(!controller.water().await.unwrap().is_granted());

    clock.advance(1);
    assert!(controller.can_water_now().await);
    let outcome = controller.water().await.unwrap();
    assert_eq!(
        outcome,
        WaterOutcome::Granted {
            watered_at_ms: T0 + COOLDOWN_MS,
            reward_points: WATERING_REWARD_POINTS,
        }
    );
}

#[tokio::test]
async fn corrupted_timestamp_counts_as_never_watered() {
    for stored in ["not-a-number", "", "-5", "12.5"] {
        let store = MemoryStore::with_slot(LAST_WATERED_KEY, stored);
        let clock = ManualClock::new(T0);
        let controller = controller_with(&store, &clock).await;

        assert!(controller.can_water_now().await, "stored {stored:?}");
        assert_eq!(controller.last_watered_at().await, None);
        assert!(controller.water().await.unwrap().is_granted());
        assert_eq!(store.peek(LAST_WATERED_KEY), Some(T0.to_string()));
    }
}

#[tokio::test]
async fn far_future_timestamp_is_ignored() {
    let store = MemoryStore::with_slot(LAST_WATERED_KEY, &(T0 + 48 * HOUR).to_string());
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;

    assert!(controller.can_water_now().await);
}

#[tokio::test]
async fn failed_write_leaves_state_untouched() {
    let clock = ManualClock::new(T0);
    let controller = WateringController::load(Arc::new(BrokenStore), Arc::new(clock)).await;

    assert!(controller.can_water_now().await);
    let err = controller.water().await.unwrap_err();
    assert!(format!("{err:#}").contains("storage is read-only"));

    assert!(controller.can_water_now().await);
    assert_eq!(controller.last_watered_at().await, None);
    assert!(!controller.has_pending_expiry().await);
}

#[tokio::test]
async fn snapshot_serializes_for_the_rendering_layer() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(T0);
    let controller = controller_with(&store, &clock).await;
    controller.water().await.unwrap();
    clock.advance(HOUR);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.status, CooldownStatus::CoolingDown);
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        json!({
            "status": "coolingDown",
            "lastWateredAtMs": T0,
            "nextEligibleAtMs": T0 + COOLDOWN_MS,
            "remainingMs": COOLDOWN_MS - HOUR,
        })
    );

    let granted = WaterOutcome::Granted {
        watered_at_ms: T0,
        reward_points: WATERING_REWARD_POINTS,
    };
    assert_eq!(
        serde_json::to_value(&granted).unwrap(),
        json!({ "outcome": "granted", "wateredAtMs": T0, "rewardPoints": 10 })
    );
}

#[tokio::test]
async fn watering_time_survives_a_database_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garden.sqlite3");
    let clock = ManualClock::new(T0);

    {
        let db = Database::new(path.clone()).unwrap();
        let session = PlantSession::open(Arc::new(db), Arc::new(clock.clone())).await;
        assert!(session.water().await.unwrap().is_granted());
        session.end().await;
    }

    clock.advance(HOUR);
    let db = Database::new(path).unwrap();
    assert_eq!(
        db.get_slot(LAST_WATERED_KEY.to_string()).await.unwrap(),
        Some(T0.to_string())
    );

    let session = PlantSession::open(Arc::new(db), Arc::new(clock.clone())).await;
    assert!(!session.can_water_now().await);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.watering.remaining_ms, COOLDOWN_MS - HOUR);

    clock.advance(COOLDOWN_MS - HOUR);
    assert!(session.can_water_now().await);
    session.end().await;
}

#[tokio::test(start_paused = true)]
async fn cooldown_expiry_is_published_without_polling() {
    let controller = WateringController::load(
        Arc::new(MemoryStore::new()),
        Arc::new(TokioClock::starting_at(T0)),
    )
    .await;
    let mut updates = controller.subscribe();

    assert!(controller.water().await.unwrap().is_granted());
    updates.borrow_and_update();

    let became_eligible = tokio::time::timeout(Duration::from_secs(25 * 60 * 60), async {
        loop {
            updates.changed().await.unwrap();
            if updates.borrow_and_update().status == CooldownStatus::Eligible {
                break;
            }
        }
    })
    .await;

    assert!(became_eligible.is_ok(), "cooldown never expired");
    assert!(controller.can_water_now().await);
    assert!(!controller.has_pending_expiry().await);
}

#[tokio::test(start_paused = true)]
async fn rewatering_replaces_the_pending_expiry_check() {
    let clock = ManualClock::new(T0);
    let controller = controller_with(&MemoryStore::new(), &clock).await;
    let mut updates = controller.subscribe();

    assert!(controller.water().await.unwrap().is_granted());
    clock.advance(COOLDOWN_MS);
    assert!(controller.water().await.unwrap().is_granted());
    updates.borrow_and_update();

    tokio::time::sleep(Duration::from_secs(2 * 60 * 60)).await;

    assert!(!updates.has_changed().unwrap());
    assert_eq!(controller.snapshot().await.status, CooldownStatus::CoolingDown);
    assert_eq!(controller.last_watered_at().await, Some(T0 + COOLDOWN_MS));
    assert!(controller.has_pending_expiry().await);
}

#[tokio::test(start_paused = true)]
async fn ending_the_session_cancels_the_expiry_check() {
    let session = PlantSession::open(
        Arc::new(MemoryStore::new()),
        Arc::new(TokioClock::starting_at(T0)),
    )
    .await;
    let mut updates = session.watering().subscribe();

    session.water().await.unwrap();
    updates.borrow_and_update();
    assert!(session.watering().has_pending_expiry().await);

    session.end().await;
    assert!(!session.watering().has_pending_expiry().await);

    tokio::time::sleep(Duration::from_secs(25 * 60 * 60)).await;
    assert!(!updates.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn ended_session_refuses_to_water() {
    let store = MemoryStore::new();
    let session = PlantSession::open(
        Arc::new(store.clone()),
        Arc::new(TokioClock::starting_at(T0)),
    )
    .await;
    session.end().await;

    let err = session.water().await.unwrap_err();
    assert!(err.to_string().contains("shut down"));
    assert!(session.watering().is_shut_down());
    assert!(!session.watering().has_pending_expiry().await);
    assert_eq!(store.peek(LAST_WATERED_KEY), None);

    assert!(session.can_water_now().await);
    assert_eq!(session.snapshot().await.watering.status, CooldownStatus::Eligible);
}

#[tokio::test]
async fn unreadable_store_fails_open() {
    let controller =
        WateringController::load(Arc::new(BrokenStore), Arc::new(ManualClock::new(T0))).await;
    assert!(controller.can_water_now().await);
}

#[tokio::test]
async fn lifecycle_is_user_selected() {
    let session = PlantSession::open(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(T0)),
    )
    .await;
    assert_eq!(session.lifecycle().await, LifecycleState::Growing);

    let previous = session.set_lifecycle(LifecycleState::Wilting).await;
    assert_eq!(previous, LifecycleState::Growing);
    assert_eq!(
        session.set_lifecycle_str("sprout").await.unwrap(),
        LifecycleState::Sprout
    );

    assert!(session.set_lifecycle_str("dead").await.is_err());
    assert_eq!(session.lifecycle().await, LifecycleState::Sprout);

    let snapshot = serde_json::to_value(session.snapshot().await).unwrap();
    assert_eq!(snapshot["lifecycle"], "sprout");
    assert_eq!(snapshot["sessionId"], session.id());
    assert_eq!(snapshot["watering"]["status"], "eligible");
}
