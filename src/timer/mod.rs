pub mod clock;
pub mod controller;
pub mod session;
pub mod state;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::WateringController;
pub use session::{PlantSession, PlantSnapshot};
pub use state::{
    CooldownState, CooldownStatus, WaterOutcome, WateringSnapshot, COOLDOWN_MS,
    WATERING_REWARD_POINTS,
};
pub use store::{KeyValueStore, MemoryStore, LAST_WATERED_KEY};
