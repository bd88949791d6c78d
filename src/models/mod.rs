pub mod identification;
pub mod plant;

pub use identification::{IdentificationRequest, IdentificationResult};
pub use plant::{LifecycleState, WateringRecord};
