use serde::{Deserialize, Serialize};

use crate::models::WateringRecord;

/// A plant can be watered again once this much time has passed.
pub const COOLDOWN_MS: i64 = 24 * 60 * 60 * 1000;

/// Growth Points attached to a granted watering. Informational only.
pub const WATERING_REWARD_POINTS: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CooldownStatus {
    Eligible,
    CoolingDown,
}

impl Default for CooldownStatus {
    fn default() -> Self {
        CooldownStatus::Eligible
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CooldownState {
    pub status: CooldownStatus,
    pub record: WateringRecord,
    #[serde(skip)]
    pub cooldown_ms: i64,
}

impl Default for CooldownState {
    fn default() -> Self {
        Self {
            status: CooldownStatus::Eligible,
            record: WateringRecord::never(),
            cooldown_ms: COOLDOWN_MS,
        }
    }
}

impl CooldownState {
    /// Derives the status from a stored record eagerly, at load time.
    pub fn from_record(record: WateringRecord, now_ms: i64) -> Self {
        let mut state = Self {
            record,
            ..Self::default()
        };
        state.refresh(now_ms);
        state
    }

    /// Elapsed time equal to the window counts as eligible.
    pub fn can_water_at(&self, now_ms: i64) -> bool {
        match self.record.last_watered_at {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.cooldown_ms,
        }
    }

    pub fn next_eligible_at(&self) -> Option<i64> {
        self.record
            .last_watered_at
            .map(|last| last.saturating_add(self.cooldown_ms))
    }

    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        match self.next_eligible_at() {
            Some(at) => at.saturating_sub(now_ms).max(0),
            None => 0,
        }
    }

    /// Re-evaluates the status against `now_ms`; returns true when it changed.
    pub fn refresh(&mut self, now_ms: i64) -> bool {
        let next = if self.can_water_at(now_ms) {
            CooldownStatus::Eligible
        } else {
            CooldownStatus::CoolingDown
        };
        let changed = next != self.status;
        self.status = next;
        changed
    }

    pub fn record_watering(&mut self, now_ms: i64) {
        self.record = WateringRecord::at(now_ms);
        self.status = CooldownStatus::CoolingDown;
    }

    pub fn snapshot(&self, now_ms: i64) -> WateringSnapshot {
        WateringSnapshot {
            status: self.status,
            last_watered_at_ms: self.record.last_watered_at,
            next_eligible_at_ms: self.next_eligible_at(),
            remaining_ms: self.remaining_ms(now_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WateringSnapshot {
    pub status: CooldownStatus,
    pub last_watered_at_ms: Option<i64>,
    pub next_eligible_at_ms: Option<i64>,
    pub remaining_ms: i64,
}

/// Result of a watering attempt. `Denied` is an ordinary answer, not a failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum WaterOutcome {
    #[serde(rename_all = "camelCase")]
    Granted {
        watered_at_ms: i64,
        reward_points: u32,
    },
    #[serde(rename_all = "camelCase")]
    Denied {
        next_eligible_at_ms: i64,
        remaining_ms: i64,
    },
}

impl WaterOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, WaterOutcome::Granted { .. })
    }

    /// Notice text for the rendering layer.
    pub fn message(&self) -> String {
        match self {
            WaterOutcome::Granted { reward_points, .. } => {
                format!("Your plant has been watered. +{reward_points} GP")
            }
            WaterOutcome::Denied { remaining_ms, .. } => {
                let total_minutes = (remaining_ms + 59_999) / 60_000;
                format!(
                    "Your plant is still hydrated. Try again in {}h {}m.",
                    total_minutes / 60,
                    total_minutes % 60
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 60 * 60 * 1000;
    const NOW: i64 = 1_750_000_000_000;

    #[test]
    fn never_watered_is_eligible() {
        let state = CooldownState::from_record(WateringRecord::never(), NOW);
        assert_eq!(state.status, CooldownStatus::Eligible);
        assert!(state.can_water_at(NOW));
        assert_eq!(state.remaining_ms(NOW), 0);
        assert_eq!(state.next_eligible_at(), None);
    }

    #[test]
    fn boundary_is_inclusive() {
        let state = CooldownState::from_record(WateringRecord::at(NOW - COOLDOWN_MS), NOW);
        assert_eq!(state.status, CooldownStatus::Eligible);

        let state = CooldownState::from_record(WateringRecord::at(NOW - COOLDOWN_MS + 1), NOW);
        assert_eq!(state.status, CooldownStatus::CoolingDown);
        assert_eq!(state.remaining_ms(NOW), 1);
    }

    #[test]
    fn future_timestamp_cools_down_until_window_past_it() {
        let state = CooldownState::from_record(WateringRecord::at(NOW + HOUR), NOW);
        assert_eq!(state.status, CooldownStatus::CoolingDown);
        assert_eq!(state.remaining_ms(NOW), COOLDOWN_MS + HOUR);
    }

    #[test]
    fn refresh_reports_flip_once() {
        let mut state = CooldownState::from_record(WateringRecord::at(NOW - HOUR), NOW);
        assert!(!state.refresh(NOW));
        assert!(state.refresh(NOW - HOUR + COOLDOWN_MS));
        assert_eq!(state.status, CooldownStatus::Eligible);
        assert!(!state.refresh(NOW + COOLDOWN_MS));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let granted = WaterOutcome::Granted {
            watered_at_ms: NOW,
            reward_points: WATERING_REWARD_POINTS,
        };
        let json = serde_json::to_value(&granted).unwrap();
        assert_eq!(json["outcome"], "granted");
        assert_eq!(json["rewardPoints"], 10);
    }

    #[test]
    fn denied_message_rounds_up_minutes() {
        let denied = WaterOutcome::Denied {
            next_eligible_at_ms: NOW + 90 * 60 * 1000 + 1,
            remaining_ms: 90 * 60 * 1000 + 1,
        };
        assert_eq!(
            denied.message(),
            "Your plant is still hydrated. Try again in 1h 31m."
        );
        assert!(!denied.is_granted());
    }
}
