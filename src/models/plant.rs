use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

/// Display mode of a plant. Chosen by the user; any state may follow any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Sprout,
    Growing,
    Bloomed,
    Wilting,
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Growing
    }
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 4] = [
        LifecycleState::Sprout,
        LifecycleState::Growing,
        LifecycleState::Bloomed,
        LifecycleState::Wilting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Sprout => "sprout",
            LifecycleState::Growing => "growing",
            LifecycleState::Bloomed => "bloomed",
            LifecycleState::Wilting => "wilting",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sprout" => Ok(LifecycleState::Sprout),
            "growing" => Ok(LifecycleState::Growing),
            "bloomed" => Ok(LifecycleState::Bloomed),
            "wilting" => Ok(LifecycleState::Wilting),
            other => Err(anyhow!("unknown lifecycle state '{other}'")),
        }
    }
}

/// The single durable watering timestamp for a plant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WateringRecord {
    /// Milliseconds since the Unix epoch; `None` when never watered.
    pub last_watered_at: Option<i64>,
}

impl WateringRecord {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn at(ms: i64) -> Self {
        Self {
            last_watered_at: Some(ms),
        }
    }

    /// Reads a stored slot value. Anything that is not a non-negative integer
    /// counts as never watered.
    pub fn from_stored(raw: Option<&str>) -> Self {
        let parsed = raw
            .map(str::trim)
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|ms| *ms >= 0);

        Self {
            last_watered_at: parsed,
        }
    }

    pub fn to_stored(&self) -> Option<String> {
        self.last_watered_at.map(|ms| ms.to_string())
    }
}
