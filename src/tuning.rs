//! Data-driven game balance
//!
//! All pacing knobs in one serializable struct so a balance pass is a
//! JSON edit, not a rebuild. Missing fields fall back to the shipped
//! defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("cannot read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub start_lives: u32,
    pub final_death_pause: f32,
    pub boss_wave_wait: f32,
    pub level_time: f32,
    pub wave_interval_base: f32,
    pub wave_interval_scale: f32,
    pub wave_interval_min: f32,
    pub waves_cleared_pause: f32,
    pub min_powerup_spawn_time: f32,
    pub max_powerup_spawn_time: f32,
    pub max_combo: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            start_lives: consts::START_LIVES,
            final_death_pause: consts::FINAL_DEATH_PAUSE,
            boss_wave_wait: consts::BOSS_WAVE_WAIT,
            level_time: consts::LEVEL_TIME,
            wave_interval_base: consts::WAVE_INTERVAL_BASE,
            wave_interval_scale: consts::WAVE_INTERVAL_SCALE,
            wave_interval_min: consts::WAVE_INTERVAL_MIN,
            waves_cleared_pause: consts::WAVES_CLEARED_PAUSE,
            min_powerup_spawn_time: consts::MIN_POWERUP_SPAWN_TIME,
            max_powerup_spawn_time: consts::MAX_POWERUP_SPAWN_TIME,
            max_combo: consts::MAX_COMBO,
        }
    }
}

impl Tuning {
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load `path` if it exists, otherwise the defaults. A malformed file
    /// is reported and ignored rather than aborting the game.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(tuning) => tuning,
            Err(err) => {
                log::warn!("ignoring tuning file {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_in_defaults() {
        let t: Tuning = serde_json::from_str(r#"{ "start_lives": 5 }"#).unwrap();
        assert_eq!(t.start_lives, 5);
        assert_eq!(t.level_time, consts::LEVEL_TIME);
        assert_eq!(t.max_combo, consts::MAX_COMBO);
    }

    #[test]
    fn defaults_round_trip_through_json() {
        let t = Tuning::default();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tuning = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_lives, t.start_lives);
        assert_eq!(back.wave_interval_base, t.wave_interval_base);
    }
}
