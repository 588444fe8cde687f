//! Keystorm - a typing-combat arcade game
//!
//! Core modules:
//! - `sim`: Deterministic session engine (entities, waves, typing, scoring)
//! - `phrasebook`: Phrase source with start-character reservation
//! - `highscores`: Leaderboard persistence
//! - `tuning`: Data-driven game balance

pub mod highscores;
pub mod phrasebook;
pub mod sim;
pub mod tuning;

pub use highscores::HighScores;
pub use phrasebook::PhraseBook;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Playfield bounds; the player sits at the origin and enemies
    /// spawn along the top edge.
    pub const SCREEN_TOP: f32 = 1000.0;
    pub const SCREEN_BOTTOM: f32 = -100.0;
    pub const SCREEN_LEFT: f32 = -775.0;
    pub const SCREEN_RIGHT: f32 = 775.0;

    /// Lives at the start of a session
    pub const START_LIVES: u32 = 3;
    /// Pause between losing the last life and the end screen
    pub const FINAL_DEATH_PAUSE: f32 = 2.0;

    /// Delay between a boss being announced and the boss wave starting
    pub const BOSS_WAVE_WAIT: f32 = 5.0;
    /// Time a level runs before its boss is announced
    pub const LEVEL_TIME: f32 = 60.0;

    /// Normal-wave cadence
    pub const WAVE_INTERVAL_BASE: f32 = 12.0;
    pub const WAVE_INTERVAL_SCALE: f32 = 0.75;
    pub const WAVE_INTERVAL_MIN: f32 = 4.0;
    /// How soon the next wave may start once the field clears early
    pub const WAVES_CLEARED_PAUSE: f32 = 1.0;

    /// Powerup spawn window
    pub const MIN_POWERUP_SPAWN_TIME: f32 = 30.0;
    pub const MAX_POWERUP_SPAWN_TIME: f32 = 180.0;

    /// Streak multiplier cap
    pub const MAX_COMBO: u32 = 4;

    /// Level at which per-wave difficulty interpolation tops out
    pub const LEVEL_CAP: u32 = 8;
}

/// Ratio of `level` into the difficulty ramp, clamped to [0, 1]
#[inline]
pub fn level_ratio(level: u32) -> f32 {
    (level as f32 / consts::LEVEL_CAP as f32).min(1.0)
}

/// Linear interpolation from `min` at ratio 0 to `max` at ratio 1
#[inline]
pub fn range_from_ratio(min: f32, max: f32, ratio: f32) -> f32 {
    min + (max - min) * ratio
}

/// Linear interpolation from `max` at ratio 0 down to `min` at ratio 1
#[inline]
pub fn range_from_ratio_inverse(min: f32, max: f32, ratio: f32) -> f32 {
    max - (max - min) * ratio
}
