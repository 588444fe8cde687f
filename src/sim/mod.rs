//! Deterministic session engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (arena slot order)
//! - Timestamps compared against the session clock, never wall time
//! - No rendering or platform dependencies

pub mod effects;
pub mod entity;
pub mod phrase;
pub mod registry;
pub mod session;
pub mod waves;

pub use effects::{Effect, EffectKind};
pub use entity::{Entity, EntityKind};
pub use phrase::Phrase;
pub use registry::{EntityId, EntityRegistry};
pub use session::{AwardTier, BossPhase, GameSession, SessionEvent, TickInput};
pub use waves::{CyclicWaveFactory, RandomWaveFactory, Wave};
