//! Short-lived visual effects
//!
//! Effects carry no gameplay state; the renderer reads them, the session
//! updates their age and compacts expired ones each tick. Drawing itself
//! is a collaborator concern and lives outside the engine.

use glam::Vec2;

use super::session::AwardTier;

const LASER_LIFETIME: f32 = 1.0;
const EXPLOSION_LIFETIME: f32 = 2.0;
const AWARD_LIFETIME: f32 = 2.0;

#[derive(Debug, Clone)]
pub enum EffectKind {
    /// Beam fired from the player toward a destroyed target.
    Laser { start: Vec2, end: Vec2 },
    /// Fragment burst where an entity died.
    Explosion { pos: Vec2 },
    /// Rising award banner for a rated phrase completion.
    AwardText { pos: Vec2, tier: AwardTier },
}

#[derive(Debug, Clone)]
pub struct Effect {
    pub kind: EffectKind,
    pub age: f32,
    lifetime: f32,
}

impl Effect {
    pub fn laser(start: Vec2, end: Vec2) -> Self {
        Self {
            kind: EffectKind::Laser { start, end },
            age: 0.0,
            lifetime: LASER_LIFETIME,
        }
    }

    pub fn explosion(pos: Vec2) -> Self {
        Self {
            kind: EffectKind::Explosion { pos },
            age: 0.0,
            lifetime: EXPLOSION_LIFETIME,
        }
    }

    pub fn award(pos: Vec2, tier: AwardTier) -> Self {
        Self {
            kind: EffectKind::AwardText { pos, tier },
            age: 0.0,
            lifetime: AWARD_LIFETIME,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.age += dt;
    }

    /// True once the effect has outlived its display time.
    pub fn unlink(&self) -> bool {
        self.age >= self.lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_expire_after_lifetime() {
        let mut e = Effect::laser(Vec2::ZERO, Vec2::new(0.0, 100.0));
        assert!(!e.unlink());
        e.update(0.5);
        assert!(!e.unlink());
        e.update(0.6);
        assert!(e.unlink());
    }
}
