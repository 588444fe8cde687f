//! Entity variants and per-kind behavior
//!
//! Entities are a single struct with a tagged `EntityKind` variant rather
//! than a trait hierarchy; the registry owns them and the session drives
//! their hooks in a fixed order each tick. Side effects that would touch
//! the registry mid-pass (spawning missiles, damaging the player) are
//! deferred through `EntityCtx` and applied after the pass.

use glam::Vec2;
use rand_pcg::Pcg32;

use super::effects::Effect;
use super::phrase::Phrase;
use super::session::SessionEvent;
use crate::consts::*;
use crate::phrasebook::{PhraseBook, PhraseLength};

const BASIC_SCORE: u32 = 20;
const ACCEL_SCORE: u32 = 30;
const MISSILE_SCORE: u32 = 10;
const TURRET_SCORE: u32 = 40;
const BOMB_SCORE: u32 = 50;
const SEEKER_SCORE: u32 = 50;
const BOSS_SCORE: u32 = 50;

/// A miss against an accelerating enemy doubles its speed.
const ACCEL_FACTOR: f32 = 2.0;
const MISSILE_SPEED: f32 = 150.0;
const TURRET_SPEED: f32 = 40.0;
const TURRET_FIRE_PAUSE: f32 = 3.0;
const BOMB_DETONATE_TIME: f32 = 10.0;
const SEEKER_SEEK_TIME: f32 = 3.0;
const SEEKER_SEEK_SPEED: f32 = 60.0;
const SEEKER_ATTACK_SPEED: f32 = 250.0;
const POWERUP_LIFETIME: f32 = 4.0;

const MISSILE_BOSS_HEALTH: u32 = 10;
const MISSILE_BOSS_START: Vec2 = Vec2::new(0.0, 700.0);
const MISSILE_BOSS_DEST: Vec2 = Vec2::new(0.0, 600.0);
const MISSILE_BOSS_DEST_EPSILON: f32 = 5.0;
const MISSILE_BOSS_MOVE_SPEED: f32 = 100.0;
const MISSILE_BOSS_VOLLEY_SIZE: u32 = 8;
const MISSILE_BOSS_MISSILE_GAP: f32 = 0.5;
const MISSILE_BOSS_VOLLEY_GAP: f32 = 4.0;

const CHARGE_BOSS_HEALTH: u32 = 8;
const CHARGE_BOSS_START: Vec2 = Vec2::new(0.0, 650.0);
const CHARGE_BOSS_SPEED: f32 = 35.0;

/// Collision half-extents.
const ENEMY_HALF: Vec2 = Vec2::new(15.0, 25.0);
const MISSILE_HALF: Vec2 = Vec2::new(5.0, 10.0);
const BOSS_HALF: Vec2 = Vec2::new(40.0, 60.0);

/// Deferred side-effect channel handed to entity hooks during the update
/// and typing passes. Nothing in here aliases the registry, so hooks can
/// run while the registry is being iterated.
pub struct EntityCtx<'a> {
    pub now: f32,
    pub dt: f32,
    pub player_pos: Vec2,
    pub level: u32,
    pub rng: &'a mut Pcg32,
    pub phrases: &'a mut PhraseBook,
    pub spawns: &'a mut Vec<Entity>,
    pub effects: &'a mut Vec<Effect>,
    pub events: &'a mut Vec<SessionEvent>,
    pub damage: &'a mut u32,
    pub extra_lives: &'a mut u32,
}

#[derive(Debug, Clone)]
pub enum EntityKind {
    /// Flies straight at the player.
    Basic { dir: Vec2, speed: f32 },
    /// Like Basic, but every miss doubles its speed.
    Accel { dir: Vec2, speed: f32 },
    /// Single-char projectile fired by turrets and bosses.
    Missile { dir: Vec2 },
    /// Traverses the field horizontally, firing missiles as it goes.
    MissileTurret { dir: Vec2, next_fire_time: f32 },
    /// Stationary; detonates on its timer or on a typing miss.
    Bomb { spawn_time: f32 },
    /// Drifts down, then locks on and charges the player.
    Seeker {
        dir: Vec2,
        spawn_time: f32,
        seeking: bool,
    },
    /// Boss: enters from the top, then fires missile volleys. Each
    /// finished phrase costs it one health.
    MissileBoss {
        health: u32,
        moving: bool,
        next_fire_time: f32,
        volley_fired: u32,
    },
    /// Boss: advances on the player; ramming the player knocks it back
    /// to its start line instead of removing it.
    ChargeBoss { health: u32 },
    /// Powerup: grants a life when completed; expires, and a single miss
    /// removes it.
    ExtraLife { spawn_time: f32 },
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub phrase: Phrase,
    pub pos: Vec2,
    unlink: bool,
}

impl Entity {
    pub fn new(kind: EntityKind, phrase: impl Into<String>, pos: Vec2) -> Self {
        Self {
            kind,
            phrase: Phrase::new(phrase),
            pos,
            unlink: false,
        }
    }

    pub fn unlink(&self) -> bool {
        self.unlink
    }

    pub fn start_char(&self) -> Option<char> {
        self.phrase.start_char()
    }

    pub fn starts_with(&self, c: char) -> bool {
        self.start_char() == Some(c)
    }

    pub fn is_phrase_single(&self) -> bool {
        self.phrase.is_single()
    }

    pub fn typing_speed(&self) -> f32 {
        self.phrase.typing_speed()
    }

    /// Whether the entity collides with the player.
    pub fn is_solid(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Basic { .. }
                | EntityKind::Accel { .. }
                | EntityKind::Missile { .. }
                | EntityKind::Seeker { .. }
                | EntityKind::ChargeBoss { .. }
        )
    }

    pub fn half_extents(&self) -> Vec2 {
        match self.kind {
            EntityKind::Missile { .. } => MISSILE_HALF,
            EntityKind::MissileBoss { .. } | EntityKind::ChargeBoss { .. } => BOSS_HALF,
            _ => ENEMY_HALF,
        }
    }

    /// Base score for finishing this entity's phrase.
    pub fn score(&self) -> u32 {
        match self.kind {
            EntityKind::Basic { .. } => BASIC_SCORE,
            EntityKind::Accel { .. } => ACCEL_SCORE,
            EntityKind::Missile { .. } => MISSILE_SCORE,
            EntityKind::MissileTurret { .. } => TURRET_SCORE,
            EntityKind::Bomb { .. } => BOMB_SCORE,
            EntityKind::Seeker { .. } => SEEKER_SCORE,
            EntityKind::MissileBoss { .. } | EntityKind::ChargeBoss { .. } => BOSS_SCORE,
            EntityKind::ExtraLife { .. } => 0,
        }
    }

    /// Powerups display their own pickup banner instead of a speed award.
    pub fn suppress_award(&self) -> bool {
        matches!(self.kind, EntityKind::ExtraLife { .. })
    }

    /// Called once when the entity is added to the registry.
    pub fn on_spawn(&mut self, now: f32, player_pos: Vec2) {
        match &mut self.kind {
            EntityKind::Basic { dir, .. }
            | EntityKind::Accel { dir, .. }
            | EntityKind::Missile { dir } => {
                *dir = (player_pos - self.pos).normalize_or_zero();
            }
            EntityKind::MissileTurret { next_fire_time, .. } => {
                // First shot comes after half the usual pause.
                *next_fire_time = now + TURRET_FIRE_PAUSE / 2.0;
            }
            EntityKind::Bomb { spawn_time } | EntityKind::ExtraLife { spawn_time } => {
                *spawn_time = now;
            }
            EntityKind::Seeker {
                dir,
                spawn_time,
                seeking,
            } => {
                *dir = Vec2::NEG_Y;
                *spawn_time = now;
                *seeking = true;
            }
            EntityKind::MissileBoss {
                health, moving, ..
            } => {
                *health = MISSILE_BOSS_HEALTH;
                *moving = true;
                self.pos = MISSILE_BOSS_START;
                // Untargetable until it reaches its station.
                self.phrase.reset("");
            }
            EntityKind::ChargeBoss { health } => {
                *health = CHARGE_BOSS_HEALTH;
                self.pos = CHARGE_BOSS_START;
            }
        }
    }

    /// Per-tick behavior.
    pub fn update(&mut self, ctx: &mut EntityCtx) {
        match &mut self.kind {
            EntityKind::Basic { dir, speed } | EntityKind::Accel { dir, speed } => {
                self.pos += *dir * (*speed * ctx.dt);
            }
            EntityKind::Missile { dir } => {
                self.pos += *dir * (MISSILE_SPEED * ctx.dt);
            }
            EntityKind::MissileTurret {
                dir,
                next_fire_time,
            } => {
                self.pos += *dir * (TURRET_SPEED * ctx.dt);

                let off_screen = (dir.x > 0.0 && self.pos.x > SCREEN_RIGHT)
                    || (dir.x < 0.0 && self.pos.x < SCREEN_LEFT)
                    || (dir.y > 0.0 && self.pos.y > SCREEN_TOP)
                    || (dir.y < 0.0 && self.pos.y < SCREEN_BOTTOM);
                if off_screen {
                    self.unlink = true;
                    return;
                }

                if ctx.now >= *next_fire_time {
                    let phrase = ctx.phrases.get_phrase(PhraseLength::Single, ctx.rng);
                    ctx.spawns.push(Entity::new(
                        EntityKind::Missile { dir: Vec2::ZERO },
                        phrase,
                        self.pos,
                    ));
                    *next_fire_time = ctx.now + TURRET_FIRE_PAUSE;
                }
            }
            EntityKind::Bomb { spawn_time } => {
                if ctx.now - *spawn_time >= BOMB_DETONATE_TIME {
                    self.detonate(ctx);
                }
            }
            EntityKind::Seeker {
                dir,
                spawn_time,
                seeking,
            } => {
                if *seeking {
                    if ctx.now - *spawn_time >= SEEKER_SEEK_TIME {
                        *seeking = false;
                        *dir = (ctx.player_pos - self.pos).normalize_or_zero();
                    } else {
                        self.pos += *dir * (SEEKER_SEEK_SPEED * ctx.dt);
                    }
                } else {
                    self.pos += *dir * (SEEKER_ATTACK_SPEED * ctx.dt);
                }
            }
            EntityKind::MissileBoss {
                moving,
                next_fire_time,
                volley_fired,
                ..
            } => {
                if *moving {
                    let dir = (MISSILE_BOSS_DEST - self.pos).normalize_or_zero();
                    self.pos += dir * (MISSILE_BOSS_MOVE_SPEED * ctx.dt);

                    if self.pos.distance(MISSILE_BOSS_DEST) <= MISSILE_BOSS_DEST_EPSILON {
                        *moving = false;
                        let phrase = ctx.phrases.get_phrase(PhraseLength::Medium, ctx.rng);
                        self.phrase.reset(phrase);
                        *next_fire_time = ctx.now;
                    }
                } else if ctx.now >= *next_fire_time {
                    let phrase = ctx.phrases.get_phrase(PhraseLength::Single, ctx.rng);
                    ctx.spawns.push(Entity::new(
                        EntityKind::Missile { dir: Vec2::ZERO },
                        phrase,
                        self.pos,
                    ));

                    *volley_fired += 1;
                    if *volley_fired >= MISSILE_BOSS_VOLLEY_SIZE {
                        *volley_fired = 0;
                        *next_fire_time = ctx.now + MISSILE_BOSS_VOLLEY_GAP;
                    } else {
                        *next_fire_time = ctx.now + MISSILE_BOSS_MISSILE_GAP;
                    }
                }
            }
            EntityKind::ChargeBoss { .. } => {
                let dir = (ctx.player_pos - self.pos).normalize_or_zero();
                self.pos += dir * (CHARGE_BOSS_SPEED * ctx.dt);
            }
            EntityKind::ExtraLife { spawn_time } => {
                if ctx.now - *spawn_time >= POWERUP_LIFETIME {
                    self.unlink = true;
                }
            }
        }
    }

    /// Called when a solid entity intersects the player.
    pub fn on_collide(&mut self, ctx: &mut EntityCtx) {
        match self.kind {
            EntityKind::ChargeBoss { .. } => {
                // Rams the player and is knocked back to its start line;
                // its phrase and health carry over.
                *ctx.damage += 1;
                ctx.effects.push(Effect::explosion(self.pos));
                self.pos = CHARGE_BOSS_START;
            }
            _ => {
                *ctx.damage += 1;
                self.unlink = true;
            }
        }
    }

    /// Feed one typed character to the entity's phrase. Returns
    /// `(hit, finished)`; `finished` may be true on a miss for kinds that
    /// override the generic contract (bomb, powerup).
    pub fn on_type(&mut self, c: char, ctx: &mut EntityCtx) -> (bool, bool) {
        let hit = self.phrase.on_type(c, ctx.now);
        let mut finished = self.phrase.finished();

        match &mut self.kind {
            EntityKind::Accel { speed, .. } => {
                if !hit {
                    *speed *= ACCEL_FACTOR;
                }
                if finished {
                    self.kill(ctx);
                }
            }
            EntityKind::Bomb { .. } => {
                if !hit {
                    // A single miss sets it off.
                    self.detonate(ctx);
                    finished = true;
                } else if finished {
                    self.kill(ctx);
                }
            }
            EntityKind::Seeker { dir, seeking, .. } => {
                if finished {
                    self.kill(ctx);
                } else if *seeking {
                    // Poking a seeker wakes it up early.
                    *seeking = false;
                    *dir = (ctx.player_pos - self.pos).normalize_or_zero();
                }
            }
            EntityKind::MissileBoss { health, .. } | EntityKind::ChargeBoss { health } => {
                if finished {
                    *health -= 1;
                    if *health > 0 {
                        // Old start char goes back to the pool; the dead
                        // case is handled by registry compaction.
                        if let Some(c) = self.phrase.start_char() {
                            ctx.phrases.make_char_avail(c);
                        }
                        let phrase = ctx.phrases.get_phrase(PhraseLength::Medium, ctx.rng);
                        self.phrase.reset(phrase);
                    } else {
                        ctx.effects.push(Effect::explosion(self.pos));
                        self.unlink = true;
                    }
                }
            }
            EntityKind::ExtraLife { .. } => {
                if !hit {
                    self.unlink = true;
                    finished = true;
                } else if finished {
                    *ctx.extra_lives += 1;
                    ctx.events.push(SessionEvent::ExtraLife { pos: self.pos });
                    self.unlink = true;
                }
            }
            _ => {
                if finished {
                    self.kill(ctx);
                }
            }
        }

        (hit, finished)
    }

    /// Standard phrase-finish death: explode and unlink. The reserved
    /// start char goes back to the pool at registry compaction.
    fn kill(&mut self, ctx: &mut EntityCtx) {
        ctx.effects.push(Effect::explosion(self.pos));
        self.unlink = true;
    }

    fn detonate(&mut self, ctx: &mut EntityCtx) {
        *ctx.damage += 1;
        ctx.effects.push(Effect::explosion(self.pos));
        ctx.effects.push(Effect::laser(self.pos, ctx.player_pos));
        self.unlink = true;
    }
}

/// Axis-aligned box overlap against the player.
pub fn intersects_player(entity: &Entity, player_pos: Vec2, player_half: Vec2) -> bool {
    let delta = (entity.pos - player_pos).abs();
    let reach = entity.half_extents() + player_half;
    delta.x <= reach.x && delta.y <= reach.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrasebook::PhraseBook;
    use rand::SeedableRng;

    fn ctx_parts() -> (
        Pcg32,
        PhraseBook,
        Vec<Entity>,
        Vec<Effect>,
        Vec<SessionEvent>,
    ) {
        (
            Pcg32::seed_from_u64(7),
            PhraseBook::default_book().unwrap(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    macro_rules! ctx {
        ($parts:expr, $damage:expr, $lives:expr) => {
            EntityCtx {
                now: 1.0,
                dt: 1.0 / 60.0,
                player_pos: Vec2::ZERO,
                level: 0,
                rng: &mut $parts.0,
                phrases: &mut $parts.1,
                spawns: &mut $parts.2,
                effects: &mut $parts.3,
                events: &mut $parts.4,
                damage: &mut $damage,
                extra_lives: &mut $lives,
            }
        };
    }

    #[test]
    fn basic_enemy_dies_when_phrase_completes() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage, lives);

        let mut e = Entity::new(
            EntityKind::Basic {
                dir: Vec2::ZERO,
                speed: 50.0,
            },
            "ok",
            Vec2::new(0.0, 500.0),
        );
        assert_eq!(e.on_type('o', &mut ctx), (true, false));
        assert_eq!(e.on_type('k', &mut ctx), (true, true));
        assert!(e.unlink());
    }

    #[test]
    fn accel_enemy_speeds_up_on_miss() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage, lives);

        let mut e = Entity::new(
            EntityKind::Accel {
                dir: Vec2::NEG_Y,
                speed: 50.0,
            },
            "go",
            Vec2::new(0.0, 500.0),
        );
        let (hit, finished) = e.on_type('x', &mut ctx);
        assert!(!hit && !finished);
        match e.kind {
            EntityKind::Accel { speed, .. } => assert_eq!(speed, 100.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn bomb_detonates_on_miss_without_scoring() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage, lives);

        let mut e = Entity::new(EntityKind::Bomb { spawn_time: 0.0 }, "boom", Vec2::ZERO);
        let (hit, finished) = e.on_type('x', &mut ctx);
        assert!(!hit);
        assert!(finished);
        assert!(e.unlink());
        assert_eq!(damage, 1);
    }

    #[test]
    fn boss_takes_one_health_per_phrase_and_redraws() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage, lives);

        let mut e = Entity::new(EntityKind::ChargeBoss { health: 2 }, "hi", Vec2::ZERO);
        assert_eq!(e.on_type('h', &mut ctx), (true, false));
        assert_eq!(e.on_type('i', &mut ctx), (true, true));
        assert!(!e.unlink());
        match e.kind {
            EntityKind::ChargeBoss { health } => assert_eq!(health, 1),
            _ => unreachable!(),
        }
        // A fresh phrase was drawn.
        assert!(!e.phrase.is_empty());
        assert!(!e.phrase.finished());
    }

    #[test]
    fn extra_life_grants_life_and_vanishes_on_miss() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        {
            let mut ctx = ctx!(parts, damage, lives);
            let mut e = Entity::new(EntityKind::ExtraLife { spawn_time: 0.0 }, "up", Vec2::ZERO);
            e.on_type('u', &mut ctx);
            e.on_type('p', &mut ctx);
            assert!(e.unlink());
        }
        assert_eq!(lives, 1);

        let (mut damage2, mut lives2) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage2, lives2);
        let mut e = Entity::new(EntityKind::ExtraLife { spawn_time: 0.0 }, "up", Vec2::ZERO);
        let (hit, finished) = e.on_type('z', &mut ctx);
        assert!(!hit && finished);
        assert!(e.unlink());
        assert_eq!(lives2, 0);
        let _ = damage;
    }

    #[test]
    fn charge_boss_knockback_on_collision() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage, lives);

        let mut e = Entity::new(EntityKind::ChargeBoss { health: 8 }, "hi", Vec2::ZERO);
        e.on_collide(&mut ctx);
        assert!(!e.unlink());
        assert_eq!(e.pos, CHARGE_BOSS_START);
        assert_eq!(damage, 1);
    }

    #[test]
    fn solid_enemy_collision_damages_and_unlinks() {
        let mut parts = ctx_parts();
        let (mut damage, mut lives) = (0u32, 0u32);
        let mut ctx = ctx!(parts, damage, lives);

        let mut e = Entity::new(
            EntityKind::Basic {
                dir: Vec2::NEG_Y,
                speed: 50.0,
            },
            "hit",
            Vec2::ZERO,
        );
        e.on_collide(&mut ctx);
        assert!(e.unlink());
        assert_eq!(damage, 1);
    }
}
