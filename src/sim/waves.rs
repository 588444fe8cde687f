//! Wave definitions and factories
//!
//! A wave owns the spawn cadence for one batch of entities and reports
//! itself finished once everything it spawned is gone. Factories hand out
//! boxed waves: the random factory drives normal play and gates each wave
//! kind behind a minimum level, the cyclic factory deals bosses out in a
//! fixed rotation.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::entity::{Entity, EntityKind};
use super::registry::{EntityId, EntityRegistry};
use crate::consts::*;
use crate::phrasebook::{PhraseBook, PhraseLength};
use crate::{level_ratio, range_from_ratio, range_from_ratio_inverse};

/// Everything a wave needs while spawning. Unlike `EntityCtx` this holds
/// the registry directly; waves only run in the dedicated spawn phase of
/// the tick, after entity updates have finished.
pub struct WaveCtx<'a> {
    pub registry: &'a mut EntityRegistry,
    pub phrases: &'a mut PhraseBook,
    pub rng: &'a mut Pcg32,
    pub now: f32,
    pub player_pos: Vec2,
    pub level: u32,
}

impl WaveCtx<'_> {
    /// Insert an entity, running its spawn hook first.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        entity.on_spawn(self.now, self.player_pos);
        self.registry.insert(entity)
    }
}

pub trait Wave {
    /// Called once, the tick the wave becomes active.
    fn start(&mut self, ctx: &mut WaveCtx);

    /// Called every tick while active; spawns entities when due.
    fn spawn(&mut self, ctx: &mut WaveCtx);

    /// True once everything the wave spawned has been removed.
    fn is_finished(&self, registry: &EntityRegistry) -> bool;

    fn name(&self) -> &'static str;
}

/// Shared bookkeeping for waves that spawn `total` entities on a timer.
struct Cadence {
    total: u32,
    spawned: u32,
    gap: f32,
    next_spawn_time: f32,
    ids: Vec<EntityId>,
}

impl Cadence {
    fn new(total: u32, gap: f32) -> Self {
        Self {
            total,
            spawned: 0,
            gap,
            next_spawn_time: 0.0,
            ids: Vec::new(),
        }
    }

    fn start(&mut self, now: f32) {
        self.next_spawn_time = now;
    }

    /// True when another spawn is due; advances the timer when it fires.
    fn due(&mut self, now: f32) -> bool {
        if self.spawned < self.total && now >= self.next_spawn_time {
            self.spawned += 1;
            self.next_spawn_time = now + self.gap;
            true
        } else {
            false
        }
    }

    fn track(&mut self, id: EntityId) {
        self.ids.push(id);
    }

    fn finished(&self, registry: &EntityRegistry) -> bool {
        self.spawned == self.total && self.ids.iter().all(|&id| !registry.is_live(id))
    }
}

fn top_spawn_pos(rng: &mut Pcg32) -> Vec2 {
    let x = rng.random_range(SCREEN_LEFT + 50.0..SCREEN_RIGHT - 50.0);
    Vec2::new(x, SCREEN_TOP)
}

/// Straight-line enemies from the top of the screen. Count and speed grow
/// with the level, the spawn gap shrinks.
pub struct BasicWave {
    cadence: Cadence,
    speed: f32,
}

impl BasicWave {
    pub fn new(level: u32) -> Self {
        let ratio = level_ratio(level);
        let count = range_from_ratio(4.0, 10.0, ratio) as u32;
        let gap = range_from_ratio_inverse(1.0, 3.0, ratio);
        Self {
            cadence: Cadence::new(count, gap),
            speed: range_from_ratio(50.0, 150.0, ratio),
        }
    }
}

impl Wave for BasicWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        self.cadence.start(ctx.now);
    }

    fn spawn(&mut self, ctx: &mut WaveCtx) {
        if self.cadence.due(ctx.now) {
            let phrase = ctx.phrases.get_phrase(PhraseLength::Short, ctx.rng);
            let pos = top_spawn_pos(ctx.rng);
            let id = ctx.add_entity(Entity::new(
                EntityKind::Basic {
                    dir: Vec2::ZERO,
                    speed: self.speed,
                },
                phrase,
                pos,
            ));
            self.cadence.track(id);
        }
    }

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        self.cadence.finished(registry)
    }

    fn name(&self) -> &'static str {
        "basic"
    }
}

/// Slower enemies that double their speed on every typing miss.
pub struct AccelWave {
    cadence: Cadence,
    speed: f32,
}

impl AccelWave {
    pub fn new(level: u32) -> Self {
        let ratio = level_ratio(level);
        let count = range_from_ratio(3.0, 8.0, ratio) as u32;
        let gap = range_from_ratio_inverse(1.5, 3.0, ratio);
        Self {
            cadence: Cadence::new(count, gap),
            speed: range_from_ratio(30.0, 60.0, ratio),
        }
    }
}

impl Wave for AccelWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        self.cadence.start(ctx.now);
    }

    fn spawn(&mut self, ctx: &mut WaveCtx) {
        if self.cadence.due(ctx.now) {
            let phrase = ctx.phrases.get_phrase(PhraseLength::Short, ctx.rng);
            let pos = top_spawn_pos(ctx.rng);
            let id = ctx.add_entity(Entity::new(
                EntityKind::Accel {
                    dir: Vec2::ZERO,
                    speed: self.speed,
                },
                phrase,
                pos,
            ));
            self.cadence.track(id);
        }
    }

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        self.cadence.finished(registry)
    }

    fn name(&self) -> &'static str {
        "accel"
    }
}

/// Turrets that traverse the field horizontally, alternating sides, each
/// firing single-char missiles as it crosses.
pub struct MissileWave {
    cadence: Cadence,
}

impl MissileWave {
    pub fn new(level: u32) -> Self {
        let ratio = level_ratio(level);
        let count = range_from_ratio(2.0, 5.0, ratio) as u32;
        Self {
            cadence: Cadence::new(count, 0.0),
        }
    }
}

impl Wave for MissileWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        self.cadence.start(ctx.now);
        self.cadence.gap = ctx.rng.random_range(0.3..0.6);
    }

    fn spawn(&mut self, ctx: &mut WaveCtx) {
        if self.cadence.due(ctx.now) {
            let i = self.cadence.spawned - 1;
            let y = 500.0 + 100.0 * i as f32;
            let (x, dir) = if i % 2 == 0 {
                (SCREEN_LEFT, Vec2::X)
            } else {
                (SCREEN_RIGHT, Vec2::NEG_X)
            };
            let phrase = ctx.phrases.get_phrase(PhraseLength::Medium, ctx.rng);
            let id = ctx.add_entity(Entity::new(
                EntityKind::MissileTurret {
                    dir,
                    next_fire_time: 0.0,
                },
                phrase,
                Vec2::new(x, y),
            ));
            self.cadence.track(id);
            self.cadence.gap = ctx.rng.random_range(0.3..0.6);
        }
    }

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        // Turrets despawn off the far edge on their own, so the wave ends
        // even when nothing gets typed.
        self.cadence.finished(registry)
    }

    fn name(&self) -> &'static str {
        "missile"
    }
}

/// Stationary bombs scattered over the field; each detonates on its own
/// timer or the moment it is mistyped.
pub struct BombWave {
    cadence: Cadence,
}

impl BombWave {
    pub fn new(level: u32) -> Self {
        let ratio = level_ratio(level);
        let count = range_from_ratio(2.0, 6.0, ratio) as u32;
        Self {
            cadence: Cadence::new(count, 0.5),
        }
    }
}

impl Wave for BombWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        self.cadence.start(ctx.now);
    }

    fn spawn(&mut self, ctx: &mut WaveCtx) {
        if self.cadence.due(ctx.now) {
            let pos = Vec2::new(
                ctx.rng.random_range(SCREEN_LEFT + 100.0..SCREEN_RIGHT - 100.0),
                ctx.rng.random_range(300.0..SCREEN_TOP - 100.0),
            );
            let phrase = ctx.phrases.get_phrase(PhraseLength::Medium, ctx.rng);
            let id = ctx.add_entity(Entity::new(
                EntityKind::Bomb { spawn_time: 0.0 },
                phrase,
                pos,
            ));
            self.cadence.track(id);
        }
    }

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        self.cadence.finished(registry)
    }

    fn name(&self) -> &'static str {
        "bomb"
    }
}

/// Enemies that drift down briefly, then lock on and charge.
pub struct SeekerWave {
    cadence: Cadence,
}

impl SeekerWave {
    pub fn new(level: u32) -> Self {
        let ratio = level_ratio(level);
        let count = range_from_ratio(2.0, 6.0, ratio) as u32;
        let gap = range_from_ratio_inverse(1.0, 2.0, ratio);
        Self {
            cadence: Cadence::new(count, gap),
        }
    }
}

impl Wave for SeekerWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        self.cadence.start(ctx.now);
    }

    fn spawn(&mut self, ctx: &mut WaveCtx) {
        if self.cadence.due(ctx.now) {
            let phrase = ctx.phrases.get_phrase(PhraseLength::Medium, ctx.rng);
            let pos = top_spawn_pos(ctx.rng);
            let id = ctx.add_entity(Entity::new(
                EntityKind::Seeker {
                    dir: Vec2::NEG_Y,
                    spawn_time: 0.0,
                    seeking: true,
                },
                phrase,
                pos,
            ));
            self.cadence.track(id);
        }
    }

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        self.cadence.finished(registry)
    }

    fn name(&self) -> &'static str {
        "seeker"
    }
}

/// Single missile-volley boss.
pub struct MissileBossWave {
    id: Option<EntityId>,
}

impl MissileBossWave {
    pub fn new(_level: u32) -> Self {
        Self { id: None }
    }
}

impl Wave for MissileBossWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        let id = ctx.add_entity(Entity::new(
            EntityKind::MissileBoss {
                health: 0,
                moving: true,
                next_fire_time: 0.0,
                volley_fired: 0,
            },
            "",
            Vec2::ZERO,
        ));
        self.id = Some(id);
    }

    fn spawn(&mut self, _ctx: &mut WaveCtx) {}

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        self.id.is_some_and(|id| !registry.is_live(id))
    }

    fn name(&self) -> &'static str {
        "missile boss"
    }
}

/// Single ramming boss.
pub struct ChargeBossWave {
    id: Option<EntityId>,
}

impl ChargeBossWave {
    pub fn new(_level: u32) -> Self {
        Self { id: None }
    }
}

impl Wave for ChargeBossWave {
    fn start(&mut self, ctx: &mut WaveCtx) {
        let phrase = ctx.phrases.get_phrase(PhraseLength::Medium, ctx.rng);
        let id = ctx.add_entity(Entity::new(
            EntityKind::ChargeBoss { health: 0 },
            phrase,
            Vec2::ZERO,
        ));
        self.id = Some(id);
    }

    fn spawn(&mut self, _ctx: &mut WaveCtx) {}

    fn is_finished(&self, registry: &EntityRegistry) -> bool {
        self.id.is_some_and(|id| !registry.is_live(id))
    }

    fn name(&self) -> &'static str {
        "charge boss"
    }
}

type WaveCtor = fn(u32) -> Box<dyn Wave>;

/// Picks a wave uniformly among the kinds unlocked at the current level.
#[derive(Default)]
pub struct RandomWaveFactory {
    waves: Vec<(u32, WaveCtor)>,
}

impl RandomWaveFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wave kind, unlocked once the level reaches `min_level`.
    pub fn add_wave(&mut self, min_level: u32, ctor: WaveCtor) {
        self.waves.push((min_level, ctor));
    }

    /// Build a wave for `level`. At least one registered kind must be
    /// unlocked at level 0, otherwise early levels would have nothing to
    /// offer; that is a setup error.
    pub fn create(&self, level: u32, rng: &mut Pcg32) -> Box<dyn Wave> {
        let eligible: Vec<&WaveCtor> = self
            .waves
            .iter()
            .filter(|(min_level, _)| *min_level <= level)
            .map(|(_, ctor)| ctor)
            .collect();
        assert!(
            !eligible.is_empty(),
            "no wave kind unlocked at level {level}"
        );
        let pick = rng.random_range(0..eligible.len());
        eligible[pick](level)
    }
}

/// Deals registered waves out in insertion order, wrapping around.
#[derive(Default)]
pub struct CyclicWaveFactory {
    waves: Vec<WaveCtor>,
    next: usize,
}

impl CyclicWaveFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wave(&mut self, ctor: WaveCtor) {
        self.waves.push(ctor);
    }

    pub fn create(&mut self, level: u32) -> Box<dyn Wave> {
        assert!(!self.waves.is_empty(), "cyclic factory has no waves");
        let ctor = self.waves[self.next];
        self.next = (self.next + 1) % self.waves.len();
        ctor(level)
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrasebook::PhraseBook;
    use rand::SeedableRng;

    fn test_factory() -> RandomWaveFactory {
        let mut f = RandomWaveFactory::new();
        f.add_wave(0, |level| Box::new(BasicWave::new(level)));
        f.add_wave(1, |level| Box::new(MissileWave::new(level)));
        f.add_wave(2, |level| Box::new(AccelWave::new(level)));
        f.add_wave(4, |level| Box::new(SeekerWave::new(level)));
        f
    }

    #[test]
    fn random_factory_respects_level_gates() {
        let f = test_factory();
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..50 {
            let wave = f.create(0, &mut rng);
            assert_eq!(wave.name(), "basic");
        }
        for _ in 0..50 {
            let wave = f.create(1, &mut rng);
            assert!(matches!(wave.name(), "basic" | "missile"));
        }
    }

    #[test]
    fn random_factory_reaches_every_unlocked_kind() {
        let f = test_factory();
        let mut rng = Pcg32::seed_from_u64(11);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(f.create(10, &mut rng).name());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn cyclic_factory_rotates_in_order() {
        let mut f = CyclicWaveFactory::new();
        f.add_wave(|level| Box::new(MissileBossWave::new(level)));
        f.add_wave(|level| Box::new(ChargeBossWave::new(level)));

        assert_eq!(f.create(0).name(), "missile boss");
        assert_eq!(f.create(0).name(), "charge boss");
        assert_eq!(f.create(1).name(), "missile boss");
        f.reset();
        assert_eq!(f.create(1).name(), "missile boss");
    }

    proptest::proptest! {
        /// The random factory never deals a wave kind above the level gate.
        #[test]
        fn random_factory_never_exceeds_the_gate(level in 0u32..20, seed in 0u64..500) {
            let f = test_factory();
            let mut rng = Pcg32::seed_from_u64(seed);
            let min_level = match f.create(level, &mut rng).name() {
                "basic" => 0,
                "missile" => 1,
                "accel" => 2,
                "seeker" => 4,
                other => panic!("unregistered wave {other}"),
            };
            proptest::prop_assert!(min_level <= level);
        }
    }

    #[test]
    fn top_entry_waves_spawn_along_the_top_edge() {
        let waves: Vec<Box<dyn Wave>> = vec![
            Box::new(BasicWave::new(0)),
            Box::new(AccelWave::new(2)),
            Box::new(SeekerWave::new(4)),
        ];
        for mut wave in waves {
            let mut registry = EntityRegistry::new();
            let mut phrases = PhraseBook::default_book().unwrap();
            let mut rng = Pcg32::seed_from_u64(9);
            let mut now = 0.0;
            for _ in 0..2000 {
                let mut ctx = WaveCtx {
                    registry: &mut registry,
                    phrases: &mut phrases,
                    rng: &mut rng,
                    now,
                    player_pos: glam::Vec2::ZERO,
                    level: 0,
                };
                if now == 0.0 {
                    wave.start(&mut ctx);
                }
                wave.spawn(&mut ctx);
                now += 1.0 / 60.0;
            }
            assert!(!registry.is_empty(), "{} spawned nothing", wave.name());
            for (_, e) in registry.iter() {
                assert_eq!(e.pos.y, SCREEN_TOP, "{}", wave.name());
                assert!(e.pos.x > SCREEN_LEFT && e.pos.x < SCREEN_RIGHT);
            }
        }
    }

    #[test]
    fn basic_wave_finishes_once_spawns_are_cleared() {
        let mut registry = EntityRegistry::new();
        let mut phrases = PhraseBook::default_book().unwrap();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut wave = BasicWave::new(0);

        let mut now = 0.0;
        {
            let mut ctx = WaveCtx {
                registry: &mut registry,
                phrases: &mut phrases,
                rng: &mut rng,
                now,
                player_pos: glam::Vec2::ZERO,
                level: 0,
            };
            wave.start(&mut ctx);
        }
        // Run the cadence well past the last spawn.
        for _ in 0..2000 {
            let mut ctx = WaveCtx {
                registry: &mut registry,
                phrases: &mut phrases,
                rng: &mut rng,
                now,
                player_pos: glam::Vec2::ZERO,
                level: 0,
            };
            wave.spawn(&mut ctx);
            now += 1.0 / 60.0;
        }
        assert!(!wave.is_finished(&registry));
        assert!(registry.len() >= 4);

        for id in registry.ids() {
            registry.remove(id);
        }
        assert!(wave.is_finished(&registry));
    }
}
