//! Session driver
//!
//! `GameSession` owns one run of the game: the entity registry, wave
//! scheduling, boss progression, typing resolution and scoring. Each call
//! to [`GameSession::tick`] advances the simulation by one frame in a
//! fixed phase order: entity updates and player collision, registry
//! compaction, effect aging, boss arbitration, wave spawning, the powerup
//! timer, typed input, and finally the clock.
//!
//! Collaborators (renderer, audio) observe the session through read
//! accessors and the [`SessionEvent`] queue; nothing in here touches the
//! platform.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::effects::Effect;
use super::entity::{Entity, EntityCtx, EntityKind, intersects_player};
use super::registry::{EntityId, EntityRegistry};
use super::waves::{
    AccelWave, BasicWave, BombWave, ChargeBossWave, CyclicWaveFactory, MissileBossWave,
    MissileWave, RandomWaveFactory, SeekerWave, Wave, WaveCtx,
};
use crate::consts::*;
use crate::phrasebook::{PhraseBook, PhraseLength};
use crate::tuning::Tuning;

const PLAYER_HALF: Vec2 = Vec2::new(30.0, 30.0);

/// Session clock. Pausing freezes game time; `frame_time` always reflects
/// the last tick so collaborators can animate menus while paused.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    time: f32,
    frame_time: f32,
    paused: bool,
}

impl Clock {
    pub fn now(&self) -> f32 {
        self.time
    }

    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    fn advance(&mut self, dt: f32) {
        self.frame_time = dt;
        if !self.paused {
            self.time += dt;
        }
    }
}

/// Speed rating for a completed phrase, from seconds-per-character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardTier {
    Excellent,
    Good,
    Ok,
    Poor,
    Bad,
}

impl AwardTier {
    pub fn classify(seconds_per_char: f32) -> Self {
        if seconds_per_char <= 0.1 {
            AwardTier::Excellent
        } else if seconds_per_char <= 0.2 {
            AwardTier::Good
        } else if seconds_per_char <= 0.3 {
            AwardTier::Ok
        } else if seconds_per_char <= 0.5 {
            AwardTier::Poor
        } else {
            AwardTier::Bad
        }
    }

    /// Score multiplier contributed by the tier.
    pub fn factor(self) -> f32 {
        match self {
            AwardTier::Excellent => 2.0,
            AwardTier::Good => 1.4,
            AwardTier::Ok => 1.0,
            AwardTier::Poor => 0.5,
            AwardTier::Bad => 0.25,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AwardTier::Excellent => "Excellent!",
            AwardTier::Good => "Good!",
            AwardTier::Ok => "Ok",
            AwardTier::Poor => "Poor",
            AwardTier::Bad => "Bad",
        }
    }
}

/// Things that happened during a tick, for audio and presentation.
/// Drained by the caller each frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TargetAcquired { id: EntityId },
    Miss,
    Fired { from: Vec2, to: Vec2 },
    Award { tier: AwardTier, pos: Vec2 },
    BossApproaching,
    BossDefeated,
    ExtraLife { pos: Vec2 },
    PlayerHit,
    GameOver,
}

/// Player input for one tick.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub typed: Vec<char>,
    pub pause: bool,
}

type PowerupCtor = fn(Vec2, String) -> Entity;

/// Uniform random pick over the registered powerup kinds.
#[derive(Default)]
struct PowerupFactory {
    ctors: Vec<PowerupCtor>,
}

impl PowerupFactory {
    fn add(&mut self, ctor: PowerupCtor) {
        self.ctors.push(ctor);
    }

    fn create(&self, pos: Vec2, phrase: String, rng: &mut Pcg32) -> Entity {
        assert!(!self.ctors.is_empty(), "no powerup kind registered");
        self.ctors[rng.random_range(0..self.ctors.len())](pos, phrase)
    }
}

/// Level/boss progression state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossPhase {
    Normal,
    BossPending,
    BossActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BossDecision {
    Hold,
    Announce,
    StartBoss,
}

/// Debounced level-to-boss transition. A boss is announced once the level
/// timer runs out, but only starts after the field has stayed clear of
/// normal waves for the full grace period; every tick with waves still
/// active pushes the start back out.
#[derive(Debug)]
struct BossArbiter {
    phase: BossPhase,
    level: u32,
    next_level_time: f32,
    boss_start_time: f32,
    level_time: f32,
    boss_wait: f32,
}

impl BossArbiter {
    fn new(level_time: f32, boss_wait: f32) -> Self {
        Self {
            phase: BossPhase::Normal,
            level: 0,
            next_level_time: level_time,
            boss_start_time: 0.0,
            level_time,
            boss_wait,
        }
    }

    fn update(&mut self, now: f32, waves_active: bool) -> BossDecision {
        match self.phase {
            BossPhase::Normal => {
                if now > self.next_level_time {
                    self.phase = BossPhase::BossPending;
                    self.boss_start_time = now + self.boss_wait;
                    return BossDecision::Announce;
                }
            }
            BossPhase::BossPending => {
                if waves_active {
                    self.boss_start_time = now + self.boss_wait;
                } else if now >= self.boss_start_time {
                    self.phase = BossPhase::BossActive;
                    return BossDecision::StartBoss;
                }
            }
            BossPhase::BossActive => {}
        }
        BossDecision::Hold
    }

    fn boss_finished(&mut self, now: f32) {
        self.level += 1;
        self.next_level_time = now + self.level_time;
        self.phase = BossPhase::Normal;
    }

    /// Normal wave spawning stops from announcement until the boss dies.
    fn suppresses_normal(&self) -> bool {
        self.phase != BossPhase::Normal
    }

    fn reset(&mut self) {
        self.phase = BossPhase::Normal;
        self.level = 0;
        self.next_level_time = self.level_time;
        self.boss_start_time = 0.0;
    }
}

/// One run of the game, from first wave to game over.
pub struct GameSession {
    seed: u64,
    rng: Pcg32,
    phrases: PhraseBook,
    tuning: Tuning,
    clock: Clock,

    registry: EntityRegistry,
    effects: Vec<Effect>,
    events: Vec<SessionEvent>,

    wave_factory: RandomWaveFactory,
    boss_factory: CyclicWaveFactory,
    powerup_factory: PowerupFactory,
    active_waves: Vec<Box<dyn Wave>>,
    boss_wave: Option<Box<dyn Wave>>,
    arbiter: BossArbiter,
    next_wave_time: f32,
    next_powerup_time: f32,

    player_pos: Vec2,
    target: Option<EntityId>,

    score: u64,
    lives: u32,
    streak: u32,
    streak_valid: bool,
    max_streak: u32,
    hits: u32,
    misses: u32,
    tier_counts: [u32; 5],
    lives_used: u32,

    game_over: bool,
    game_over_time: f32,
}

impl GameSession {
    pub fn new(seed: u64, phrases: PhraseBook, tuning: Tuning) -> Self {
        let mut wave_factory = RandomWaveFactory::new();
        wave_factory.add_wave(0, |level| Box::new(BasicWave::new(level)));
        wave_factory.add_wave(1, |level| Box::new(MissileWave::new(level)));
        wave_factory.add_wave(2, |level| Box::new(AccelWave::new(level)));
        wave_factory.add_wave(4, |level| Box::new(SeekerWave::new(level)));
        wave_factory.add_wave(6, |level| Box::new(BombWave::new(level)));

        let mut boss_factory = CyclicWaveFactory::new();
        boss_factory.add_wave(|level| Box::new(MissileBossWave::new(level)));
        boss_factory.add_wave(|level| Box::new(ChargeBossWave::new(level)));

        let mut powerup_factory = PowerupFactory::default();
        powerup_factory.add(|pos, phrase| {
            Entity::new(EntityKind::ExtraLife { spawn_time: 0.0 }, phrase, pos)
        });

        let mut rng = Pcg32::seed_from_u64(seed);
        let next_powerup_time =
            rng.random_range(tuning.min_powerup_spawn_time..tuning.max_powerup_spawn_time);
        let arbiter = BossArbiter::new(tuning.level_time, tuning.boss_wave_wait);
        let lives = tuning.start_lives;

        Self {
            seed,
            rng,
            phrases,
            tuning,
            clock: Clock::default(),
            registry: EntityRegistry::new(),
            effects: Vec::new(),
            events: Vec::new(),
            wave_factory,
            boss_factory,
            powerup_factory,
            active_waves: Vec::new(),
            boss_wave: None,
            arbiter,
            next_wave_time: 0.0,
            next_powerup_time,
            player_pos: Vec2::ZERO,
            target: None,
            score: 0,
            lives,
            streak: 0,
            streak_valid: false,
            max_streak: 0,
            hits: 0,
            misses: 0,
            tier_counts: [0; 5],
            lives_used: 0,
            game_over: false,
            game_over_time: 0.0,
        }
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32, input: TickInput) {
        if input.pause && !self.game_over {
            self.clock.toggle_pause();
        }
        if self.clock.paused() {
            self.clock.advance(dt);
            return;
        }
        let now = self.clock.now();

        if self.game_over {
            // Let the death effects play out; everything else is frozen.
            for e in &mut self.effects {
                e.update(dt);
            }
            self.effects.retain(|e| !e.unlink());
            self.clock.advance(dt);
            return;
        }

        let mut damage = 0u32;
        let mut extra_lives = 0u32;
        let mut spawns: Vec<Entity> = Vec::new();

        // Entity updates, with inline player collision.
        {
            let mut ctx = EntityCtx {
                now,
                dt,
                player_pos: self.player_pos,
                level: self.arbiter.level,
                rng: &mut self.rng,
                phrases: &mut self.phrases,
                spawns: &mut spawns,
                effects: &mut self.effects,
                events: &mut self.events,
                damage: &mut damage,
                extra_lives: &mut extra_lives,
            };
            for id in self.registry.ids() {
                let Some(ent) = self.registry.get_mut(id) else {
                    continue;
                };
                ent.update(&mut ctx);
                if !ent.unlink()
                    && ent.is_solid()
                    && intersects_player(ent, ctx.player_pos, PLAYER_HALF)
                {
                    ent.on_collide(&mut ctx);
                }
            }
        }
        self.insert_spawned(spawns, now);

        // Compaction. Removal is the single point where an entity's
        // reserved start character returns to the pool.
        for id in self.registry.ids() {
            if self.registry.get(id).is_some_and(|e| e.unlink()) {
                if self.target == Some(id) {
                    self.target = None;
                }
                if let Some(removed) = self.registry.remove(id)
                    && let Some(c) = removed.start_char()
                {
                    self.phrases.make_char_avail(c);
                }
            }
        }

        for e in &mut self.effects {
            e.update(dt);
        }
        self.effects.retain(|e| !e.unlink());

        // Retire finished waves before the arbiter looks at the field.
        self.active_waves.retain(|w| !w.is_finished(&self.registry));
        if self
            .boss_wave
            .as_ref()
            .is_some_and(|w| w.is_finished(&self.registry))
        {
            self.boss_wave = None;
            self.arbiter.boss_finished(now);
            self.next_wave_time = now + self.tuning.waves_cleared_pause;
            self.events.push(SessionEvent::BossDefeated);
            log::info!("boss defeated, level {}", self.arbiter.level);
        }

        match self.arbiter.update(now, !self.active_waves.is_empty()) {
            BossDecision::Hold => {}
            BossDecision::Announce => {
                self.events.push(SessionEvent::BossApproaching);
                log::info!("boss approaching at t={now:.1}");
            }
            BossDecision::StartBoss => {
                let mut wave = self.boss_factory.create(self.arbiter.level);
                log::info!("boss wave start: {}", wave.name());
                let mut ctx = WaveCtx {
                    registry: &mut self.registry,
                    phrases: &mut self.phrases,
                    rng: &mut self.rng,
                    now,
                    player_pos: self.player_pos,
                    level: self.arbiter.level,
                };
                wave.start(&mut ctx);
                self.boss_wave = Some(wave);
            }
        }

        // Normal wave cadence. An early field clear pulls the next wave
        // forward instead of waiting out the full interval.
        if !self.arbiter.suppresses_normal() {
            if self.active_waves.is_empty() {
                self.next_wave_time = self
                    .next_wave_time
                    .min(now + self.tuning.waves_cleared_pause);
            }
            if now >= self.next_wave_time {
                let level = self.arbiter.level;
                let mut wave = self.wave_factory.create(level, &mut self.rng);
                log::info!("wave start: {} (level {level})", wave.name());
                let mut ctx = WaveCtx {
                    registry: &mut self.registry,
                    phrases: &mut self.phrases,
                    rng: &mut self.rng,
                    now,
                    player_pos: self.player_pos,
                    level,
                };
                wave.start(&mut ctx);
                self.active_waves.push(wave);

                let interval = (self.tuning.wave_interval_base
                    - self.tuning.wave_interval_scale * level as f32)
                    .max(self.tuning.wave_interval_min);
                self.next_wave_time = now + interval;
            }
        }

        // Drive the spawn cadence of everything active.
        {
            let mut ctx = WaveCtx {
                registry: &mut self.registry,
                phrases: &mut self.phrases,
                rng: &mut self.rng,
                now,
                player_pos: self.player_pos,
                level: self.arbiter.level,
            };
            for wave in &mut self.active_waves {
                wave.spawn(&mut ctx);
            }
            if let Some(wave) = &mut self.boss_wave {
                wave.spawn(&mut ctx);
            }
        }

        if now >= self.next_powerup_time {
            self.spawn_powerup(now);
            self.next_powerup_time = now
                + self
                    .rng
                    .random_range(self.tuning.min_powerup_spawn_time
                        ..self.tuning.max_powerup_spawn_time);
        }

        let mut spawns: Vec<Entity> = Vec::new();
        for c in &input.typed {
            self.handle_typed(*c, now, dt, &mut damage, &mut extra_lives, &mut spawns);
        }
        self.insert_spawned(spawns, now);

        self.lives += extra_lives;
        for _ in 0..damage {
            self.events.push(SessionEvent::PlayerHit);
        }
        if damage > 0 {
            self.lives_used += damage.min(self.lives);
            self.lives = self.lives.saturating_sub(damage);
            if self.lives == 0 {
                self.game_over = true;
                self.game_over_time = now;
                self.effects.push(Effect::explosion(self.player_pos));
                self.events.push(SessionEvent::GameOver);
                log::info!("game over: score {} at t={now:.1}", self.score);
            }
        }

        self.clock.advance(dt);
    }

    fn insert_spawned(&mut self, spawns: Vec<Entity>, now: f32) {
        for mut e in spawns {
            e.on_spawn(now, self.player_pos);
            self.registry.insert(e);
        }
    }

    fn spawn_powerup(&mut self, now: f32) {
        let pos = Vec2::new(
            self.rng
                .random_range(SCREEN_LEFT + 100.0..SCREEN_RIGHT - 100.0),
            self.rng.random_range(300.0..600.0),
        );
        // A multi-word phrase so the pickup takes real effort.
        let phrase = self
            .phrases
            .get_combo_phrase(3, PhraseLength::Short, &mut self.rng);
        let mut e = self.powerup_factory.create(pos, phrase, &mut self.rng);
        e.on_spawn(now, self.player_pos);
        self.registry.insert(e);
        log::debug!("powerup spawned at t={now:.1}");
    }

    /// Resolve one typed character: keep or acquire a target, forward the
    /// character, and score a completed phrase.
    fn handle_typed(
        &mut self,
        c: char,
        now: f32,
        dt: f32,
        damage: &mut u32,
        extra_lives: &mut u32,
        spawns: &mut Vec<Entity>,
    ) {
        if !(c.is_ascii_graphic() || c == ' ') {
            return;
        }

        if let Some(id) = self.target
            && !self.registry.is_live(id)
        {
            self.target = None;
        }

        if self.target.is_none() {
            // First live entity, in slot order, whose phrase starts here.
            let found = self
                .registry
                .iter()
                .find(|(_, e)| e.starts_with(c))
                .map(|(id, e)| (id, e.is_phrase_single()));
            match found {
                Some((id, single)) => {
                    self.target = Some(id);
                    self.streak_valid = true;
                    if !single {
                        self.events.push(SessionEvent::TargetAcquired { id });
                    }
                }
                None => {
                    self.miss();
                    return;
                }
            }
        }

        let Some(id) = self.target else { return };
        let outcome = {
            let mut ctx = EntityCtx {
                now,
                dt,
                player_pos: self.player_pos,
                level: self.arbiter.level,
                rng: &mut self.rng,
                phrases: &mut self.phrases,
                spawns,
                effects: &mut self.effects,
                events: &mut self.events,
                damage,
                extra_lives,
            };
            let Some(ent) = self.registry.get_mut(id) else {
                return;
            };
            let pre = ent.phrase.clone();
            let base = ent.score();
            let pos = ent.pos;
            let single = ent.is_phrase_single();
            let suppress = ent.suppress_award();
            let (hit, finished) = ent.on_type(c, &mut ctx);
            (pre, base, pos, single, suppress, hit, finished)
        };
        let (pre, base, pos, single, suppress, hit, finished) = outcome;

        if !hit {
            self.miss();
            if finished {
                // Kinds that self-destruct on a miss release the target.
                self.target = None;
            }
            return;
        }
        self.hits += 1;

        if finished {
            self.target = None;
            // The entity may have redrawn its phrase already; replay the
            // final keystroke on a snapshot to rate the finished one.
            let speed = {
                let mut p = pre;
                p.on_type(c, now);
                p.typing_speed()
            };
            self.phrase_finished(base, pos, speed, single, suppress);
        }
    }

    fn miss(&mut self) {
        self.misses += 1;
        self.streak = 0;
        self.streak_valid = false;
        self.events.push(SessionEvent::Miss);
    }

    /// Score a completed phrase: the speed tier scales the base and
    /// truncates toward zero, then the streak multiplier (capped) scales
    /// that whole-point amount.
    fn phrase_finished(&mut self, base: u32, pos: Vec2, speed: f32, single: bool, suppress: bool) {
        let mut amount = u64::from(base);
        if !single {
            let tier = AwardTier::classify(speed);
            amount = (base as f32 * tier.factor()) as u64;
            self.tier_counts[tier as usize] += 1;
            if !suppress {
                self.effects.push(Effect::award(pos, tier));
                self.events.push(SessionEvent::Award { tier, pos });
            }
        }
        let mut streak_mult = 1u32;
        if self.streak_valid {
            self.streak += 1;
            self.max_streak = self.max_streak.max(self.streak);
            streak_mult = self.streak.min(self.tuning.max_combo.max(1));
        }
        self.score += amount * u64::from(streak_mult);
        self.effects.push(Effect::laser(self.player_pos, pos));
        self.events.push(SessionEvent::Fired {
            from: self.player_pos,
            to: pos,
        });
        log::debug!("phrase finished: +{amount} x{streak_mult}");
    }

    /// Reset to a fresh run with the original seed.
    pub fn restart(&mut self) {
        self.registry.clear();
        self.effects.clear();
        self.events.clear();
        self.active_waves.clear();
        self.boss_wave = None;
        self.boss_factory.reset();
        self.arbiter.reset();
        self.phrases.make_all_chars_avail();
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.clock = Clock::default();
        self.next_wave_time = 0.0;
        self.next_powerup_time = self
            .rng
            .random_range(self.tuning.min_powerup_spawn_time..self.tuning.max_powerup_spawn_time);
        self.target = None;
        self.score = 0;
        self.lives = self.tuning.start_lives;
        self.streak = 0;
        self.streak_valid = false;
        self.max_streak = 0;
        self.hits = 0;
        self.misses = 0;
        self.tier_counts = [0; 5];
        self.lives_used = 0;
        self.game_over = false;
        self.game_over_time = 0.0;
    }

    /// Take everything that happened since the last drain.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn player_pos(&self) -> Vec2 {
        self.player_pos
    }

    pub fn time(&self) -> f32 {
        self.clock.now()
    }

    pub fn frame_time(&self) -> f32 {
        self.clock.frame_time()
    }

    pub fn paused(&self) -> bool {
        self.clock.paused()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.arbiter.level
    }

    pub fn boss_phase(&self) -> BossPhase {
        self.arbiter.phase
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// Lives lost over the run so far.
    pub fn lives_used(&self) -> u32 {
        self.lives_used
    }

    /// Fraction of keystrokes that hit, 1.0 before any input.
    pub fn accuracy(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f32 / total as f32
        }
    }

    /// Completed-phrase counts per award tier, best to worst.
    pub fn awards(&self) -> [u32; 5] {
        self.tier_counts
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    /// True once the end-of-run pause after the final death has elapsed.
    pub fn finished(&self) -> bool {
        self.game_over && self.clock.now() - self.game_over_time >= self.tuning.final_death_pause
    }
}
