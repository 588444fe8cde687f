//! Headless demo run
//!
//! Drives a session with a scripted typist for a fixed stretch of game
//! time, then prints the run summary and updates the leaderboard. Useful
//! for balance checks and as a reference for wiring a frontend.

use std::path::Path;
use std::time::SystemTime;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use keystorm::sim::{GameSession, SessionEvent, TickInput};
use keystorm::{PhraseBook, Tuning};

const DT: f32 = 1.0 / 60.0;
const RUN_SECONDS: f32 = 150.0;
/// Scripted typist cadence and hit rate.
const CHARS_PER_SECOND: f32 = 8.0;
const TYPIST_ACCURACY: f64 = 0.9;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
    log::info!("seed {seed}");

    let phrases = match PhraseBook::load(Path::new("assets/phrases.txt")) {
        Ok(book) => book,
        Err(err) => {
            log::warn!("{err}, using the built-in phrase list");
            match PhraseBook::default_book() {
                Ok(book) => book,
                Err(err) => {
                    eprintln!("no usable phrase list: {err}");
                    std::process::exit(1);
                }
            }
        }
    };
    let tuning = Tuning::load_or_default(Path::new("tuning.json"));

    let mut session = GameSession::new(seed, phrases, tuning);
    // The typist gets its own stream so it never perturbs the simulation.
    let mut typist_rng = Pcg32::seed_from_u64(seed ^ 0x5eed);
    let mut type_budget = 0.0f32;

    let steps = (RUN_SECONDS / DT) as u32;
    for _ in 0..steps {
        if session.finished() {
            break;
        }

        type_budget += DT * CHARS_PER_SECOND;
        let mut typed = Vec::new();
        while type_budget >= 1.0 {
            type_budget -= 1.0;
            if let Some(c) = next_char(&session) {
                if typist_rng.random_bool(TYPIST_ACCURACY) {
                    typed.push(c);
                } else {
                    typed.push('~');
                }
            }
        }

        session.tick(DT, TickInput {
            typed,
            pause: false,
        });

        for event in session.drain_events() {
            match event {
                SessionEvent::BossApproaching => println!("boss approaching"),
                SessionEvent::BossDefeated => {
                    println!("boss down, level {} begins", session.level())
                }
                SessionEvent::ExtraLife { .. } => println!("extra life"),
                SessionEvent::PlayerHit => println!("hit! {} lives left", session.lives()),
                SessionEvent::GameOver => println!("game over"),
                _ => {}
            }
        }
    }

    let awards = session.awards();
    println!();
    println!("score      {}", session.score());
    println!("level      {}", session.level());
    println!("max streak {}", session.max_streak());
    println!("lives used {}", session.lives_used());
    println!(
        "accuracy   {:.1}% ({} hits, {} misses)",
        session.accuracy() * 100.0,
        session.hits(),
        session.misses()
    );
    println!(
        "awards     {} excellent, {} good, {} ok, {} poor, {} bad",
        awards[0], awards[1], awards[2], awards[3], awards[4]
    );

    let scores_path = Path::new("highscores.json");
    let mut scores = keystorm::HighScores::load_or_default(scores_path);
    if let Some(rank) = scores.add("player", session.score(), session.max_streak()) {
        println!("high score! rank {}", rank + 1);
        if let Err(err) = scores.save(scores_path) {
            log::error!("cannot save high scores: {err}");
        }
    }
}

/// Next character the typist should press: the locked target's next
/// expected character, or the start of the first targetable entity.
fn next_char(session: &GameSession) -> Option<char> {
    if let Some(id) = session.target()
        && let Some(entity) = session.registry().get(id)
    {
        return entity.phrase.remaining().chars().next();
    }
    session
        .registry()
        .iter()
        .find_map(|(_, e)| e.start_char())
}
