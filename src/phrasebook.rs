//! Phrase source with start-character reservation
//!
//! Every on-screen phrase must start with a distinct character, otherwise
//! the first keystroke could not pick a unique target. The book indexes
//! phrases by their first character and length category and hands each
//! start character out at most once until it is returned.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand_pcg::Pcg32;
use thiserror::Error;

const DEFAULT_PHRASES: &str = include_str!("../assets/phrases.txt");

#[derive(Debug, Error)]
pub enum PhraseBookError {
    #[error("cannot read phrase file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("phrase list is empty")]
    Empty,
}

/// Length category of a phrase, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseLength {
    Single,
    Short,
    Medium,
    Long,
}

impl PhraseLength {
    pub fn of(text: &str) -> Self {
        match text.chars().count() {
            0 | 1 => PhraseLength::Single,
            2..=6 => PhraseLength::Short,
            7..=12 => PhraseLength::Medium,
            _ => PhraseLength::Long,
        }
    }
}

const CATEGORIES: usize = 4;

/// Phrases bucketed by start character and length category. Ordered maps
/// keep the draw order deterministic for a given RNG seed.
#[derive(Debug, Clone)]
pub struct PhraseBook {
    phrases: BTreeMap<char, [Vec<String>; CATEGORIES]>,
    avail: BTreeSet<char>,
}

impl PhraseBook {
    /// Build a book from newline-separated phrases. Blank lines and `#`
    /// comments are skipped; drawing never consumes a phrase, only its
    /// start character.
    pub fn from_text(text: &str) -> Result<Self, PhraseBookError> {
        let mut phrases: BTreeMap<char, [Vec<String>; CATEGORIES]> = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(start) = line.chars().next() else {
                continue;
            };
            let cat = PhraseLength::of(line) as usize;
            phrases.entry(start).or_default()[cat].push(line.to_string());
        }
        if phrases.is_empty() {
            return Err(PhraseBookError::Empty);
        }
        let avail = phrases.keys().copied().collect();
        Ok(Self { phrases, avail })
    }

    pub fn load(path: &Path) -> Result<Self, PhraseBookError> {
        let text = fs::read_to_string(path).map_err(|source| PhraseBookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text)
    }

    /// The phrase list compiled into the binary.
    pub fn default_book() -> Result<Self, PhraseBookError> {
        Self::from_text(DEFAULT_PHRASES)
    }

    /// Draw a phrase of the given length, reserving its start character.
    ///
    /// If every start character with a phrase of that length is already
    /// reserved, the reservation is ignored for this draw; if the length
    /// itself has no phrases at all, any phrase will do.
    pub fn get_phrase(&mut self, len: PhraseLength, rng: &mut Pcg32) -> String {
        let cat = len as usize;
        let free: Vec<char> = self
            .phrases
            .iter()
            .filter(|(c, cats)| self.avail.contains(c) && !cats[cat].is_empty())
            .map(|(c, _)| *c)
            .collect();

        let (start, cat) = if let Some(&c) = pick(&free, rng) {
            (c, cat)
        } else {
            let taken: Vec<char> = self
                .phrases
                .iter()
                .filter(|(_, cats)| !cats[cat].is_empty())
                .map(|(c, _)| *c)
                .collect();
            if let Some(&c) = pick(&taken, rng) {
                log::warn!("no free start characters for {len:?} phrases");
                (c, cat)
            } else {
                log::warn!("no {len:?} phrases at all, drawing any");
                let flat: Vec<(char, usize)> = self
                    .phrases
                    .iter()
                    .flat_map(|(c, cats)| {
                        cats.iter()
                            .enumerate()
                            .filter(|(_, list)| !list.is_empty())
                            .map(move |(i, _)| (*c, i))
                    })
                    .collect();
                // Non-empty by the load-time check.
                flat[rng.random_range(0..flat.len())]
            }
        };

        self.avail.remove(&start);
        let list = &self.phrases[&start][cat];
        list[rng.random_range(0..list.len())].clone()
    }

    /// Draw a multi-word phrase: `words` draws of the given length joined
    /// by spaces. Only the first word's start character is reserved, since
    /// only the first character is ever used for targeting.
    pub fn get_combo_phrase(&mut self, words: u32, len: PhraseLength, rng: &mut Pcg32) -> String {
        let mut combo = self.get_phrase(len, rng);
        for _ in 1..words {
            combo.push(' ');
            combo.push_str(&self.draw_unreserved(len, rng));
        }
        combo
    }

    /// A phrase of the given length with no reservation side effect.
    fn draw_unreserved(&self, len: PhraseLength, rng: &mut Pcg32) -> String {
        let cat = len as usize;
        let pool: Vec<&String> = self
            .phrases
            .values()
            .flat_map(|cats| cats[cat].iter())
            .collect();
        if let Some(p) = pick(&pool, rng) {
            (*p).clone()
        } else {
            let flat: Vec<&String> = self
                .phrases
                .values()
                .flat_map(|cats| cats.iter().flatten())
                .collect();
            // Non-empty by the load-time check.
            flat[rng.random_range(0..flat.len())].clone()
        }
    }

    /// Return a start character to the pool.
    pub fn make_char_avail(&mut self, c: char) {
        if self.phrases.contains_key(&c) {
            self.avail.insert(c);
        }
    }

    pub fn make_all_chars_avail(&mut self) {
        self.avail = self.phrases.keys().copied().collect();
    }

    pub fn is_char_avail(&self, c: char) -> bool {
        self.avail.contains(&c)
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases
            .values()
            .flat_map(|cats| cats.iter())
            .map(Vec::len)
            .sum()
    }
}

fn pick<'a, T>(items: &'a [T], rng: &mut Pcg32) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.random_range(0..items.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn length_category_boundaries() {
        assert_eq!(PhraseLength::of("a"), PhraseLength::Single);
        assert_eq!(PhraseLength::of("ab"), PhraseLength::Short);
        assert_eq!(PhraseLength::of("abcdef"), PhraseLength::Short);
        assert_eq!(PhraseLength::of("abcdefg"), PhraseLength::Medium);
        assert_eq!(PhraseLength::of("twelve chars"), PhraseLength::Medium);
        assert_eq!(PhraseLength::of("thirteen char"), PhraseLength::Long);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            PhraseBook::from_text("# only a comment\n\n"),
            Err(PhraseBookError::Empty)
        ));
    }

    #[test]
    fn draws_reserve_distinct_start_characters() {
        let mut book = PhraseBook::from_text("apple\nbanjo\ncider\n").unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let a = book.get_phrase(PhraseLength::Short, &mut rng);
        let b = book.get_phrase(PhraseLength::Short, &mut rng);
        let c = book.get_phrase(PhraseLength::Short, &mut rng);
        let starts: BTreeSet<char> =
            [a, b, c].iter().filter_map(|p| p.chars().next()).collect();
        assert_eq!(starts.len(), 3);
    }

    #[test]
    fn exhausted_pool_still_produces_a_phrase() {
        let mut book = PhraseBook::from_text("apple\n").unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(book.get_phrase(PhraseLength::Short, &mut rng), "apple");
        // 'a' is reserved now, but the draw must not fail.
        assert_eq!(book.get_phrase(PhraseLength::Short, &mut rng), "apple");
    }

    #[test]
    fn freed_characters_become_drawable_again() {
        let mut book = PhraseBook::from_text("apple\n").unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        book.get_phrase(PhraseLength::Short, &mut rng);
        assert!(!book.is_char_avail('a'));
        book.make_char_avail('a');
        assert!(book.is_char_avail('a'));
    }

    #[test]
    fn combo_phrase_joins_words_and_reserves_only_the_first() {
        let mut book = PhraseBook::from_text("apple\nbanjo\ncider\n").unwrap();
        let mut rng = Pcg32::seed_from_u64(9);
        let combo = book.get_combo_phrase(3, PhraseLength::Short, &mut rng);
        assert_eq!(combo.split(' ').count(), 3);
        let reserved = ['a', 'b', 'c']
            .iter()
            .filter(|&&c| !book.is_char_avail(c))
            .count();
        assert_eq!(reserved, 1);
    }

    #[test]
    fn missing_length_falls_back_to_any_phrase() {
        let mut book = PhraseBook::from_text("ab\n").unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(book.get_phrase(PhraseLength::Long, &mut rng), "ab");
    }

    #[test]
    fn default_book_covers_every_length() {
        let mut book = PhraseBook::default_book().unwrap();
        assert!(book.phrase_count() > 100);
        let mut rng = Pcg32::seed_from_u64(1);
        for len in [
            PhraseLength::Single,
            PhraseLength::Short,
            PhraseLength::Medium,
            PhraseLength::Long,
        ] {
            let p = book.get_phrase(len, &mut rng);
            assert_eq!(PhraseLength::of(&p), len);
            book.make_all_chars_avail();
        }
    }
}
