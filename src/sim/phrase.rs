//! Per-entity phrase progress tracking
//!
//! A `Phrase` is the text an entity requires the player to type. It tracks
//! the cursor into the text and the timestamps needed to rate typing speed.

use serde::{Deserialize, Serialize};

/// Progress tracker over a fixed text string.
///
/// The cursor only moves forward between resets, and `finished()` becomes
/// true exactly when the last character has been supplied (trivially true
/// for an empty text).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Phrase {
    text: String,
    cursor: usize,
    start_time: f32,
    last_correct_time: f32,
}

impl Phrase {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cursor: 0,
            start_time: 0.0,
            last_correct_time: 0.0,
        }
    }

    /// Feed one typed character. Advances the cursor and returns true when
    /// `c` matches the next expected character; otherwise leaves all state
    /// untouched and returns false.
    ///
    /// `start_time` is recorded on the very first correct character only,
    /// `last_correct_time` on every correct one.
    pub fn on_type(&mut self, c: char, now: f32) -> bool {
        if self.text[self.cursor..].chars().next() == Some(c) {
            if self.cursor == 0 {
                self.start_time = now;
            }
            self.cursor += c.len_utf8();
            self.last_correct_time = now;
            true
        } else {
            false
        }
    }

    /// Replace the text and zero the cursor and timestamps.
    pub fn reset(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = 0;
        self.start_time = 0.0;
        self.last_correct_time = 0.0;
    }

    pub fn finished(&self) -> bool {
        self.cursor >= self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// First character of the text, or None for an empty phrase.
    pub fn start_char(&self) -> Option<char> {
        self.text.chars().next()
    }

    /// Character count of the text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_single(&self) -> bool {
        self.len() == 1
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Portion of the text already typed.
    pub fn typed(&self) -> &str {
        &self.text[..self.cursor]
    }

    /// Portion of the text still to type.
    pub fn remaining(&self) -> &str {
        &self.text[self.cursor..]
    }

    /// Seconds per character, first to last correct keystroke divided by
    /// the full text length; lower is faster. Meaningful once the phrase
    /// is finished. Zero for an empty phrase.
    pub fn typing_speed(&self) -> f32 {
        if self.text.is_empty() {
            return 0.0;
        }
        (self.last_correct_time - self.start_time) / self.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn typing_cat_char_by_char() {
        let mut p = Phrase::new("cat");
        assert_eq!(p.start_char(), Some('c'));

        assert!(p.on_type('c', 1.0));
        assert!(!p.finished());
        assert!(p.on_type('a', 2.0));
        assert!(!p.finished());
        assert!(p.on_type('t', 3.0));
        assert!(p.finished());
    }

    #[test]
    fn wrong_char_leaves_state_unchanged() {
        let mut p = Phrase::new("cat");
        assert!(p.on_type('c', 1.0));
        assert!(!p.on_type('x', 2.0));
        assert_eq!(p.typed(), "c");
        assert_eq!(p.remaining(), "at");
        // Mistype must not update the speed timestamps either.
        assert!(p.on_type('a', 5.0));
        assert!(p.on_type('t', 6.0));
        assert!((p.typing_speed() - (6.0 - 1.0) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_phrase_is_finished_with_no_start_char() {
        let p = Phrase::new("");
        assert!(p.finished());
        assert_eq!(p.start_char(), None);
        assert_eq!(p.typing_speed(), 0.0);
    }

    #[test]
    fn speed_is_seconds_per_char() {
        let mut p = Phrase::new("abcd");
        p.on_type('a', 10.0);
        p.on_type('b', 10.1);
        p.on_type('c', 10.2);
        p.on_type('d', 10.4);
        assert!((p.typing_speed() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn reset_replaces_text_and_zeroes_progress() {
        let mut p = Phrase::new("old");
        p.on_type('o', 1.0);
        p.reset("new");
        assert_eq!(p.typed(), "");
        assert_eq!(p.start_char(), Some('n'));
        assert_eq!(p.typing_speed(), 0.0);
    }

    proptest! {
        /// Typing any phrase in order always hits, and finishes exactly on
        /// the last character, never earlier.
        #[test]
        fn full_prefix_always_hits(text in "[a-z ]{1,24}") {
            let mut p = Phrase::new(text.clone());
            let count = text.chars().count();
            for (i, c) in text.chars().enumerate() {
                prop_assert!(!p.finished());
                prop_assert!(p.on_type(c, i as f32));
                prop_assert_eq!(p.finished(), i + 1 == count);
            }
        }

        /// Any character that is not the expected next one never advances
        /// the cursor.
        #[test]
        fn mismatch_never_advances(text in "[a-z]{1,16}", c in proptest::char::range('a', 'z')) {
            let mut p = Phrase::new(text.clone());
            let expected = text.chars().next().unwrap();
            if c != expected {
                prop_assert!(!p.on_type(c, 0.0));
                prop_assert_eq!(p.typed(), "");
            }
        }
    }
}
