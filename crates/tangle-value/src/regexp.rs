//! Regex values.
//!
//! A regex value keeps the user-facing `source`/`flags` pair plus a compiled
//! matcher when the pattern and flags are expressible; compilation failure is
//! not an error at construction time, the value simply has no matcher.

use regex::{Regex, RegexBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Backing data of a regex value.
#[derive(Debug)]
pub struct RegexData {
    source: String,
    flags: String,
    last_index: AtomicUsize,
    compiled: Option<Regex>,
}

impl RegexData {
    /// Create a regex value from a pattern and a flag string.
    ///
    /// Recognized flags: `i` (case-insensitive), `m` (multi-line), `s`
    /// (dot matches newline), and the positional flags `g`/`y`/`u`, which are
    /// recorded but do not change compilation. Unknown flags or an
    /// uncompilable pattern leave the value without a matcher.
    pub fn new(source: &str, flags: &str) -> Self {
        Self {
            source: source.to_owned(),
            flags: flags.to_owned(),
            last_index: AtomicUsize::new(0),
            compiled: compile(source, flags),
        }
    }

    /// The pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The flag string.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Whether the pattern compiled.
    pub fn is_valid(&self) -> bool {
        self.compiled.is_some()
    }

    /// Position where the next sticky/global match starts.
    pub fn last_index(&self) -> usize {
        self.last_index.load(Ordering::Relaxed)
    }

    /// Reset the sticky/global match position.
    pub fn set_last_index(&mut self, index: usize) {
        *self.last_index.get_mut() = index;
    }

    /// The `/source/flags` rendering used for display and equality.
    pub fn to_pattern_string(&self) -> String {
        format!("/{}/{}", self.source, self.flags)
    }

    /// Find the first match in `text`, as a byte range.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        let m = self.compiled.as_ref()?.find(text)?;
        Some((m.start(), m.end()))
    }

    /// Whether `text` matches anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// A fresh regex with the same source, flags, and match position.
    pub fn duplicate(&self) -> Self {
        let copy = Self::new(&self.source, &self.flags);
        copy.last_index.store(self.last_index(), Ordering::Relaxed);
        copy
    }
}

fn compile(source: &str, flags: &str) -> Option<Regex> {
    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            // Positional flags carried in the flag string only.
            'g' | 'y' | 'u' => {}
            _ => return None,
        }
    }
    builder.build().ok()
}
