//! Bulk card import from plain text.
//!
//! The format alternates questions and answers separated by lines of `---`,
//! which is what chat assistants produce when asked for a quiz:
//!
//! ```text
//! Capital of Sweden?
//! ---
//! Stockholm
//! ---
//! Largest city in Sweden?
//! ---
//! Stockholm
//! ```

use super::types::Card;

pub const SEPARATOR: &str = "---";

/// Parse alternating question/answer sections into cards.
///
/// Sections are trimmed and empty ones dropped before pairing. A trailing
/// question with no answer is ignored.
pub fn parse_speed_quiz(input: &str) -> Vec<Card> {
  let sections: Vec<&str> = input
    .split(SEPARATOR)
    .map(str::trim)
    .filter(|section| !section.is_empty())
    .collect();

  sections
    .chunks_exact(2)
    .map(|pair| Card::new(pair[0], pair[1]))
    .collect()
}
