//! Flip-card study session over one set

use thiserror::Error;

use crate::flashcards::{Card, CardSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudyError {
  /// Sets without cards cannot be studied
  #[error("this set has no cards to study")]
  NoCards,
}

/// Which side of the current card is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
  Question,
  Answer,
}

#[derive(Debug, Clone)]
pub struct StudySession {
  set: CardSet,
  index: usize,
  flipped: bool,
}

impl StudySession {
  pub fn new(set: CardSet) -> Result<Self, StudyError> {
    if !set.is_studyable() {
      return Err(StudyError::NoCards);
    }
    Ok(Self {
      set,
      index: 0,
      flipped: false,
    })
  }

  pub fn set(&self) -> &CardSet {
    &self.set
  }

  pub fn current(&self) -> &Card {
    &self.set.cards[self.index]
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn len(&self) -> usize {
    self.set.cards.len()
  }

  pub fn side(&self) -> Side {
    if self.flipped {
      Side::Answer
    } else {
      Side::Question
    }
  }

  pub fn flip(&mut self) {
    self.flipped = !self.flipped;
  }

  /// Move forward; returns false on the last card.
  pub fn next(&mut self) -> bool {
    if self.index + 1 < self.len() {
      self.index += 1;
      self.flipped = false;
      true
    } else {
      false
    }
  }

  /// Move back; returns false on the first card.
  pub fn previous(&mut self) -> bool {
    if self.index > 0 {
      self.index -= 1;
      self.flipped = false;
      true
    } else {
      false
    }
  }

  pub fn restart(&mut self) {
    self.index = 0;
    self.flipped = false;
  }

  pub fn is_last(&self) -> bool {
    self.index + 1 == self.len()
  }

  /// Percentage of the deck reached, counting the current card.
  pub fn progress(&self) -> f64 {
    (self.index + 1) as f64 / self.len() as f64 * 100.0
  }

  pub fn position(&self) -> String {
    format!("Card {} of {}", self.index + 1, self.len())
  }
}
