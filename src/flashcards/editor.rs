//! Building a set from user input before it is saved.

use thiserror::Error;

use super::types::{now_millis, Card, CardSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
  #[error("Please enter a title for the study set")]
  TitleRequired,
  #[error("Please add at least one card with content")]
  CardsRequired,
}

/// Editable form of a set.
#[derive(Debug, Clone, Default)]
pub struct SetDraft {
  pub title: String,
  pub description: String,
  pub cards: Vec<Card>,
  existing: Option<CardSet>,
}

impl SetDraft {
  /// Empty draft for a new set.
  pub fn new() -> Self {
    Self::default()
  }

  /// Draft pre-filled from an existing set.
  pub fn edit(set: CardSet) -> Self {
    Self {
      title: set.title.clone(),
      description: set.description.clone(),
      cards: set.cards.clone(),
      existing: Some(set),
    }
  }

  pub fn is_edit(&self) -> bool {
    self.existing.is_some()
  }

  pub fn add_card(&mut self, question: impl Into<String>, answer: impl Into<String>) -> &mut Card {
    self.cards.push(Card::new(question, answer));
    let last = self.cards.len() - 1;
    &mut self.cards[last]
  }

  /// Append cards, e.g. from a speed import.
  pub fn extend(&mut self, cards: impl IntoIterator<Item = Card>) {
    self.cards.extend(cards);
  }

  /// Produce the set to save.
  ///
  /// Blank cards are dropped. An edited set keeps its id and creation time.
  /// `updated_at` is left for the orchestrator to stamp on save.
  pub fn build(&self) -> Result<CardSet, DraftError> {
    if self.title.trim().is_empty() {
      return Err(DraftError::TitleRequired);
    }

    let cards: Vec<Card> = self
      .cards
      .iter()
      .filter(|card| !card.is_blank())
      .cloned()
      .collect();
    if cards.is_empty() {
      return Err(DraftError::CardsRequired);
    }

    let set = match &self.existing {
      Some(existing) => CardSet {
        id: existing.id.clone(),
        title: self.title.clone(),
        description: self.description.clone(),
        cards,
        created_at: existing.created_at,
        updated_at: existing.updated_at.max(existing.created_at),
      },
      None => {
        let now = now_millis();
        CardSet {
          id: super::types::new_id(),
          title: self.title.clone(),
          description: self.description.clone(),
          cards,
          created_at: now,
          updated_at: now,
        }
      }
    };
    Ok(set)
  }
}
