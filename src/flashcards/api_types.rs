//! Serde types matching the rows of the remote `flashcard_sets` and
//! `flashcards` tables.
//!
//! These are kept apart from the domain types so the wire layout (snake_case
//! keys, nullable columns, RFC 3339 timestamps) never leaks into the cache
//! format or the rest of the crate.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Card, CardSet};

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a wire timestamp into Unix milliseconds.
pub fn parse_timestamp(value: &str) -> Result<i64, chrono::ParseError> {
  DateTime::parse_from_rfc3339(value).map(|dt| dt.timestamp_millis())
}

/// Format Unix milliseconds as a wire timestamp.
pub fn format_timestamp(millis: i64) -> String {
  DateTime::<Utc>::from_timestamp_millis(millis)
    .unwrap_or_default()
    .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSetRow {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCardRow {
  pub id: String,
  pub set_id: String,
  pub question: String,
  pub question_image: Option<String>,
  pub answer: String,
  pub answer_image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
}

/// Error body returned by the REST layer
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub code: Option<String>,
  pub message: Option<String>,
  pub details: Option<String>,
  pub hint: Option<String>,
}

/// Error code the REST layer uses for "no rows" on single-object reads.
pub const NO_ROWS_CODE: &str = "PGRST116";

// ============================================================================
// Conversions
// ============================================================================

impl ApiSetRow {
  pub fn from_set(set: &CardSet) -> Self {
    Self {
      id: set.id.clone(),
      title: set.title.clone(),
      description: non_empty(&set.description),
      created_at: format_timestamp(set.created_at),
      updated_at: format_timestamp(set.updated_at),
    }
  }

  /// Assemble a domain set from this row and its card rows.
  pub fn into_set(self, cards: Vec<ApiCardRow>) -> Result<CardSet, chrono::ParseError> {
    Ok(CardSet {
      created_at: parse_timestamp(&self.created_at)?,
      updated_at: parse_timestamp(&self.updated_at)?,
      id: self.id,
      title: self.title,
      description: self.description.unwrap_or_default(),
      cards: cards.into_iter().map(Card::from).collect(),
    })
  }
}

impl ApiCardRow {
  /// Build the row for the card at `position` within `set`.
  ///
  /// Rows are ordered by `created_at` when read back, so each card gets
  /// the set's `updated_at` plus its position in milliseconds.
  pub fn from_card(set: &CardSet, position: usize, card: &Card) -> Self {
    let offset = i64::try_from(position).unwrap_or(i64::MAX);
    Self {
      id: card.id.clone(),
      set_id: set.id.clone(),
      question: card.question.clone(),
      question_image: card.question_image.as_deref().and_then(non_empty),
      answer: card.answer.clone(),
      answer_image: card.answer_image.as_deref().and_then(non_empty),
      created_at: Some(format_timestamp(set.updated_at.saturating_add(offset))),
    }
  }
}

impl From<ApiCardRow> for Card {
  fn from(row: ApiCardRow) -> Self {
    Card {
      id: row.id,
      question: row.question,
      question_image: row.question_image.filter(|s| !s.is_empty()),
      answer: row.answer,
      answer_image: row.answer_image.filter(|s| !s.is_empty()),
    }
  }
}

fn non_empty(value: &str) -> Option<String> {
  if value.is_empty() {
    None
  } else {
    Some(value.to_string())
  }
}
