use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// Fresh opaque identifier for a set or card.
pub fn new_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

/// One question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
  pub id: String,
  pub question: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question_image: Option<String>,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer_image: Option<String>,
}

impl Card {
  pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
    Self {
      id: new_id(),
      question: question.into(),
      question_image: None,
      answer: answer.into(),
      answer_image: None,
    }
  }

  pub fn with_question_image(mut self, image: impl Into<String>) -> Self {
    self.question_image = Some(image.into());
    self
  }

  pub fn with_answer_image(mut self, image: impl Into<String>) -> Self {
    self.answer_image = Some(image.into());
    self
  }

  /// Both sides blank (whitespace only).
  pub fn is_blank(&self) -> bool {
    self.question.trim().is_empty() && self.answer.trim().is_empty()
  }
}

/// A named, ordered collection of cards.
///
/// Serialized with camelCase keys and millisecond timestamps, which is the
/// layout the local cache slots hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub cards: Vec<Card>,
  /// Creation timestamp (Unix ms)
  pub created_at: i64,
  /// Last update timestamp (Unix ms)
  pub updated_at: i64,
}

impl CardSet {
  /// Create a set with a fresh id and both timestamps set to now.
  pub fn new(title: impl Into<String>, description: impl Into<String>, cards: Vec<Card>) -> Self {
    let now = now_millis();
    Self {
      id: new_id(),
      title: title.into(),
      description: description.into(),
      cards,
      created_at: now,
      updated_at: now,
    }
  }

  /// A set can only be studied when it has at least one card.
  pub fn is_studyable(&self) -> bool {
    !self.cards.is_empty()
  }

  /// Check the invariants required before the set is persisted.
  pub fn validate(&self) -> Result<(), SetValidationError> {
    if self.title.trim().is_empty() {
      return Err(SetValidationError::EmptyTitle);
    }

    let mut seen = HashSet::with_capacity(self.cards.len());
    for card in &self.cards {
      if !seen.insert(card.id.as_str()) {
        return Err(SetValidationError::DuplicateCardId(card.id.clone()));
      }
    }

    if self.updated_at < self.created_at {
      return Err(SetValidationError::TimestampOrder {
        created_at: self.created_at,
        updated_at: self.updated_at,
      });
    }

    Ok(())
  }

  /// Bump `updated_at` to now, never moving it backwards.
  pub fn touch(&mut self) {
    self.updated_at = now_millis().max(self.updated_at).max(self.created_at);
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetValidationError {
  #[error("set title must not be empty")]
  EmptyTitle,
  #[error("card id {0} appears more than once in the set")]
  DuplicateCardId(String),
  #[error("updated_at ({updated_at}) is earlier than created_at ({created_at})")]
  TimestampOrder { created_at: i64, updated_at: i64 },
}

/// How a card image is referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef<'a> {
  /// Inline `data:` URI with its declared mime type
  DataUri { mime: &'a str, payload_len: usize },
  /// Anything else is treated as a URL
  Url(&'a str),
}

impl<'a> ImageRef<'a> {
  pub fn parse(reference: &'a str) -> Self {
    match reference.strip_prefix("data:") {
      Some(rest) => {
        let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
        let mime = header.split(';').next().unwrap_or_default();
        ImageRef::DataUri {
          mime,
          payload_len: payload.len(),
        }
      }
      None => ImageRef::Url(reference),
    }
  }

  /// Approximate decoded size in bytes for inline images.
  pub fn approx_bytes(&self) -> Option<usize> {
    match self {
      // base64 expands by 4/3
      ImageRef::DataUri { payload_len, .. } => Some(payload_len / 4 * 3),
      ImageRef::Url(_) => None,
    }
  }
}

/// Size above which the front-end warns about an inline image.
pub const IMAGE_SIZE_GUIDANCE: usize = 10 * 1024 * 1024;
