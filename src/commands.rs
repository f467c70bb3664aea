//! Subcommands of the `flashdeck` binary

use chrono::{DateTime, Utc};
use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::cache::SlotStorage;
use crate::flashcards::{
  parse_speed_quiz, CardSet, ImageRef, RemoteStore, SetDraft, IMAGE_SIZE_GUIDANCE,
};
use crate::study::StudySession;
use crate::sync::{LibraryState, SyncOrchestrator, SyncSource};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// List all sets
  #[command(alias = "ls")]
  List,
  /// Print one set with its cards
  Show { id: String },
  /// Create a set from cards given on the command line
  New {
    #[arg(short, long)]
    title: String,
    #[arg(short, long, default_value = "")]
    description: String,
    /// A card as `question::answer`; repeat for more cards
    #[arg(short, long = "card", value_name = "QUESTION::ANSWER")]
    cards: Vec<String>,
  },
  /// Create a set from a speed-quiz file, sections separated by `---`
  Import {
    /// Text file to read, or `-` for stdin
    file: PathBuf,
    #[arg(short, long, required_unless_present = "into")]
    title: Option<String>,
    #[arg(short, long, default_value = "")]
    description: String,
    /// Append the cards to this existing set instead
    #[arg(long, value_name = "SET_ID", conflicts_with = "title")]
    into: Option<String>,
  },
  /// Delete a set and its cards
  #[command(alias = "rm")]
  Delete { id: String },
  /// Flip through a set in the terminal
  Study { id: String },
  /// Reload the set list from the remote store
  Refresh,
}

const CARD_SEPARATOR: &str = "::";

/// Run one subcommand against the orchestrator, writing results to `out`.
pub async fn run<R, S, W>(command: Command, sync: &SyncOrchestrator<R, S>, out: &mut W) -> Result<()>
where
  R: RemoteStore,
  S: SlotStorage,
  W: Write,
{
  match command {
    Command::List => {
      sync.load().await;
      print_sets(out, &sync.snapshot(), sync.offline_cache().written_at())
    }
    Command::Refresh => {
      sync.refresh().await;
      print_sets(out, &sync.snapshot(), sync.offline_cache().written_at())
    }
    Command::Show { id } => {
      let set = find_set(sync, &id).await?;
      print_set(out, &set)
    }
    Command::New {
      title,
      description,
      cards,
    } => {
      let mut draft = SetDraft::new();
      draft.title = title;
      draft.description = description;
      for card in &cards {
        let (question, answer) = parse_card_arg(card)?;
        draft.add_card(question, answer);
      }
      save_draft(sync, out, &draft).await
    }
    Command::Import {
      file,
      title,
      description,
      into,
    } => {
      let cards = parse_speed_quiz(&read_input(&file)?);
      if cards.is_empty() {
        return Err(eyre!("No question/answer pairs found in {}", file.display()));
      }
      writeln!(out, "Parsed {} cards", cards.len())?;

      let draft = match into {
        Some(id) => {
          let mut draft = SetDraft::edit(find_set(sync, &id).await?);
          draft.extend(cards);
          draft
        }
        None => {
          let mut draft = SetDraft::new();
          draft.title = title.unwrap_or_default();
          draft.description = description;
          draft.cards = cards;
          draft
        }
      };
      save_draft(sync, out, &draft).await
    }
    Command::Delete { id } => {
      sync.delete_set(&id).await?;
      writeln!(out, "Deleted {id}")?;
      Ok(())
    }
    Command::Study { id } => {
      let set = find_set(sync, &id).await?;
      let session = StudySession::new(set)?;
      crate::screen::run_study(session).await
    }
  }
}

async fn find_set<R: RemoteStore, S: SlotStorage>(
  sync: &SyncOrchestrator<R, S>,
  id: &str,
) -> Result<CardSet> {
  sync
    .get_set(id)
    .await
    .ok_or_else(|| eyre!("Set {} not found", id))
}

async fn save_draft<R, S, W>(sync: &SyncOrchestrator<R, S>, out: &mut W, draft: &SetDraft) -> Result<()>
where
  R: RemoteStore,
  S: SlotStorage,
  W: Write,
{
  let set = draft.build()?;
  for warning in oversized_images(&set) {
    tracing::warn!(set_id = %set.id, "{warning}");
    writeln!(out, "warning: {warning}")?;
  }

  let saved = sync.save_set(set).await?;
  let verb = if draft.is_edit() { "Updated" } else { "Created" };
  writeln!(
    out,
    "{} {} \"{}\" ({} cards)",
    verb,
    saved.id,
    saved.title,
    saved.cards.len()
  )?;
  Ok(())
}

fn parse_card_arg(arg: &str) -> Result<(&str, &str)> {
  let (question, answer) = arg
    .split_once(CARD_SEPARATOR)
    .ok_or_else(|| eyre!("Card must look like QUESTION{}ANSWER: {}", CARD_SEPARATOR, arg))?;
  Ok((question.trim(), answer.trim()))
}

fn read_input(path: &Path) -> Result<String> {
  if path.as_os_str() == "-" {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    return Ok(buf);
  }
  std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
}

/// Inline images above the size guidance; the save still goes ahead.
fn oversized_images(set: &CardSet) -> Vec<String> {
  set
    .cards
    .iter()
    .enumerate()
    .flat_map(|(i, card)| {
      [
        ("question", card.question_image.as_deref()),
        ("answer", card.answer_image.as_deref()),
      ]
      .into_iter()
      .filter_map(move |(side, image)| {
        let bytes = ImageRef::parse(image?).approx_bytes()?;
        (bytes > IMAGE_SIZE_GUIDANCE).then(|| {
          format!(
            "card {} {} image is about {} MiB, over the {} MiB guidance",
            i + 1,
            side,
            bytes / (1024 * 1024),
            IMAGE_SIZE_GUIDANCE / (1024 * 1024)
          )
        })
      })
    })
    .collect()
}

fn print_sets<W: Write>(
  out: &mut W,
  state: &LibraryState,
  saved_at: Option<DateTime<Utc>>,
) -> Result<()> {
  let reason = match state.last_source {
    Some(SyncSource::Network) | None => None,
    Some(SyncSource::Offline) => Some("offline"),
    Some(SyncSource::Fallback) => Some("remote unavailable"),
  };
  if let Some(reason) = reason {
    match saved_at {
      Some(at) => writeln!(
        out,
        "({reason}, showing saved copy from {})",
        at.format("%Y-%m-%d %H:%M UTC")
      )?,
      None => writeln!(out, "({reason}, showing saved copy)")?,
    }
  }
  if state.sets.is_empty() {
    writeln!(out, "No sets yet")?;
  }
  for set in &state.sets {
    writeln!(out, "{}  {}  ({} cards)", set.id, set.title, set.cards.len())?;
  }
  Ok(())
}

fn print_set<W: Write>(out: &mut W, set: &CardSet) -> Result<()> {
  writeln!(out, "{}", set.title)?;
  if !set.description.is_empty() {
    writeln!(out, "{}", set.description)?;
  }
  for (i, card) in set.cards.iter().enumerate() {
    writeln!(out)?;
    writeln!(out, "{}. Q: {}", i + 1, card.question)?;
    writeln!(out, "   A: {}", card.answer)?;
  }
  Ok(())
}
