use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::study::StudySession;

/// Terminal events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized, redraw
  Resize,
}

/// What a key press asks the study screen to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyAction {
  Flip,
  Next,
  Previous,
  Restart,
  Quit,
}

impl StudyAction {
  pub fn from_key(key: &KeyEvent) -> Option<Self> {
    if key.kind == KeyEventKind::Release {
      return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Some(Self::Quit);
    }
    match key.code {
      KeyCode::Char(' ') | KeyCode::Enter => Some(Self::Flip),
      KeyCode::Right | KeyCode::Char('n') | KeyCode::Char('l') => Some(Self::Next),
      KeyCode::Left | KeyCode::Char('p') | KeyCode::Char('h') => Some(Self::Previous),
      KeyCode::Char('r') => Some(Self::Restart),
      KeyCode::Char('q') | KeyCode::Esc => Some(Self::Quit),
      _ => None,
    }
  }

  /// Apply to the session. Returns false when the loop should stop.
  pub fn apply(self, session: &mut StudySession) -> bool {
    match self {
      Self::Flip => session.flip(),
      Self::Next => {
        session.next();
      }
      Self::Previous => {
        session.previous();
      }
      Self::Restart => session.restart(),
      Self::Quit => return false,
    }
    true
  }
}

/// Reads terminal input on a blocking thread and forwards it
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(poll_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || loop {
      if tx.is_closed() {
        break;
      }
      if !event::poll(poll_rate).unwrap_or(false) {
        continue;
      }
      let forwarded = match event::read() {
        Ok(CrosstermEvent::Key(key)) => tx.send(Event::Key(key)),
        Ok(CrosstermEvent::Resize(..)) => tx.send(Event::Resize),
        Ok(_) => Ok(()),
        Err(e) => {
          tracing::warn!(error = %e, "terminal read failed");
          break;
        }
      };
      if forwarded.is_err() {
        break;
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
