use color_eyre::Result;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use std::time::Duration;

use crate::event::{Event, EventHandler, StudyAction};
use crate::flashcards::ImageRef;
use crate::study::{Side, StudySession};

/// Run the interactive study loop until the user quits.
pub async fn run_study(mut session: StudySession) -> Result<()> {
  // Undo whatever part of the setup succeeded before bailing out
  let mut terminal = match ratatui::try_init() {
    Ok(terminal) => terminal,
    Err(e) => {
      ratatui::restore();
      return Err(e.into());
    }
  };

  let result = study_loop(&mut terminal, &mut session).await;

  ratatui::restore();
  result
}

async fn study_loop<B: Backend>(terminal: &mut Terminal<B>, session: &mut StudySession) -> Result<()> {
  let mut events = EventHandler::new(Duration::from_millis(250));
  terminal.draw(|frame| draw(frame, session))?;

  while let Some(event) = events.next().await {
    match event {
      Event::Key(key) => {
        let Some(action) = StudyAction::from_key(&key) else {
          continue;
        };
        if !action.apply(session) {
          break;
        }
      }
      Event::Resize => {}
    }
    terminal.draw(|frame| draw(frame, session))?;
  }

  Ok(())
}

/// Draw the study screen
pub fn draw(frame: &mut Frame, session: &StudySession) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Title
      Constraint::Length(1), // Progress
      Constraint::Min(3),    // Card
      Constraint::Length(1), // Key hints
    ])
    .split(frame.area());

  let title = Paragraph::new(Line::from(vec![
    Span::styled(format!(" {}", session.set().title), Style::default().fg(Color::Cyan).bold()),
    Span::styled(format!("  {}", session.position()), Style::default().fg(Color::DarkGray)),
  ]));
  frame.render_widget(title, chunks[0]);

  let progress = Gauge::default()
    .gauge_style(Style::default().fg(Color::Cyan))
    .ratio((session.progress() / 100.0).clamp(0.0, 1.0))
    .label(format!("{:.0}%", session.progress()));
  frame.render_widget(progress, chunks[1]);

  let (label, color) = match session.side() {
    Side::Question => (" Question ", Color::Yellow),
    Side::Answer => (" Answer ", Color::Green),
  };
  let card = Paragraph::new(card_text(session))
    .block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(label),
    )
    .wrap(Wrap { trim: false });
  frame.render_widget(card, chunks[2]);

  let hint = if session.is_last() {
    " space:flip  ←:back  r:restart  q:quit"
  } else {
    " space:flip  →:next  ←:back  r:restart  q:quit"
  };
  frame.render_widget(
    Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
    chunks[3],
  );
}

/// Body of the card for the side currently showing.
fn card_text(session: &StudySession) -> Text<'static> {
  let card = session.current();
  let (text, image) = match session.side() {
    Side::Question => (&card.question, card.question_image.as_deref()),
    Side::Answer => (&card.answer, card.answer_image.as_deref()),
  };

  let mut lines: Vec<Line> = text.lines().map(|l| Line::raw(l.to_string())).collect();
  if let Some(image) = image.map(ImageRef::parse) {
    lines.push(Line::raw(""));
    lines.push(Line::styled(
      format!("[image: {}]", describe_image(&image)),
      Style::default().fg(Color::DarkGray),
    ));
  }
  Text::from(lines)
}

fn describe_image(image: &ImageRef<'_>) -> String {
  match image {
    ImageRef::DataUri { mime, .. } => {
      let kib = image.approx_bytes().unwrap_or_default() / 1024;
      format!("{mime}, {kib} KiB")
    }
    ImageRef::Url(url) => url.to_string(),
  }
}
