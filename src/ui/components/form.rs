use super::{InputResult, KeyResult, TextInput};
use crate::ui::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a form that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// All required fields are filled; values in field order, trimmed
  Submitted(Vec<String>),
  Cancelled,
}

#[derive(Debug, Clone)]
struct Field {
  label: &'static str,
  required: bool,
  input: TextInput,
}

/// Multi-field text form. Tab / arrows move between fields, Enter on the
/// last field submits.
#[derive(Debug, Clone, Default)]
pub struct Form {
  title: String,
  fields: Vec<Field>,
  focused: usize,
  error: Option<String>,
  active: bool,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }

  pub fn field(mut self, label: &'static str) -> Self {
    self.fields.push(Field {
      label,
      required: true,
      input: TextInput::new(),
    });
    self
  }

  pub fn optional_field(mut self, label: &'static str) -> Self {
    self.fields.push(Field {
      label,
      required: false,
      input: TextInput::new(),
    });
    self
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn set_title(&mut self, title: impl Into<String>) {
    self.title = title.into();
  }

  pub fn show(&mut self) {
    self.active = true;
    self.focused = 0;
    self.error = None;
    for field in &mut self.fields {
      field.input.clear();
    }
  }

  pub fn hide(&mut self) {
    self.active = false;
  }

  /// Error line under the fields, e.g. a rejected submission
  pub fn set_error(&mut self, error: Option<String>) {
    self.error = error;
  }

  fn values(&self) -> Vec<String> {
    self
      .fields
      .iter()
      .map(|f| f.input.value().trim().to_string())
      .collect()
  }

  fn submit(&mut self) -> KeyResult<FormEvent> {
    if let Some((idx, field)) = self
      .fields
      .iter()
      .enumerate()
      .find(|(_, f)| f.required && f.input.value().trim().is_empty())
    {
      self.error = Some(format!("{} is required", field.label));
      self.focused = idx;
      return KeyResult::Handled;
    }
    self.error = None;
    KeyResult::Event(FormEvent::Submitted(self.values()))
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active || self.fields.is_empty() {
      return KeyResult::NotHandled;
    }

    let last = self.fields.len() - 1;
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focused = (self.focused + 1) % self.fields.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focused = self.focused.checked_sub(1).unwrap_or(last);
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.fields[self.focused].input.handle_key(key) {
      InputResult::Consumed => KeyResult::Handled,
      InputResult::Cancelled => {
        self.hide();
        KeyResult::Event(FormEvent::Cancelled)
      }
      InputResult::Submitted(_) if self.focused < last => {
        self.focused += 1;
        KeyResult::Handled
      }
      InputResult::Submitted(_) => self.submit(),
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Draw the fields into `area` without a surrounding overlay.
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.chars().count())
      .max()
      .unwrap_or(0)
      + 3;

    let mut lines = Vec::new();
    for (idx, field) in self.fields.iter().enumerate() {
      let marker = if field.required { "*" } else { " " };
      let label_style = if idx == self.focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      lines.push(Line::from(vec![
        Span::styled(
          format!("{:<width$}", format!("{}{}:", field.label, marker), width = label_width),
          label_style,
        ),
        Span::raw(field.input.value().to_string()),
      ]));
    }
    lines.push(Line::raw(""));
    match &self.error {
      Some(error) => lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red))),
      None => lines.push(Line::styled(
        "Tab: next field  Enter: submit  Esc: cancel",
        Style::default().fg(Color::DarkGray),
      )),
    }
    frame.render_widget(Paragraph::new(lines), inner);

    let row = self.focused as u16;
    if row < inner.height {
      let x = inner.x + (label_width + self.fields[self.focused].input.cursor_position()) as u16;
      frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y + row));
    }
  }

  /// Render as a centered overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }
    let overlay = centered_rect(area, 60, self.fields.len() as u16 + 4);
    frame.render_widget(Clear, overlay);
    self.render(frame, overlay);
  }
}
