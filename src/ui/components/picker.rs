use super::KeyResult;
use crate::ui::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by a picker that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent<T> {
  Selected(T),
  Cancelled,
}

/// Overlay list for choosing one value, e.g. a status or an assignee
#[derive(Debug, Clone)]
pub struct Picker<T> {
  active: bool,
  title: String,
  options: Vec<(String, T)>,
  selected: usize,
}

impl<T> Default for Picker<T> {
  fn default() -> Self {
    Self {
      active: false,
      title: String::new(),
      options: Vec::new(),
      selected: 0,
    }
  }
}

impl<T: Clone> Picker<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker, preselecting the first option equal to `current`
  pub fn show(&mut self, title: String, options: Vec<(String, T)>, current: Option<&T>)
  where
    T: PartialEq,
  {
    self.selected = current
      .and_then(|c| options.iter().position(|(_, v)| v == c))
      .unwrap_or(0);
    self.active = true;
    self.title = title;
    self.options = options;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent<T>> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.options.get(self.selected) {
          Some((_, value)) => PickerEvent::Selected(value.clone()),
          None => PickerEvent::Cancelled,
        };
        self.hide();
        KeyResult::Event(event)
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.options.is_empty() {
          self.selected = (self.selected + 1) % self.options.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.options.is_empty() {
          self.selected = self.selected.checked_sub(1).unwrap_or(self.options.len() - 1);
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active || self.options.is_empty() {
      return;
    }

    let widest = self
      .options
      .iter()
      .map(|(label, _)| label.chars().count())
      .max()
      .unwrap_or(10)
      .max(self.title.chars().count());
    let overlay_area = centered_rect(area, widest as u16 + 6, self.options.len() as u16 + 2);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|(label, _)| ListItem::new(Span::styled(label.clone(), Style::default().fg(Color::Cyan))))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}
