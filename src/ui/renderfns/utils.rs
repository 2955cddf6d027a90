use crate::api::TaskStatus;
use ratatui::prelude::Color;

/// Truncate to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn status_color(status: TaskStatus) -> Color {
  match status {
    TaskStatus::Done => Color::Green,
    TaskStatus::InProgress => Color::Yellow,
    TaskStatus::Todo => Color::White,
  }
}
